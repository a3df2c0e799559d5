//! Git URL validation.

use crate::error::{ValidationError, ValidationResult};
use crate::types::ParsedGitUrl;

/// Validate and parse a Git repository URL.
///
/// Accepts `http(s)://host/owner/repo[.git]` and SCP-style
/// `git@host:owner/repo.git` (parsed protocol `ssh`). The URL must resolve to
/// exactly one owner and one repo segment; a trailing `.git` is stripped.
pub fn validate_git_url(raw: &str) -> ValidationResult<ParsedGitUrl> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    if let Some(rest) = trimmed.strip_prefix("git@") {
        return parse_scp_style(trimmed, rest);
    }

    let (protocol, rest) = if let Some(rest) = trimmed.strip_prefix("https://") {
        ("https", rest)
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        ("http", rest)
    } else {
        return Err(ValidationError::InvalidGitUrl {
            value: trimmed.to_string(),
            reason: "unsupported scheme; expected http(s) or git@host:owner/repo".to_string(),
        });
    };

    let mut parts = rest.splitn(2, '/');
    let host = parts.next().unwrap_or_default();
    let path = parts.next().unwrap_or_default();

    if host.is_empty() {
        return Err(ValidationError::InvalidGitUrl {
            value: trimmed.to_string(),
            reason: "missing host".to_string(),
        });
    }

    let (owner, repo) = parse_owner_repo(trimmed, path)?;

    Ok(ParsedGitUrl {
        protocol: protocol.to_string(),
        host: host.to_string(),
        owner,
        repo,
    })
}

fn parse_scp_style(original: &str, rest: &str) -> ValidationResult<ParsedGitUrl> {
    let (host, path) = rest.split_once(':').ok_or_else(|| ValidationError::InvalidGitUrl {
        value: original.to_string(),
        reason: "SCP-style URL missing ':' separator".to_string(),
    })?;

    if host.is_empty() {
        return Err(ValidationError::InvalidGitUrl {
            value: original.to_string(),
            reason: "missing host".to_string(),
        });
    }

    let (owner, repo) = parse_owner_repo(original, path)?;

    Ok(ParsedGitUrl {
        protocol: "ssh".to_string(),
        host: host.to_string(),
        owner,
        repo,
    })
}

/// Require exactly `owner/repo`, stripping a `.git` suffix from the repo.
fn parse_owner_repo(original: &str, path: &str) -> ValidationResult<(String, String)> {
    let path = path.trim_matches('/');
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() != 2 {
        return Err(ValidationError::InvalidGitUrl {
            value: original.to_string(),
            reason: format!(
                "expected exactly owner and repo segments, got {}",
                segments.len()
            ),
        });
    }

    let owner = segments[0].to_string();
    let repo = segments[1].strip_suffix(".git").unwrap_or(segments[1]);
    if repo.is_empty() {
        return Err(ValidationError::InvalidGitUrl {
            value: original.to_string(),
            reason: "empty repo name".to_string(),
        });
    }

    Ok((owner, repo.to_string()))
}
