//! Container image reference validation.

use crate::error::{ValidationError, ValidationResult};
use crate::types::ParsedContainerImage;
use once_cell::sync::Lazy;
use regex::Regex;

static DIGEST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^sha256:[0-9a-f]{64}$").expect("digest regex is valid"));

/// Validate and parse a container image reference.
///
/// Accepts `[registry/]repository[:tag|@digest]`. The registry is
/// distinguished from the first path segment by containing a dot, a colon, or
/// being `localhost`. A trailing `@sha256:<hex>` is parsed as a digest; a
/// trailing `:<tag>` (when no digest is present) as a tag.
pub fn validate_container_image(raw: &str) -> ValidationResult<ParsedContainerImage> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    // Digest first; everything before '@' is the name[:tag] part.
    let (name_part, digest) = match trimmed.rsplit_once('@') {
        Some((name, digest)) => {
            if !DIGEST_RE.is_match(digest) {
                return Err(ValidationError::InvalidImage {
                    value: trimmed.to_string(),
                    reason: format!("invalid digest '{digest}'"),
                });
            }
            (name, Some(digest.to_string()))
        }
        None => (trimmed, None),
    };

    // A tag colon must come after the last path separator; otherwise the colon
    // belongs to a registry port.
    let last_slash = name_part.rfind('/');
    let tag_colon = match name_part.rfind(':') {
        Some(pos) if last_slash.is_none_or(|s| pos > s) => Some(pos),
        _ => None,
    };

    let (path, tag) = match tag_colon {
        Some(pos) => {
            let tag = &name_part[pos + 1..];
            if tag.is_empty() {
                return Err(ValidationError::InvalidImage {
                    value: trimmed.to_string(),
                    reason: "empty tag".to_string(),
                });
            }
            (&name_part[..pos], Some(tag.to_string()))
        }
        None => (name_part, None),
    };

    if path.is_empty() {
        return Err(ValidationError::InvalidImage {
            value: trimmed.to_string(),
            reason: "empty repository".to_string(),
        });
    }

    let (registry, repository) = match path.split_once('/') {
        Some((first, rest)) if is_registry_host(first) => {
            if rest.is_empty() {
                return Err(ValidationError::InvalidImage {
                    value: trimmed.to_string(),
                    reason: "empty repository after registry".to_string(),
                });
            }
            (Some(first.to_string()), rest.to_string())
        }
        _ => (None, path.to_string()),
    };

    Ok(ParsedContainerImage {
        registry,
        repository,
        tag,
        digest,
    })
}

/// A first segment is a registry host when it contains a dot, a port colon,
/// or is the literal `localhost`.
fn is_registry_host(segment: &str) -> bool {
    segment == "localhost" || segment.contains('.') || segment.contains(':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_repository() {
        let image = validate_container_image("nginx").unwrap();
        assert_eq!(image.registry, None);
        assert_eq!(image.repository, "nginx");
        assert_eq!(image.tag, None);
        assert_eq!(image.digest, None);
    }

    #[test]
    fn test_repository_with_tag() {
        let image = validate_container_image("library/nginx:1.25").unwrap();
        assert_eq!(image.registry, None);
        assert_eq!(image.repository, "library/nginx");
        assert_eq!(image.tag.as_deref(), Some("1.25"));
    }

    #[test]
    fn test_registry_with_port() {
        let image = validate_container_image("registry.example.com:5000/team/app:v2").unwrap();
        assert_eq!(image.registry.as_deref(), Some("registry.example.com:5000"));
        assert_eq!(image.repository, "team/app");
        assert_eq!(image.tag.as_deref(), Some("v2"));
    }

    #[test]
    fn test_localhost_registry() {
        let image = validate_container_image("localhost/app").unwrap();
        assert_eq!(image.registry.as_deref(), Some("localhost"));
        assert_eq!(image.repository, "app");
    }

    #[test]
    fn test_digest_reference() {
        let digest = format!("sha256:{}", "a".repeat(64));
        let image = validate_container_image(&format!("gcr.io/project/app@{digest}")).unwrap();
        assert_eq!(image.registry.as_deref(), Some("gcr.io"));
        assert_eq!(image.repository, "project/app");
        assert_eq!(image.tag, None);
        assert_eq!(image.digest.as_deref(), Some(digest.as_str()));
    }

    #[test]
    fn test_tag_and_digest() {
        let digest = format!("sha256:{}", "0".repeat(64));
        let image = validate_container_image(&format!("app:v1@{digest}")).unwrap();
        assert_eq!(image.tag.as_deref(), Some("v1"));
        assert_eq!(image.digest.as_deref(), Some(digest.as_str()));
    }

    #[test]
    fn test_rejects_bad_digest() {
        let err = validate_container_image("app@sha256:short").unwrap_err();
        assert_eq!(err.code(), "INVALID_IMAGE_REFERENCE");
    }

    #[test]
    fn test_rejects_whitespace_only() {
        assert_eq!(
            validate_container_image("  \t ").unwrap_err().code(),
            "EMPTY_INPUT"
        );
    }

    #[test]
    fn test_first_segment_without_dot_is_namespace() {
        // "team" has no dot/colon and is not localhost, so it is part of the
        // repository path rather than a registry.
        let image = validate_container_image("team/app").unwrap();
        assert_eq!(image.registry, None);
        assert_eq!(image.repository, "team/app");
    }
}
