//! Cloud storage path validation.

use crate::error::{ValidationError, ValidationResult};
use crate::types::{ParsedStoragePath, StorageProvider};

const AZURE_BLOB_SUFFIX: &str = ".blob.core.windows.net";

/// Validate and parse a cloud storage path.
///
/// Recognizes `s3://bucket[/key]` (AWS), `gs://bucket[/key]` (GCP), and
/// `https://<account>.blob.core.windows.net/<container>[/key]` (Azure, with
/// the container as bucket). Local paths and bare `http://` URLs are rejected.
pub fn validate_storage_path(raw: &str) -> ValidationResult<ParsedStoragePath> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    if let Some(rest) = trimmed.strip_prefix("s3://") {
        return parse_bucket_key(trimmed, rest, StorageProvider::Aws);
    }
    if let Some(rest) = trimmed.strip_prefix("gs://") {
        return parse_bucket_key(trimmed, rest, StorageProvider::Gcp);
    }
    if let Some(rest) = trimmed.strip_prefix("https://") {
        return parse_azure_blob(trimmed, rest);
    }

    Err(ValidationError::InvalidStoragePath {
        value: trimmed.to_string(),
        reason: "not a recognized provider scheme (s3://, gs://, or Azure blob https URL)"
            .to_string(),
    })
}

fn parse_bucket_key(
    original: &str,
    rest: &str,
    provider: StorageProvider,
) -> ValidationResult<ParsedStoragePath> {
    let (bucket, key) = match rest.split_once('/') {
        Some((bucket, key)) => (bucket, (!key.is_empty()).then(|| key.to_string())),
        None => (rest, None),
    };

    if bucket.is_empty() {
        return Err(ValidationError::InvalidStoragePath {
            value: original.to_string(),
            reason: "missing bucket".to_string(),
        });
    }

    Ok(ParsedStoragePath {
        provider,
        bucket: bucket.to_string(),
        key,
        account: None,
    })
}

fn parse_azure_blob(original: &str, rest: &str) -> ValidationResult<ParsedStoragePath> {
    let (host, path) = match rest.split_once('/') {
        Some((host, path)) => (host, path),
        None => (rest, ""),
    };

    let account = host
        .strip_suffix(AZURE_BLOB_SUFFIX)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| ValidationError::InvalidStoragePath {
            value: original.to_string(),
            reason: "https URL is not an Azure blob endpoint".to_string(),
        })?;

    let (container, key) = match path.split_once('/') {
        Some((container, key)) => (container, (!key.is_empty()).then(|| key.to_string())),
        None => (path, None),
    };

    if container.is_empty() {
        return Err(ValidationError::InvalidStoragePath {
            value: original.to_string(),
            reason: "missing container".to_string(),
        });
    }

    Ok(ParsedStoragePath {
        provider: StorageProvider::Azure,
        bucket: container.to_string(),
        key,
        account: Some(account.to_string()),
    })
}
