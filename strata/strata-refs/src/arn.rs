//! ARN validation.

use crate::error::{ValidationError, ValidationResult};
use crate::types::ParsedArn;

/// Validate and parse an Amazon Resource Name.
///
/// Accepts the `arn:partition:service:region:account:resource` format. Region
/// and account may be empty (global resources keep their colons); the resource
/// segment may itself contain a `type/id` or `type:id` split, captured as
/// `resource_type`/`resource_id` when a delimiter is present.
pub fn validate_arn(raw: &str) -> ValidationResult<ParsedArn> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    if !trimmed.starts_with("arn:") {
        return Err(ValidationError::InvalidArn {
            value: trimmed.to_string(),
            reason: "must start with 'arn:'".to_string(),
        });
    }

    // Keep any further colons inside the resource segment intact.
    let fields: Vec<&str> = trimmed.splitn(6, ':').collect();
    if fields.len() < 6 {
        return Err(ValidationError::InvalidArn {
            value: trimmed.to_string(),
            reason: format!("expected 6 colon-delimited fields, got {}", fields.len()),
        });
    }

    let partition = fields[1];
    let service = fields[2];
    let region = fields[3];
    let account = fields[4];
    let resource = fields[5];

    if partition.is_empty() {
        return Err(ValidationError::InvalidArn {
            value: trimmed.to_string(),
            reason: "partition is empty".to_string(),
        });
    }
    if service.is_empty() {
        return Err(ValidationError::InvalidArn {
            value: trimmed.to_string(),
            reason: "service is empty".to_string(),
        });
    }
    if resource.is_empty() {
        return Err(ValidationError::InvalidArn {
            value: trimmed.to_string(),
            reason: "resource is empty".to_string(),
        });
    }

    let (resource_type, resource_id) = split_resource(resource);

    Ok(ParsedArn {
        partition: partition.to_string(),
        service: service.to_string(),
        region: region.to_string(),
        account: account.to_string(),
        resource: resource.to_string(),
        resource_type,
        resource_id,
    })
}

/// Split a resource segment at its first `/` or `:` delimiter, whichever
/// comes first.
fn split_resource(resource: &str) -> (Option<String>, Option<String>) {
    let delimiter = resource
        .char_indices()
        .find(|(_, c)| *c == '/' || *c == ':')
        .map(|(i, _)| i);

    match delimiter {
        Some(pos) if pos > 0 && pos + 1 < resource.len() => (
            Some(resource[..pos].to_string()),
            Some(resource[pos + 1..].to_string()),
        ),
        _ => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_resource_keeps_empty_fields() {
        let arn = validate_arn("arn:aws:s3:::my-bucket").unwrap();
        assert_eq!(arn.partition, "aws");
        assert_eq!(arn.service, "s3");
        assert_eq!(arn.region, "");
        assert_eq!(arn.account, "");
        assert_eq!(arn.resource, "my-bucket");
        assert_eq!(arn.resource_type, None);
        assert_eq!(arn.resource_id, None);
    }

    #[test]
    fn test_slash_delimited_resource() {
        let arn = validate_arn("arn:aws:iam::123456789012:role/admin-role").unwrap();
        assert_eq!(arn.account, "123456789012");
        assert_eq!(arn.resource, "role/admin-role");
        assert_eq!(arn.resource_type.as_deref(), Some("role"));
        assert_eq!(arn.resource_id.as_deref(), Some("admin-role"));
    }

    #[test]
    fn test_colon_delimited_resource() {
        let arn =
            validate_arn("arn:aws:lambda:us-east-1:123456789012:function:my-func").unwrap();
        assert_eq!(arn.region, "us-east-1");
        assert_eq!(arn.resource, "function:my-func");
        assert_eq!(arn.resource_type.as_deref(), Some("function"));
        assert_eq!(arn.resource_id.as_deref(), Some("my-func"));
    }

    #[test]
    fn test_rejects_missing_prefix() {
        let err = validate_arn("aws:s3:::bucket").unwrap_err();
        assert_eq!(err.code(), "INVALID_ARN");
    }

    #[test]
    fn test_rejects_too_few_fields() {
        assert!(validate_arn("arn:aws:s3").is_err());
        assert!(validate_arn("arn:aws:s3::").is_err());
    }

    #[test]
    fn test_rejects_empty_input() {
        assert_eq!(validate_arn("   ").unwrap_err().code(), "EMPTY_INPUT");
    }
}
