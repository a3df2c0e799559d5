//! Kubernetes object reference validation.

use crate::error::{ValidationError, ValidationResult};
use crate::types::ParsedK8sReference;

/// Validate and parse a Kubernetes object reference.
///
/// Accepts `[namespace/]kind/name`: exactly two segments mean no namespace,
/// exactly three mean `namespace/kind/name`. Anything else is rejected.
pub fn validate_k8s_reference(raw: &str) -> ValidationResult<ParsedK8sReference> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    let segments: Vec<&str> = trimmed.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ValidationError::InvalidK8sReference {
            value: trimmed.to_string(),
            reason: "empty segment".to_string(),
        });
    }

    match segments.as_slice() {
        [kind, name] => Ok(ParsedK8sReference {
            namespace: None,
            kind: (*kind).to_string(),
            name: (*name).to_string(),
        }),
        [namespace, kind, name] => Ok(ParsedK8sReference {
            namespace: Some((*namespace).to_string()),
            kind: (*kind).to_string(),
            name: (*name).to_string(),
        }),
        _ => Err(ValidationError::InvalidK8sReference {
            value: trimmed.to_string(),
            reason: format!("expected 2 or 3 segments, got {}", segments.len()),
        }),
    }
}
