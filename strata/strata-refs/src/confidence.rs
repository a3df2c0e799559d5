//! Confidence value validation.

use crate::error::{ValidationError, ValidationResult};

/// Validate a confidence value in the `[0, 1]` range.
///
/// A missing value defaults to `1.0`. NaN, infinities, and out-of-range
/// values are rejected.
pub fn validate_confidence(value: Option<f64>) -> ValidationResult<f64> {
    let Some(v) = value else {
        return Ok(1.0);
    };

    if v.is_nan() {
        return Err(ValidationError::InvalidConfidence {
            value: "NaN".to_string(),
            reason: "confidence must be a number".to_string(),
        });
    }
    if !v.is_finite() || !(0.0..=1.0).contains(&v) {
        return Err(ValidationError::InvalidConfidence {
            value: v.to_string(),
            reason: "confidence must be within [0, 1]".to_string(),
        });
    }

    Ok(v)
}
