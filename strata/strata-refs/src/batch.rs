//! Batch validation helpers.

use crate::error::ValidationError;

/// One rejected input, keyed by its position in the original batch.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidItem {
    pub index: usize,
    pub error: ValidationError,
}

/// Outcome of validating a batch of raw inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome<T> {
    pub valid: Vec<T>,
    pub invalid: Vec<InvalidItem>,
}

impl<T> BatchOutcome<T> {
    /// True when every input validated
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty()
    }
}

/// Run a validator over a batch, partitioning results and preserving the
/// original index of each failure for diagnostics.
pub fn validate_batch<T, F>(values: &[&str], validator: F) -> BatchOutcome<T>
where
    F: Fn(&str) -> Result<T, ValidationError>,
{
    let mut valid = Vec::new();
    let mut invalid = Vec::new();

    for (index, value) in values.iter().enumerate() {
        match validator(value) {
            Ok(parsed) => valid.push(parsed),
            Err(error) => invalid.push(InvalidItem { index, error }),
        }
    }

    BatchOutcome { valid, invalid }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arn::validate_arn;

    #[test]
    fn test_batch_partitions_and_preserves_indexes() {
        let inputs = [
            "arn:aws:s3:::bucket-a",
            "not-an-arn",
            "arn:aws:s3:::bucket-b",
            "",
        ];
        let outcome = validate_batch(&inputs, validate_arn);

        assert_eq!(outcome.valid.len(), 2);
        assert_eq!(outcome.invalid.len(), 2);
        assert_eq!(outcome.invalid[0].index, 1);
        assert_eq!(outcome.invalid[1].index, 3);
        assert!(!outcome.is_clean());
    }

    #[test]
    fn test_clean_batch() {
        let inputs = ["arn:aws:s3:::bucket-a"];
        let outcome = validate_batch(&inputs, validate_arn);
        assert!(outcome.is_clean());
    }
}
