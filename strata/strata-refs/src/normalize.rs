//! Identifier normalization.
//!
//! Normalized ids are the canonical comparison form used by matchers and the
//! external object index. Normalization is idempotent and never fails: when an
//! input does not parse, the lower-cased trimmed raw input is returned as-is.

use crate::arn::validate_arn;
use strata_core::ReferenceType;

/// Normalize an external identifier for cross-repository comparison.
///
/// All kinds are lower-cased. ARNs additionally have their region and account
/// fields blanked so the same logical resource matches across regions and
/// accounts; service and resource are left intact.
pub fn normalize(kind: ReferenceType, raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    match kind {
        ReferenceType::Arn => match validate_arn(&lowered) {
            Ok(arn) => format!("arn:{}:{}:::{}", arn.partition, arn.service, arn.resource),
            Err(_) => lowered,
        },
        ReferenceType::ContainerImage
        | ReferenceType::GitUrl
        | ReferenceType::StoragePath
        | ReferenceType::K8sReference => lowered,
    }
}
