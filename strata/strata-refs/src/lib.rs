//! External reference validators for the Strata index.
//!
//! Parses and normalizes the five external-identifier shapes recognized by the
//! platform: ARNs, container image references, Git URLs, storage paths, and
//! Kubernetes object references. All functions are pure and perform no I/O.

pub mod arn;
pub mod batch;
pub mod confidence;
pub mod error;
pub mod git;
pub mod image;
pub mod k8s;
pub mod normalize;
pub mod storage;
pub mod types;

pub use arn::validate_arn;
pub use batch::{validate_batch, BatchOutcome, InvalidItem};
pub use confidence::validate_confidence;
pub use error::{ValidationError, ValidationResult};
pub use git::validate_git_url;
pub use image::validate_container_image;
pub use k8s::validate_k8s_reference;
pub use normalize::normalize;
pub use storage::validate_storage_path;
pub use types::*;
