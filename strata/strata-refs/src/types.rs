//! Parsed forms of the external identifiers recognized by the index.

use serde::{Deserialize, Serialize};

/// A parsed Amazon Resource Name.
///
/// `region` and `account` may be empty strings; AWS global resources such as
/// S3 buckets omit them while keeping their colon positions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedArn {
    pub partition: String,
    pub service: String,
    pub region: String,
    pub account: String,
    pub resource: String,
    /// Resource type when the resource segment carries a `type/id` or
    /// `type:id` split
    pub resource_type: Option<String>,
    /// Resource id for split resource segments
    pub resource_id: Option<String>,
}

/// A parsed container image reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedContainerImage {
    /// Present only when the first path segment is a registry host
    pub registry: Option<String>,
    pub repository: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

/// A parsed Git repository URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedGitUrl {
    /// `https`, `http`, or `ssh` for SCP-style URLs
    pub protocol: String,
    pub host: String,
    pub owner: String,
    pub repo: String,
}

/// Cloud storage providers recognized by the storage path validator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StorageProvider {
    Aws,
    Gcp,
    Azure,
}

impl std::fmt::Display for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Aws => "aws",
            Self::Gcp => "gcp",
            Self::Azure => "azure",
        };
        write!(f, "{s}")
    }
}

/// A parsed cloud storage path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedStoragePath {
    pub provider: StorageProvider,
    /// Bucket, or container for Azure
    pub bucket: String,
    pub key: Option<String>,
    /// Storage account, Azure only
    pub account: Option<String>,
}

/// A parsed Kubernetes object reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedK8sReference {
    pub namespace: Option<String>,
    pub kind: String,
    pub name: String,
}
