use crate::error::{MetadataError, MetadataResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-partition view of one clean action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanPartitionMetadata {
    pub partition_path: Option<String>,
    /// Paths removed from the partition by this clean.
    pub delete_path_patterns: Vec<String>,
    #[serde(default)]
    pub success_delete_files: Vec<String>,
    #[serde(default)]
    pub failed_delete_files: Vec<String>,
}

/// Clean action metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanMetadata {
    pub partition_metadata: BTreeMap<String, CleanPartitionMetadata>,
    pub earliest_commit_to_retain: Option<String>,
    #[serde(default)]
    pub total_files_deleted: i64,
}

impl CleanMetadata {
    /// Parse a clean blob.
    ///
    /// # Errors
    ///
    /// [`MetadataError::MalformedAction`] when the blob is invalid or the
    /// partition map is missing.
    pub fn from_json(bytes: &[u8]) -> MetadataResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| MetadataError::malformed("clean", e))
    }
}
