use crate::error::{MetadataError, MetadataResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-partition view of one rollback action.
///
/// A rollback deletes files written by the instant being rolled back and,
/// on merge-on-read tables, may append rollback blocks to log files; both
/// effects are recorded here with absolute paths.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RollbackPartitionMetadata {
    pub partition_path: Option<String>,
    #[serde(default)]
    pub success_delete_files: Vec<String>,
    #[serde(default)]
    pub failed_delete_files: Vec<String>,
    /// Log files the rollback appended to, with their post-append sizes.
    #[serde(default)]
    pub rollback_log_files: BTreeMap<String, i64>,
}

impl RollbackPartitionMetadata {
    /// Whether any rollback log file carries actual bytes. Zero-length
    /// entries are placeholders and do not make the rollback visible to an
    /// index that never saw the rolled-back instant.
    pub fn has_non_zero_log_files(&self) -> bool {
        self.rollback_log_files.values().sum::<i64>() > 0
    }
}

/// Rollback action metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackMetadata {
    pub start_rollback_time: Option<String>,
    /// Instants rolled back by this action; a rollback targets exactly one
    /// commit, extra entries are ignored.
    pub commits_rollback: Vec<String>,
    pub partition_metadata: BTreeMap<String, RollbackPartitionMetadata>,
}

impl RollbackMetadata {
    /// Parse a rollback blob.
    ///
    /// # Errors
    ///
    /// [`MetadataError::MalformedAction`] when the blob is invalid or a
    /// required field is missing.
    pub fn from_json(bytes: &[u8]) -> MetadataResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| MetadataError::malformed("rollback", e))
    }

    /// The instant this rollback targets.
    pub fn instant_to_rollback(&self) -> Option<&str> {
        self.commits_rollback.first().map(String::as_str)
    }
}

/// Restore action metadata: the rollbacks performed per restored instant,
/// ordered by instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreMetadata {
    pub instant_to_rollback_metadata: BTreeMap<String, Vec<RollbackMetadata>>,
}

impl RestoreMetadata {
    /// Parse a restore blob.
    ///
    /// # Errors
    ///
    /// [`MetadataError::MalformedAction`] when the blob is invalid or the
    /// rollback map is missing.
    pub fn from_json(bytes: &[u8]) -> MetadataResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| MetadataError::malformed("restore", e))
    }

    /// All inner rollbacks in instant order.
    pub fn rollbacks(&self) -> impl Iterator<Item = &RollbackMetadata> {
        self.instant_to_rollback_metadata.values().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLLBACK_JSON: &str = r#"{
        "startRollbackTime": "t8",
        "commitsRollback": ["t7"],
        "partitionMetadata": {
            "p1": {"partitionPath": "p1",
                   "successDeleteFiles": ["/tables/t/p1/f1_0-1-0_t7.parquet"],
                   "failedDeleteFiles": [],
                   "rollbackLogFiles": {"/tables/t/p1/.f2.log.2": 128}}
        }
    }"#;

    #[test]
    fn test_from_json() {
        let rollback = RollbackMetadata::from_json(ROLLBACK_JSON.as_bytes()).unwrap();
        assert_eq!(rollback.instant_to_rollback(), Some("t7"));
        let pm = &rollback.partition_metadata["p1"];
        assert_eq!(pm.success_delete_files.len(), 1);
        assert!(pm.has_non_zero_log_files());
    }

    #[test]
    fn test_zero_length_log_files_not_visible() {
        let pm = RollbackPartitionMetadata {
            rollback_log_files: [("p1/.f2.log.2".to_string(), 0)].into_iter().collect(),
            ..Default::default()
        };
        assert!(!pm.has_non_zero_log_files());
        assert!(!pm.rollback_log_files.is_empty());
    }

    #[test]
    fn test_missing_commits_rollback_is_malformed() {
        let result = RollbackMetadata::from_json(br#"{"partitionMetadata": {}}"#);
        assert!(matches!(
            result,
            Err(MetadataError::MalformedAction { action, .. }) if action == "rollback"
        ));
    }

    #[test]
    fn test_restore_orders_rollbacks_by_instant() {
        let restore = RestoreMetadata::from_json(
            br#"{"instantToRollbackMetadata": {
                "t9": [{"commitsRollback": ["t7"], "partitionMetadata": {}}],
                "t8": [{"commitsRollback": ["t6"], "partitionMetadata": {}}]
            }}"#,
        )
        .unwrap();

        let targets: Vec<_> = restore
            .rollbacks()
            .filter_map(|r| r.instant_to_rollback())
            .collect();
        assert_eq!(targets, vec!["t6", "t7"]);
    }
}
