// Copyright 2026 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Rollback/restore normalizer: reduces rollback and restore actions to
//! two uniform maps — files deleted per partition and files appended (with
//! sizes) per partition — applying the skip rules that decide whether an
//! entry is visible to the index at all.

use crate::action::{RestoreMetadata, RollbackMetadata};
use crate::error::{MetadataError, MetadataResult};
use crate::timeline::{ActionKind, Instant, Timeline};
use crate::util::path::file_name;
use std::collections::BTreeMap;
use tracing::info;

/// Normalized view of one or more rollbacks, keyed by the partition name
/// as reported by the writer (not yet canonicalized).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RollbackChanges {
    pub partition_to_deleted_files: BTreeMap<String, Vec<String>>,
    pub partition_to_appended_files: BTreeMap<String, BTreeMap<String, i64>>,
}

impl RollbackChanges {
    /// Drop the deletion side of the view. Used when the rolled-back
    /// instant was never synced to the index: the files it added were
    /// never recorded, so there is nothing to delete, but rollback log
    /// appends are real writes that must be kept.
    pub fn clear_deleted_files(&mut self) {
        self.partition_to_deleted_files.clear();
    }
}

/// Fold one rollback's partition entries into `changes`, applying the
/// skip rules.
///
/// For each partition entry of the rollback:
/// 1. If the rolled-back instant is ahead of `last_sync_ts` the index
///    never saw it; without non-zero log appends the entry is skipped.
/// 2. If the instant falls before the start of the metadata timeline the
///    dependency has been archived and the sync cannot proceed.
/// 3. If the corresponding deltacommit is absent from the metadata
///    timeline, deletions are not applicable; without non-zero log
///    appends the entry is skipped.
/// 4. Otherwise deletions (successful and failed alike, by filename) and
///    log appends (max-size merge) are collected.
///
/// # Errors
///
/// [`MetadataError::ArchivedDependency`] for rule 2, and
/// [`MetadataError::InvariantViolation`] when the rollback names no
/// commit.
pub fn process_rollback_metadata(
    metadata_timeline: &dyn Timeline,
    rollback: &RollbackMetadata,
    changes: &mut RollbackChanges,
    last_sync_ts: Option<&str>,
) -> MetadataResult<()> {
    let instant_to_rollback = rollback.instant_to_rollback().ok_or_else(|| {
        MetadataError::InvariantViolation("rollback metadata names no commit to roll back".into())
    })?;

    for (partition, pm) in &rollback.partition_metadata {
        let has_rollback_log_files = !pm.rollback_log_files.is_empty();
        let has_non_zero_rollback_log_files = pm.has_non_zero_log_files();

        // The metadata table timeline is behind the instant being rolled
        // back: it never saw the files, so there is nothing to undo.
        let mut should_skip =
            last_sync_ts.is_some_and(|last_sync| instant_to_rollback > last_sync);
        if !has_non_zero_rollback_log_files && should_skip {
            info!(
                "Skipping syncing of rollbackMetadata at {}, given metadata table is already synced upto to {}",
                instant_to_rollback,
                last_sync_ts.unwrap_or_default()
            );
            continue;
        }

        // The instant being rolled back may have been a failed commit that
        // never reached the metadata table; only completed instants are
        // synced. The corresponding instant must still be within the
        // retained timeline to tell those cases apart.
        let synced_instant = Instant::completed(ActionKind::DeltaCommit, instant_to_rollback);
        if metadata_timeline.is_before_timeline_start(&synced_instant.timestamp) {
            return Err(MetadataError::ArchivedDependency {
                instant: synced_instant.to_string(),
                rolled_back: instant_to_rollback.to_string(),
            });
        }

        should_skip = !metadata_timeline.contains_instant(&synced_instant);
        if !has_non_zero_rollback_log_files && should_skip {
            info!(
                "Skipping syncing of rollbackMetadata at {}, since this instant was never committed to Metadata Table",
                instant_to_rollback
            );
            continue;
        }

        if (!pm.success_delete_files.is_empty() || !pm.failed_delete_files.is_empty())
            && !should_skip
        {
            let deleted = changes
                .partition_to_deleted_files
                .entry(partition.clone())
                .or_default();
            deleted.extend(
                pm.success_delete_files
                    .iter()
                    .chain(pm.failed_delete_files.iter())
                    .map(|path| file_name(path).to_string()),
            );
        }

        if has_rollback_log_files {
            let appended = changes
                .partition_to_appended_files
                .entry(partition.clone())
                .or_default();
            for (path, size) in &pm.rollback_log_files {
                // Zero-length entries are placeholders, not writes
                if *size == 0 {
                    continue;
                }
                // A file present in both written and rollback log files
                // keeps the larger size: the rollback may have appended
                // after the written size was computed.
                appended
                    .entry(file_name(path).to_string())
                    .and_modify(|existing| *existing = (*existing).max(*size))
                    .or_insert(*size);
            }
        }
    }

    Ok(())
}

/// Fold every rollback of a restore, in instant order, into one
/// normalized view.
///
/// # Errors
///
/// Propagates the fatal conditions of [`process_rollback_metadata`].
pub fn process_restore_metadata(
    metadata_timeline: &dyn Timeline,
    restore: &RestoreMetadata,
    changes: &mut RollbackChanges,
    last_sync_ts: Option<&str>,
) -> MetadataResult<()> {
    for rollback in restore.rollbacks() {
        process_rollback_metadata(metadata_timeline, rollback, changes, last_sync_ts)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    /// Timeline with a fixed set of synced deltacommit timestamps.
    struct FixedTimeline {
        start: String,
        completed: BTreeSet<String>,
    }

    impl FixedTimeline {
        fn new(start: &str, completed: &[&str]) -> Self {
            Self {
                start: start.to_string(),
                completed: completed.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    impl Timeline for FixedTimeline {
        fn contains_instant(&self, instant: &Instant) -> bool {
            self.completed.contains(&instant.timestamp)
        }

        fn is_before_timeline_start(&self, timestamp: &str) -> bool {
            timestamp < self.start.as_str()
        }
    }

    fn rollback_of(instant: &str, partition_json: &str) -> RollbackMetadata {
        RollbackMetadata::from_json(
            format!(
                r#"{{"commitsRollback": ["{}"], "partitionMetadata": {}}}"#,
                instant, partition_json
            )
            .as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn test_rollback_ahead_of_sync_without_appends_is_skipped() {
        let timeline = FixedTimeline::new("t1", &["t5"]);
        let rollback = rollback_of(
            "t7",
            r#"{"p1": {"successDeleteFiles": ["/t/p1/f1_t7.parquet"]}}"#,
        );

        let mut changes = RollbackChanges::default();
        process_rollback_metadata(&timeline, &rollback, &mut changes, Some("t5")).unwrap();
        assert_eq!(changes, RollbackChanges::default());
    }

    #[test]
    fn test_rollback_ahead_of_sync_with_appends_keeps_log_files() {
        let timeline = FixedTimeline::new("t1", &["t5"]);
        let rollback = rollback_of(
            "t7",
            r#"{"p1": {"successDeleteFiles": ["/t/p1/f1_t7.parquet"],
                       "rollbackLogFiles": {"/t/p1/.f2.log.1": 10, "/t/p1/.f3.log.1": 0}}}"#,
        );

        let mut changes = RollbackChanges::default();
        process_rollback_metadata(&timeline, &rollback, &mut changes, Some("t5")).unwrap();

        // Deletions are suppressed (instant absent from metadata
        // timeline); only the log file with actual bytes survives.
        assert!(changes.partition_to_deleted_files.is_empty());
        let appended = &changes.partition_to_appended_files["p1"];
        assert_eq!(appended.get(".f2.log.1"), Some(&10));
        assert_eq!(appended.get(".f3.log.1"), None);
    }

    #[test]
    fn test_rollback_of_archived_instant_is_fatal() {
        let timeline = FixedTimeline::new("t5", &["t5", "t6"]);
        let rollback = rollback_of("t3", r#"{"p1": {"successDeleteFiles": ["/t/p1/f1.parquet"]}}"#);

        let mut changes = RollbackChanges::default();
        let result = process_rollback_metadata(&timeline, &rollback, &mut changes, None);
        assert!(matches!(
            result,
            Err(MetadataError::ArchivedDependency { .. })
        ));
    }

    #[test]
    fn test_rollback_of_never_synced_instant_is_skipped() {
        let timeline = FixedTimeline::new("t1", &["t5"]);
        // t6 is after the timeline start but was never completed there
        let rollback = rollback_of("t6", r#"{"p1": {"successDeleteFiles": ["/t/p1/f1.parquet"]}}"#);

        let mut changes = RollbackChanges::default();
        process_rollback_metadata(&timeline, &rollback, &mut changes, None).unwrap();
        assert_eq!(changes, RollbackChanges::default());
    }

    #[test]
    fn test_rollback_of_synced_instant_collects_both_delete_sets() {
        let timeline = FixedTimeline::new("t1", &["t5"]);
        let rollback = rollback_of(
            "t5",
            r#"{"p1": {"successDeleteFiles": ["/t/p1/f1_t5.parquet"],
                       "failedDeleteFiles": ["/t/p1/f2_t5.parquet"]}}"#,
        );

        let mut changes = RollbackChanges::default();
        process_rollback_metadata(&timeline, &rollback, &mut changes, Some("t6")).unwrap();

        assert_eq!(
            changes.partition_to_deleted_files["p1"],
            vec!["f1_t5.parquet", "f2_t5.parquet"]
        );
    }

    #[test]
    fn test_append_sizes_merge_by_max() {
        let timeline = FixedTimeline::new("t1", &["t5", "t6"]);
        let first = rollback_of(
            "t5",
            r#"{"p1": {"rollbackLogFiles": {"/t/p1/.f2.log.1": 10}}}"#,
        );
        let second = rollback_of(
            "t6",
            r#"{"p1": {"rollbackLogFiles": {"/t/p1/.f2.log.1": 6}}}"#,
        );

        let mut changes = RollbackChanges::default();
        process_rollback_metadata(&timeline, &first, &mut changes, None).unwrap();
        process_rollback_metadata(&timeline, &second, &mut changes, None).unwrap();

        assert_eq!(
            changes.partition_to_appended_files["p1"].get(".f2.log.1"),
            Some(&10)
        );
    }

    #[test]
    fn test_restore_folds_all_rollbacks() {
        let timeline = FixedTimeline::new("t1", &["t5", "t6"]);
        let restore = RestoreMetadata::from_json(
            br#"{"instantToRollbackMetadata": {
                "t9": [{"commitsRollback": ["t6"],
                        "partitionMetadata": {"p2": {"successDeleteFiles": ["/t/p2/f6.parquet"]}}}],
                "t8": [{"commitsRollback": ["t5"],
                        "partitionMetadata": {"p1": {"successDeleteFiles": ["/t/p1/f5.parquet"]}}}]
            }}"#,
        )
        .unwrap();

        let mut changes = RollbackChanges::default();
        process_restore_metadata(&timeline, &restore, &mut changes, None).unwrap();

        assert_eq!(changes.partition_to_deleted_files.len(), 2);
        assert_eq!(changes.partition_to_deleted_files["p1"], vec!["f5.parquet"]);
        assert_eq!(changes.partition_to_deleted_files["p2"], vec!["f6.parquet"]);
    }

    #[test]
    fn test_clear_deleted_files_keeps_appends() {
        let mut changes = RollbackChanges::default();
        changes
            .partition_to_deleted_files
            .insert("p1".to_string(), vec!["f1.parquet".to_string()]);
        changes.partition_to_appended_files.insert(
            "p1".to_string(),
            [(".f2.log.1".to_string(), 10_i64)].into_iter().collect(),
        );

        changes.clear_deleted_files();
        assert!(changes.partition_to_deleted_files.is_empty());
        assert_eq!(changes.partition_to_appended_files.len(), 1);
    }
}
