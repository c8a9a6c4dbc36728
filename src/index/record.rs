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

//! Record model of the metadata table.
//!
//! Builders emit [`MetadataRecord`] values — a tagged union with exactly
//! four shapes — and the router groups them by [`MetadataPartitionType`]
//! and file group. [`MetadataPayload`] is the stable wire shape used for
//! persistence.

use crate::error::{MetadataError, MetadataResult};
use crate::reader::ColumnRange;
use crate::table::{partition_name, ALL_PARTITIONS_KEY};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Separator between key segments (partition, filename, column).
pub const KEY_SEPARATOR: char = '\u{0}';

/// Logical partition of the metadata table a record is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetadataPartitionType {
    Files,
    BloomFilters,
    ColumnStats,
}

impl MetadataPartitionType {
    /// Physical partition name inside the metadata table.
    pub fn partition_path(&self) -> &'static str {
        match self {
            MetadataPartitionType::Files => "files",
            MetadataPartitionType::BloomFilters => "bloom_filters",
            MetadataPartitionType::ColumnStats => "column_stats",
        }
    }

    /// Record type tag used on the wire.
    pub fn record_type(&self) -> i32 {
        match self {
            MetadataPartitionType::Files => 1,
            MetadataPartitionType::BloomFilters => 2,
            MetadataPartitionType::ColumnStats => 3,
        }
    }
}

/// One file entry of a filesystem payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub size: i64,
    pub is_deleted: bool,
}

/// Bloom-filter payload of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloomFilterMetadata {
    /// Filter implementation code; empty on tombstones.
    #[serde(rename = "type")]
    pub type_code: String,
    /// Instant at which the filter was indexed.
    pub timestamp: String,
    pub bloom_filter: Bytes,
    pub is_deleted: bool,
}

/// Column-statistics payload of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnStatsMetadata {
    pub file_name: String,
    pub column_name: String,
    pub min_value: Option<String>,
    pub max_value: Option<String>,
    pub value_count: i64,
    pub null_count: i64,
    pub total_size: i64,
    pub total_uncompressed_size: i64,
    pub is_deleted: bool,
}

impl ColumnStatsMetadata {
    /// Merge a newer column-stats payload into an older one for the same
    /// file. A tombstone replaces the record outright. Otherwise bounds
    /// widen and counts sum; both bounds are derived from the two `min`
    /// fields, matching the long-standing observable behavior of this
    /// merge.
    ///
    /// # Errors
    ///
    /// [`MetadataError::InvariantViolation`] when the two payloads name
    /// different files.
    pub fn merge(old: &ColumnStatsMetadata, new: &ColumnStatsMetadata) -> MetadataResult<Self> {
        if old.file_name != new.file_name {
            return Err(MetadataError::InvariantViolation(format!(
                "cannot merge column stats of '{}' into '{}'",
                new.file_name, old.file_name
            )));
        }
        if new.is_deleted {
            return Ok(new.clone());
        }

        let mins = [old.min_value.clone(), new.min_value.clone()];
        let min_value = mins
            .iter()
            .flatten()
            .min()
            .cloned();
        let max_value = mins.iter().flatten().max().cloned();

        Ok(ColumnStatsMetadata {
            file_name: new.file_name.clone(),
            column_name: new.column_name.clone(),
            min_value,
            max_value,
            value_count: old.value_count + new.value_count,
            null_count: old.null_count + new.null_count,
            total_size: old.total_size + new.total_size,
            total_uncompressed_size: old.total_uncompressed_size + new.total_uncompressed_size,
            is_deleted: new.is_deleted,
        })
    }
}

/// A record destined for the metadata table, tagged by shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MetadataRecord {
    /// The list of partitions of the table.
    #[serde(rename_all = "camelCase")]
    PartitionList { partitions: Vec<String> },

    /// Files added to and removed from one partition.
    #[serde(rename_all = "camelCase")]
    PartitionFiles {
        partition: String,
        files_added: BTreeMap<String, i64>,
        files_deleted: Vec<String>,
    },

    /// Bloom filter of one base file, or its tombstone.
    #[serde(rename_all = "camelCase")]
    BloomFilterEntry {
        partition: String,
        file_name: String,
        bloom_filter: BloomFilterMetadata,
    },

    /// Column statistics of one (file, column), or its tombstone.
    #[serde(rename_all = "camelCase")]
    ColumnStats {
        partition: String,
        stats: ColumnStatsMetadata,
    },
}

impl MetadataRecord {
    /// Record for the top-level partition list. Partition names are
    /// canonicalized, so a non-partitioned table lists the sentinel.
    pub fn partition_list(partitions: Vec<String>) -> Self {
        let partitions = partitions
            .into_iter()
            .map(|p| partition_name(&p).to_string())
            .collect();
        MetadataRecord::PartitionList { partitions }
    }

    /// Record carrying file additions and/or deletions for one partition.
    pub fn partition_files(
        partition: impl Into<String>,
        files_added: Option<BTreeMap<String, i64>>,
        files_deleted: Option<Vec<String>>,
    ) -> Self {
        MetadataRecord::PartitionFiles {
            partition: partition.into(),
            files_added: files_added.unwrap_or_default(),
            files_deleted: files_deleted.unwrap_or_default(),
        }
    }

    /// Live bloom-filter record for one base file.
    pub fn bloom_filter(
        partition: impl Into<String>,
        file_name: impl Into<String>,
        instant_time: impl Into<String>,
        type_code: impl Into<String>,
        bloom_filter: Bytes,
    ) -> Self {
        MetadataRecord::BloomFilterEntry {
            partition: partition.into(),
            file_name: file_name.into(),
            bloom_filter: BloomFilterMetadata {
                type_code: type_code.into(),
                timestamp: instant_time.into(),
                bloom_filter,
                is_deleted: false,
            },
        }
    }

    /// Tombstone replacing the bloom-filter record of a deleted base file.
    pub fn bloom_filter_tombstone(
        partition: impl Into<String>,
        file_name: impl Into<String>,
        instant_time: impl Into<String>,
    ) -> Self {
        MetadataRecord::BloomFilterEntry {
            partition: partition.into(),
            file_name: file_name.into(),
            bloom_filter: BloomFilterMetadata {
                type_code: String::new(),
                timestamp: instant_time.into(),
                bloom_filter: Bytes::new(),
                is_deleted: true,
            },
        }
    }

    /// Column-stats records for one file, one per range.
    pub fn column_stats(
        partition: &str,
        ranges: Vec<ColumnRange>,
        is_deleted: bool,
    ) -> Vec<Self> {
        ranges
            .into_iter()
            .map(|range| MetadataRecord::ColumnStats {
                partition: partition.to_string(),
                stats: ColumnStatsMetadata {
                    file_name: range.file_name,
                    column_name: range.column_name,
                    min_value: range.min_value,
                    max_value: range.max_value,
                    value_count: range.value_count,
                    null_count: range.null_count,
                    total_size: range.total_size,
                    total_uncompressed_size: range.total_uncompressed_size,
                    is_deleted,
                },
            })
            .collect()
    }

    /// The metadata-table partition this record is routed to.
    pub fn partition_type(&self) -> MetadataPartitionType {
        match self {
            MetadataRecord::PartitionList { .. } | MetadataRecord::PartitionFiles { .. } => {
                MetadataPartitionType::Files
            }
            MetadataRecord::BloomFilterEntry { .. } => MetadataPartitionType::BloomFilters,
            MetadataRecord::ColumnStats { .. } => MetadataPartitionType::ColumnStats,
        }
    }

    /// The upsert key of this record. Tombstones carry the same key as the
    /// live record they replace.
    pub fn key(&self) -> String {
        match self {
            MetadataRecord::PartitionList { .. } => ALL_PARTITIONS_KEY.to_string(),
            MetadataRecord::PartitionFiles { partition, .. } => partition.clone(),
            MetadataRecord::BloomFilterEntry {
                partition,
                file_name,
                ..
            } => format!("{}{}{}", partition, KEY_SEPARATOR, file_name),
            MetadataRecord::ColumnStats { partition, stats } => format!(
                "{}{}{}{}{}",
                partition, KEY_SEPARATOR, stats.file_name, KEY_SEPARATOR, stats.column_name
            ),
        }
    }

    /// The stable persistence shape of this record.
    pub fn to_payload(&self) -> MetadataPayload {
        let mut payload = MetadataPayload {
            key: self.key(),
            record_type: self.partition_type().record_type(),
            filesystem_metadata: None,
            bloom_filter_metadata: None,
            column_stats_metadata: None,
        };

        match self {
            MetadataRecord::PartitionList { partitions } => {
                let files = partitions
                    .iter()
                    .map(|p| {
                        (
                            p.clone(),
                            FileInfo {
                                size: 0,
                                is_deleted: false,
                            },
                        )
                    })
                    .collect();
                payload.filesystem_metadata = Some(files);
            }
            MetadataRecord::PartitionFiles {
                files_added,
                files_deleted,
                ..
            } => {
                let mut files: BTreeMap<String, FileInfo> = files_added
                    .iter()
                    .map(|(name, size)| {
                        (
                            name.clone(),
                            FileInfo {
                                size: *size,
                                is_deleted: false,
                            },
                        )
                    })
                    .collect();
                for name in files_deleted {
                    files.insert(
                        name.clone(),
                        FileInfo {
                            size: 0,
                            is_deleted: true,
                        },
                    );
                }
                payload.filesystem_metadata = Some(files);
            }
            MetadataRecord::BloomFilterEntry { bloom_filter, .. } => {
                payload.bloom_filter_metadata = Some(bloom_filter.clone());
            }
            MetadataRecord::ColumnStats { stats, .. } => {
                payload.column_stats_metadata = Some(stats.clone());
            }
        }

        payload
    }
}

/// Wire shape of a metadata-table record: routing key, type tag, and at
/// most one payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPayload {
    pub key: String,
    #[serde(rename = "type")]
    pub record_type: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem_metadata: Option<BTreeMap<String, FileInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bloom_filter_metadata: Option<BloomFilterMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_stats_metadata: Option<ColumnStatsMetadata>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::NON_PARTITIONED_NAME;

    fn stats(file: &str, column: &str, min: &str, max: &str) -> ColumnStatsMetadata {
        ColumnStatsMetadata {
            file_name: file.to_string(),
            column_name: column.to_string(),
            min_value: Some(min.to_string()),
            max_value: Some(max.to_string()),
            value_count: 10,
            null_count: 2,
            total_size: 100,
            total_uncompressed_size: 150,
            is_deleted: false,
        }
    }

    #[test]
    fn test_partition_list_canonicalizes_names() {
        let record = MetadataRecord::partition_list(vec!["".to_string()]);
        match &record {
            MetadataRecord::PartitionList { partitions } => {
                assert_eq!(partitions, &vec![NON_PARTITIONED_NAME.to_string()]);
            }
            other => panic!("unexpected record {:?}", other),
        }
        assert_eq!(record.key(), ALL_PARTITIONS_KEY);
        assert_eq!(record.partition_type(), MetadataPartitionType::Files);
    }

    #[test]
    fn test_keys_per_partition_type() {
        let files = MetadataRecord::partition_files("p1", None, None);
        assert_eq!(files.key(), "p1");

        let bloom =
            MetadataRecord::bloom_filter("p1", "f1.parquet", "t1", "dynamic", Bytes::new());
        assert_eq!(bloom.key(), "p1\u{0}f1.parquet");

        let stats_records = MetadataRecord::column_stats(
            "p1",
            vec![ColumnRange {
                file_name: "f1.parquet".to_string(),
                column_name: "a".to_string(),
                ..Default::default()
            }],
            false,
        );
        assert_eq!(stats_records[0].key(), "p1\u{0}f1.parquet\u{0}a");
    }

    #[test]
    fn test_tombstone_key_matches_live_key() {
        let live = MetadataRecord::bloom_filter("p1", "f1.parquet", "t1", "dynamic", Bytes::new());
        let tombstone = MetadataRecord::bloom_filter_tombstone("p1", "f1.parquet", "t2");
        assert_eq!(live.key(), tombstone.key());

        match tombstone {
            MetadataRecord::BloomFilterEntry { bloom_filter, .. } => {
                assert!(bloom_filter.is_deleted);
                assert!(bloom_filter.type_code.is_empty());
                assert!(bloom_filter.bloom_filter.is_empty());
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_payload_merges_added_and_deleted() {
        let record = MetadataRecord::partition_files(
            "p1",
            Some([("f1.parquet".to_string(), 100_i64)].into_iter().collect()),
            Some(vec!["f0.parquet".to_string()]),
        );
        let payload = record.to_payload();
        assert_eq!(payload.record_type, 1);
        let files = payload.filesystem_metadata.unwrap();
        assert_eq!(files["f1.parquet"].size, 100);
        assert!(!files["f1.parquet"].is_deleted);
        assert!(files["f0.parquet"].is_deleted);
    }

    #[test]
    fn test_merge_requires_same_file() {
        let result = ColumnStatsMetadata::merge(
            &stats("f1.parquet", "a", "b", "c"),
            &stats("f2.parquet", "a", "b", "c"),
        );
        assert!(matches!(
            result,
            Err(MetadataError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_merge_tombstone_wins() {
        let mut tombstone = stats("f1.parquet", "a", "", "");
        tombstone.is_deleted = true;
        tombstone.min_value = None;
        tombstone.max_value = None;
        let merged =
            ColumnStatsMetadata::merge(&stats("f1.parquet", "a", "b", "y"), &tombstone).unwrap();
        assert!(merged.is_deleted);
        assert_eq!(merged.min_value, None);
    }

    #[test]
    fn test_merge_bounds_come_from_min_fields() {
        let old = stats("f1.parquet", "a", "d", "p");
        let new = stats("f1.parquet", "a", "b", "z");
        let merged = ColumnStatsMetadata::merge(&old, &new).unwrap();

        assert_eq!(merged.min_value.as_deref(), Some("b"));
        // Both bounds are taken from the min fields; "z" does not survive.
        assert_eq!(merged.max_value.as_deref(), Some("d"));
        assert_eq!(merged.value_count, 20);
        assert_eq!(merged.null_count, 4);
        assert_eq!(merged.total_size, 200);
        assert_eq!(merged.total_uncompressed_size, 300);
    }

    #[test]
    fn test_wire_payload_serialization() {
        let record = MetadataRecord::bloom_filter_tombstone("p1", "f1.parquet", "t2");
        let json = serde_json::to_value(record.to_payload()).unwrap();
        assert_eq!(json["type"], 2);
        assert_eq!(json["key"], "p1\u{0}f1.parquet");
        assert_eq!(json["bloomFilterMetadata"]["isDeleted"], true);
        assert!(json.get("filesystemMetadata").is_none());
    }
}
