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

use crate::error::{MetadataError, MetadataResult};
use crate::reader::ColumnRange;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Statistics for a single file touched by one commit.
///
/// A file may be reported several times within one commit (append after
/// append); sizes are monotonically non-decreasing, so consumers keep the
/// maximum observed size.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WriteStat {
    pub file_id: Option<String>,
    pub path: Option<String>,
    pub prev_commit: Option<String>,
    pub partition_path: Option<String>,
    #[serde(default)]
    pub num_writes: i64,
    #[serde(default)]
    pub num_deletes: i64,
    #[serde(default)]
    pub num_inserts: i64,
    #[serde(default)]
    pub total_write_bytes: i64,
    #[serde(default)]
    pub file_size_in_bytes: i64,
    /// True for log/delta writes; such stats never reach the bloom-filter
    /// or column-stats indices.
    #[serde(default)]
    pub is_delta: bool,
    /// Per-column ranges precomputed by the writer for delta writes.
    pub records_stats: Option<RecordStats>,
}

/// Precomputed per-column statistics attached to a delta write stat.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RecordStats {
    #[serde(default)]
    pub stats: BTreeMap<String, ColumnRange>,
}

/// Commit action metadata: per-partition write statistics plus writer
/// bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitMetadata {
    pub partition_to_write_stats: BTreeMap<String, Vec<WriteStat>>,
    pub operation_type: Option<String>,
    #[serde(default)]
    pub compacted: bool,
    pub extra_metadata: Option<BTreeMap<String, String>>,
}

impl CommitMetadata {
    /// Extra-metadata key under which writers record their schema.
    pub const SCHEMA_KEY: &'static str = "schema";

    /// Parse a commit blob.
    ///
    /// # Errors
    ///
    /// [`MetadataError::MalformedAction`] when the blob is invalid or the
    /// write-stats map is missing.
    pub fn from_json(bytes: &[u8]) -> MetadataResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| MetadataError::malformed("commit", e))
    }

    /// The writer schema string recorded in extra metadata, if any.
    pub fn writer_schema(&self) -> Option<&str> {
        self.extra_metadata
            .as_ref()
            .and_then(|m| m.get(Self::SCHEMA_KEY))
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// All write stats across partitions, each tagged with its partition
    /// key from the enclosing map.
    pub fn all_write_stats(&self) -> Vec<(String, WriteStat)> {
        self.partition_to_write_stats
            .iter()
            .flat_map(|(partition, stats)| {
                stats
                    .iter()
                    .map(move |stat| (partition.clone(), stat.clone()))
            })
            .collect()
    }
}
