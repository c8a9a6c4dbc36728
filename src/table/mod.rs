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

//! Table-level configuration and the reserved names of the table layout.

use std::collections::HashMap;

/// Partition name under which stats for a non-partitioned table are keyed.
pub const NON_PARTITIONED_NAME: &str = "__non_partitioned__";

/// The partition name writers report for a non-partitioned table.
pub const EMPTY_PARTITION_NAME: &str = "";

/// Key of the record enumerating all partitions in the files index.
pub const ALL_PARTITIONS_KEY: &str = "__all_partitions__";

/// Reserved directory holding the timeline and the metadata table.
pub const METAFOLDER_NAME: &str = ".lake";

/// Marker file whose presence tags a directory as a partition.
pub const PARTITION_METAFILE: &str = ".partition_metadata";

/// Fields prepended to the writer schema when the table materializes
/// record-level metadata columns.
pub const META_FIELDS: [&str; 5] = [
    "_commit_time",
    "_commit_seqno",
    "_record_key",
    "_partition_path",
    "_file_name",
];

/// Canonical partition name: the empty partition maps to the
/// non-partitioned sentinel, everything else is passed through.
pub fn partition_name(path: &str) -> &str {
    if path == EMPTY_PARTITION_NAME {
        NON_PARTITIONED_NAME
    } else {
        path
    }
}

/// Base path of the metadata table under a table's base path.
pub fn metadata_table_base_path(table_base_path: &str) -> String {
    format!(
        "{}/{}/metadata",
        table_base_path.trim_end_matches('/'),
        METAFOLDER_NAME
    )
}

/// Parsed table properties.
///
/// The table carries a `key=value` properties file under the meta folder;
/// the indexing subsystem needs the record-key columns (column-stats
/// fallback), whether metadata columns are materialized, and the base file
/// format.
#[derive(Debug, Clone)]
pub struct TableConfig {
    pub table_name: String,
    pub record_key_fields: Vec<String>,
    pub partition_fields: Vec<String>,
    pub base_file_format: String,
    pub populate_meta_fields: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            table_name: String::new(),
            record_key_fields: Vec::new(),
            partition_fields: Vec::new(),
            base_file_format: "PARQUET".to_string(),
            populate_meta_fields: true,
        }
    }
}

impl TableConfig {
    /// Parse a properties file body into a structured config.
    pub fn parse(content: &str) -> Self {
        let mut properties: HashMap<String, String> = HashMap::new();

        for line in content.lines() {
            let line = line.trim();
            // Skip comments and empty lines
            if line.starts_with('#') || line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                properties.insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        let mut config = TableConfig::default();
        config.table_name = properties.get("table.name").cloned().unwrap_or_default();
        config.record_key_fields = properties
            .get("table.recordkey.fields")
            .map(|s| split_fields(s))
            .unwrap_or_default();
        config.partition_fields = properties
            .get("table.partition.fields")
            .map(|s| split_fields(s))
            .unwrap_or_default();
        config.base_file_format = properties
            .get("table.base.file.format")
            .cloned()
            .unwrap_or_else(|| "PARQUET".to_string());
        config.populate_meta_fields = properties
            .get("table.populate.meta.fields")
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(true);

        config
    }
}

fn split_fields(s: &str) -> Vec<String> {
    s.split(',')
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect()
}
