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

//! Column-statistics index builder.
//!
//! Ranges come from three places: precomputed per-column stats on delta
//! write stats, parquet footers of newly written base files, and — when
//! ranges must be recomputed from records — the streaming accumulator at
//! the bottom of this module. Minimum and maximum are carried and compared
//! as strings throughout.

use crate::action::{CleanMetadata, CommitMetadata, WriteStat};
use crate::engine::{EngineContext, EngineData};
use crate::error::{MetadataError, MetadataResult};
use crate::index::record::MetadataRecord;
use crate::index::{stage_parallelism, RecordResult, RecordsGenerationParams};
use crate::reader::{ColumnRange, FileReader};
use crate::table::{partition_name, TableConfig, META_FIELDS};
use crate::util::path::{file_name, is_base_file, strip_partition_prefix};
use apache_avro::types::Value;
use apache_avro::Schema;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Extension of the only base-file format that carries per-column ranges.
const COLUMNAR_EXTENSION: &str = ".parquet";

/// Top-level field names of a record schema, optionally prefixed with the
/// table's metadata columns (writer schemas omit them).
pub fn schema_field_names(schema: &Schema, include_meta_fields: bool) -> Vec<String> {
    let field_names: Vec<String> = match schema {
        Schema::Record(record) => record.fields.iter().map(|f| f.name.clone()).collect(),
        _ => Vec::new(),
    };

    if !include_meta_fields {
        return field_names;
    }

    let mut names: Vec<String> = META_FIELDS
        .iter()
        .filter(|meta| !field_names.iter().any(|f| f == *meta))
        .map(|meta| meta.to_string())
        .collect();
    names.extend(field_names);
    names
}

/// The columns the stats index covers: every top-level field when
/// all-column indexing is on and a schema is known, otherwise the table's
/// record-key columns.
pub fn columns_to_index(
    params: &RecordsGenerationParams,
    table_config: &TableConfig,
    writer_schema_fields: Option<Vec<String>>,
) -> Vec<String> {
    if params.all_column_stats_enabled {
        if let Some(fields) = writer_schema_fields {
            return fields;
        }
    }
    table_config.record_key_fields.clone()
}

/// Zeroed ranges used for tombstone records of a deleted file.
fn tombstone_ranges(deleted_file: &str, columns: &[String]) -> Vec<ColumnRange> {
    columns
        .iter()
        .map(|column| ColumnRange {
            file_name: deleted_file.to_string(),
            column_name: column.clone(),
            ..Default::default()
        })
        .collect()
}

/// Tombstone records for one deleted file, or nothing for files that never
/// carried column stats.
///
/// # Errors
///
/// [`MetadataError::UnsupportedColumnStatsFormat`] for base files in a
/// non-columnar format.
fn deleted_file_column_stats(
    partition_key: &str,
    deleted_file: &str,
    columns: &[String],
) -> MetadataResult<Vec<MetadataRecord>> {
    if !is_base_file(deleted_file) {
        return Ok(Vec::new());
    }
    if !deleted_file.ends_with(COLUMNAR_EXTENSION) {
        return Err(MetadataError::UnsupportedColumnStatsFormat(
            deleted_file.to_string(),
        ));
    }
    Ok(MetadataRecord::column_stats(
        partition_name(partition_key),
        tombstone_ranges(deleted_file, columns),
        true,
    ))
}

/// Records for one write stat of a commit.
async fn translate_write_stat(
    partition_key: String,
    stat: WriteStat,
    columns: Arc<Vec<String>>,
    file_reader: Arc<dyn FileReader>,
) -> Vec<RecordResult> {
    let partition = partition_name(&partition_key);

    if stat.is_delta {
        // Delta writes carry their ranges; without them there is nothing
        // to index for a log file.
        let Some(record_stats) = stat.records_stats else {
            return Vec::new();
        };
        return MetadataRecord::column_stats(
            partition,
            record_stats.stats.into_values().collect(),
            false,
        )
        .into_iter()
        .map(Ok)
        .collect();
    }

    let Some(path_with_partition) = stat.path.as_deref() else {
        warn!(
            "Failed to find path in write stat to update column stats, partition={}",
            partition
        );
        return Vec::new();
    };
    let filename = strip_partition_prefix(partition, path_with_partition);
    if !filename.ends_with(COLUMNAR_EXTENSION) {
        return vec![Err(MetadataError::UnsupportedColumnStatsFormat(
            filename.to_string(),
        ))];
    }

    match file_reader
        .read_column_ranges(path_with_partition, &columns)
        .await
    {
        Ok(ranges) => MetadataRecord::column_stats(partition, ranges, false)
            .into_iter()
            .map(Ok)
            .collect(),
        Err(e) => {
            warn!(
                "Failed to read column ranges for file: {}: {}",
                path_with_partition, e
            );
            Vec::new()
        }
    }
}

/// Column-stats records for the files added by one commit.
pub fn commit_to_column_stats_records<E: EngineContext>(
    engine: &E,
    commit: &CommitMetadata,
    params: &RecordsGenerationParams,
    columns: Vec<String>,
    file_reader: Arc<dyn FileReader>,
) -> EngineData<RecordResult> {
    let all_write_stats = commit.all_write_stats();
    if all_write_stats.is_empty() || columns.is_empty() {
        return engine.empty();
    }

    let parallelism =
        stage_parallelism(all_write_stats.len(), params.column_stats_index_parallelism);
    let columns = Arc::new(columns);

    engine
        .parallelize(all_write_stats, parallelism)
        .flat_map(move |(partition_key, stat)| {
            translate_write_stat(
                partition_key,
                stat,
                Arc::clone(&columns),
                Arc::clone(&file_reader),
            )
        })
}

/// Tombstone records for the files removed by one clean.
pub fn clean_to_column_stats_records<E: EngineContext>(
    engine: &E,
    clean: &CleanMetadata,
    params: &RecordsGenerationParams,
    columns: Vec<String>,
) -> EngineData<RecordResult> {
    if columns.is_empty() {
        return engine.empty();
    }

    let mut delete_file_list: Vec<(String, String)> = Vec::new();
    for (partition, pm) in &clean.partition_metadata {
        for path in &pm.delete_path_patterns {
            delete_file_list.push((partition.clone(), file_name(path).to_string()));
        }
    }

    let parallelism =
        stage_parallelism(delete_file_list.len(), params.column_stats_index_parallelism);
    let columns = Arc::new(columns);

    engine
        .parallelize(delete_file_list, parallelism)
        .flat_map(move |(partition_key, deleted_file)| {
            let columns = Arc::clone(&columns);
            async move {
                match deleted_file_column_stats(&partition_key, &deleted_file, &columns) {
                    Ok(records) => records.into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(e)],
                }
            }
        })
}

/// Records for the normalized deleted/appended file maps of a rollback or
/// restore.
pub fn files_to_column_stats_records<E: EngineContext>(
    engine: &E,
    partition_to_deleted_files: &BTreeMap<String, Vec<String>>,
    partition_to_appended_files: &BTreeMap<String, BTreeMap<String, i64>>,
    params: &RecordsGenerationParams,
    columns: Vec<String>,
    file_reader: Arc<dyn FileReader>,
) -> EngineData<RecordResult> {
    if columns.is_empty() {
        return engine.empty();
    }
    let columns = Arc::new(columns);

    let deleted_list: Vec<(String, Vec<String>)> = partition_to_deleted_files
        .iter()
        .map(|(partition, files)| (partition.clone(), files.clone()))
        .collect();
    let parallelism = stage_parallelism(deleted_list.len(), params.column_stats_index_parallelism);
    let delete_columns = Arc::clone(&columns);

    let deleted_records = engine
        .parallelize(deleted_list, parallelism)
        .flat_map(move |(partition_key, deleted_files)| {
            let columns = Arc::clone(&delete_columns);
            async move {
                let mut out = Vec::new();
                for deleted_file in &deleted_files {
                    match deleted_file_column_stats(&partition_key, deleted_file, &columns) {
                        Ok(records) => out.extend(records.into_iter().map(Ok)),
                        Err(e) => out.push(Err(e)),
                    }
                }
                out
            }
        });

    let appended_list: Vec<(String, Vec<String>)> = partition_to_appended_files
        .iter()
        .map(|(partition, files)| (partition.clone(), files.keys().cloned().collect()))
        .collect();
    let parallelism =
        stage_parallelism(appended_list.len(), params.column_stats_index_parallelism);

    let appended_records = engine
        .parallelize(appended_list, parallelism)
        .flat_map(move |(partition_key, appended_files)| {
            let columns = Arc::clone(&columns);
            let file_reader = Arc::clone(&file_reader);
            async move {
                let mut out = Vec::new();
                for appended_file in appended_files {
                    if !is_base_file(&appended_file)
                        || !appended_file.ends_with(COLUMNAR_EXTENSION)
                    {
                        continue;
                    }
                    let path_with_partition = if partition_key.is_empty() {
                        appended_file.clone()
                    } else {
                        format!("{}/{}", partition_key, appended_file)
                    };
                    match file_reader
                        .read_column_ranges(&path_with_partition, &columns)
                        .await
                    {
                        Ok(ranges) => out.extend(
                            MetadataRecord::column_stats(
                                partition_name(&partition_key),
                                ranges,
                                false,
                            )
                            .into_iter()
                            .map(Ok),
                        ),
                        Err(e) => {
                            warn!(
                                "Failed to read column ranges for file: {}: {}",
                                path_with_partition, e
                            );
                        }
                    }
                }
                out
            }
        });

    deleted_records.union(appended_records)
}

/// Running per-column statistics over a stream of records.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ColumnStatsAccumulator {
    min_value: Option<String>,
    max_value: Option<String>,
    value_count: i64,
    null_count: i64,
    total_size: i64,
    total_uncompressed_size: i64,
}

impl ColumnStatsAccumulator {
    /// Fold one field observation. Null or empty values count as nulls and
    /// never move the bounds; the minimum is seated by the first non-null
    /// observation.
    pub fn observe(&mut self, field_value: Option<&str>) {
        let field_size = field_value.map_or(0, |v| v.len() as i64);
        self.total_size += field_size;
        self.total_uncompressed_size += field_size;

        match field_value {
            Some(value) if !value.is_empty() => {
                if self.min_value.as_deref().is_none_or(|min| value < min) {
                    self.min_value = Some(value.to_string());
                }
                if self.max_value.as_deref().is_none_or(|max| value > max) {
                    self.max_value = Some(value.to_string());
                }
                self.value_count += 1;
            }
            _ => self.null_count += 1,
        }
    }

    /// The accumulated range for a column of a file.
    pub fn into_range(self, file_path: &str, column_name: &str) -> ColumnRange {
        ColumnRange {
            file_name: file_name(file_path).to_string(),
            column_name: column_name.to_string(),
            min_value: self.min_value,
            max_value: self.max_value,
            value_count: self.value_count,
            null_count: self.null_count,
            total_size: self.total_size,
            total_uncompressed_size: self.total_uncompressed_size,
        }
    }
}

/// Fold one record's fields into the per-column accumulators.
///
/// # Errors
///
/// [`MetadataError::Unsupported`] when the value is not a record of the
/// given schema.
pub fn aggregate_column_stats(
    record: &Value,
    schema: &Schema,
    column_to_stats: &mut BTreeMap<String, ColumnStatsAccumulator>,
) -> MetadataResult<()> {
    let Schema::Record(record_schema) = schema else {
        return Err(MetadataError::Unsupported(
            "column stats aggregation requires a record schema".to_string(),
        ));
    };
    let Value::Record(fields) = record else {
        return Err(MetadataError::Unsupported(
            "column stats aggregation requires record values".to_string(),
        ));
    };

    for field in &record_schema.fields {
        let value = fields
            .iter()
            .find(|(name, _)| *name == field.name)
            .map(|(_, value)| value);
        let rendered = value.and_then(value_as_string);
        column_to_stats
            .entry(field.name.clone())
            .or_default()
            .observe(rendered.as_deref());
    }
    Ok(())
}

/// Merge an accumulated range into the per-column range map, widening
/// bounds and summing counts when the column has been seen before.
pub fn accumulate_column_ranges(
    column_name: &str,
    file_path: &str,
    column_range_map: &mut BTreeMap<String, ColumnRange>,
    accumulator: ColumnStatsAccumulator,
) {
    let range = accumulator.into_range(file_path, column_name);
    column_range_map
        .entry(column_name.to_string())
        .and_modify(|existing| *existing = existing.clone().merge(range.clone()))
        .or_insert(range);
}

/// A field value rendered as the string the index stores. Unrenderable
/// shapes count as nulls.
fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Union(_, inner) => value_as_string(inner),
        Value::String(s) => Some(s.clone()),
        Value::Enum(_, symbol) => Some(symbol.clone()),
        Value::Boolean(v) => Some(v.to_string()),
        Value::Int(v) => Some(v.to_string()),
        Value::Long(v) => Some(v.to_string()),
        Value::Float(v) => Some(v.to_string()),
        Value::Double(v) => Some(v.to_string()),
        Value::Date(v) => Some(v.to_string()),
        Value::TimestampMillis(v) | Value::TimestampMicros(v) => Some(v.to_string()),
        Value::Bytes(bytes) | Value::Fixed(_, bytes) => {
            Some(String::from_utf8_lossy(bytes).to_string())
        }
        _ => None,
    }
}
