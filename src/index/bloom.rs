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

//! Bloom-filter index builder. Only base files carry bloom filters: delta
//! write stats and log filenames never produce records here. Failures to
//! read an individual filter are logged and leave that file's entry
//! absent; a later reconciliation is expected externally.

use crate::action::{CleanMetadata, CommitMetadata};
use crate::engine::{EngineContext, EngineData};
use crate::index::{stage_parallelism, RecordResult, RecordsGenerationParams};
use crate::index::record::MetadataRecord;
use crate::reader::FileReader;
use crate::table::partition_name;
use crate::util::path::{file_name, is_base_file, strip_partition_prefix};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::error;

/// Join a raw partition key and a filename into the path the writer
/// reported, tolerating the empty (non-partitioned) key.
fn join_partition_path(partition_key: &str, file: &str) -> String {
    if partition_key.is_empty() {
        file.to_string()
    } else {
        format!("{}/{}", partition_key, file)
    }
}

/// Bloom-filter records for the base files added by one commit.
pub fn commit_to_bloom_filter_records<E: EngineContext>(
    engine: &E,
    commit: &CommitMetadata,
    instant_time: &str,
    params: &RecordsGenerationParams,
    file_reader: Arc<dyn FileReader>,
) -> EngineData<RecordResult> {
    let all_write_stats = commit.all_write_stats();
    if all_write_stats.is_empty() {
        return engine.empty();
    }

    let parallelism = stage_parallelism(all_write_stats.len(), params.bloom_index_parallelism);
    let instant_time = instant_time.to_string();
    let bloom_filter_type = params.bloom_filter_type.clone();

    engine
        .parallelize(all_write_stats, parallelism)
        .flat_map(move |(partition_key, stat)| {
            let file_reader = Arc::clone(&file_reader);
            let instant_time = instant_time.clone();
            let bloom_filter_type = bloom_filter_type.clone();
            async move {
                // Delta writes do not change the base file's filter
                if stat.is_delta {
                    return Vec::new();
                }
                let Some(path_with_partition) = stat.path.as_deref() else {
                    error!(
                        "Failed to find path in write stat to update metadata table, partition={}",
                        partition_key
                    );
                    return Vec::new();
                };

                let partition = partition_name(&partition_key);
                let filename = strip_partition_prefix(partition, path_with_partition);
                if !is_base_file(filename) {
                    return Vec::new();
                }

                match file_reader.read_bloom_filter(path_with_partition).await {
                    Ok(Some(filter)) => vec![Ok(MetadataRecord::bloom_filter(
                        partition,
                        filename,
                        instant_time,
                        bloom_filter_type,
                        filter,
                    ))],
                    Ok(None) => {
                        error!("Failed to read bloom filter for {}", path_with_partition);
                        Vec::new()
                    }
                    Err(e) => {
                        error!(
                            "Failed to get bloom filter for file: {}: {}",
                            path_with_partition, e
                        );
                        Vec::new()
                    }
                }
            }
        })
}

/// Tombstone records for the base files removed by one clean.
pub fn clean_to_bloom_filter_records<E: EngineContext>(
    engine: &E,
    clean: &CleanMetadata,
    instant_time: &str,
    params: &RecordsGenerationParams,
) -> EngineData<RecordResult> {
    let mut delete_file_list: Vec<(String, String)> = Vec::new();
    for (partition, pm) in &clean.partition_metadata {
        for path in &pm.delete_path_patterns {
            let deleted_file = file_name(path);
            if is_base_file(deleted_file) {
                delete_file_list.push((partition.clone(), deleted_file.to_string()));
            }
        }
    }

    let parallelism = stage_parallelism(delete_file_list.len(), params.bloom_index_parallelism);
    let instant_time = instant_time.to_string();

    engine
        .parallelize(delete_file_list, parallelism)
        .map(move |(partition_key, deleted_file)| {
            Ok(MetadataRecord::bloom_filter_tombstone(
                partition_name(&partition_key),
                deleted_file,
                instant_time.clone(),
            ))
        })
}

/// Records for the normalized deleted/appended file maps of a rollback or
/// restore: tombstones for deleted base files, fresh filter reads for
/// appended base files.
pub fn files_to_bloom_filter_records<E: EngineContext>(
    engine: &E,
    partition_to_deleted_files: &BTreeMap<String, Vec<String>>,
    partition_to_appended_files: &BTreeMap<String, BTreeMap<String, i64>>,
    instant_time: &str,
    params: &RecordsGenerationParams,
    file_reader: Arc<dyn FileReader>,
) -> EngineData<RecordResult> {
    let deleted_list: Vec<(String, Vec<String>)> = partition_to_deleted_files
        .iter()
        .map(|(partition, files)| (partition.clone(), files.clone()))
        .collect();
    let parallelism = stage_parallelism(deleted_list.len(), params.bloom_index_parallelism);
    let instant_for_deletes = instant_time.to_string();

    let deleted_records = engine
        .parallelize(deleted_list, parallelism)
        .flat_map(move |(partition_key, deleted_files)| {
            let instant_time = instant_for_deletes.clone();
            async move {
                deleted_files
                    .iter()
                    .filter(|deleted_file| is_base_file(deleted_file))
                    .map(|deleted_file| {
                        Ok(MetadataRecord::bloom_filter_tombstone(
                            partition_name(&partition_key),
                            deleted_file.as_str(),
                            instant_time.clone(),
                        ))
                    })
                    .collect()
            }
        });

    let appended_list: Vec<(String, Vec<String>)> = partition_to_appended_files
        .iter()
        .map(|(partition, files)| (partition.clone(), files.keys().cloned().collect()))
        .collect();
    let parallelism = stage_parallelism(appended_list.len(), params.bloom_index_parallelism);
    let instant_for_appends = instant_time.to_string();
    let bloom_filter_type = params.bloom_filter_type.clone();

    let appended_records = engine
        .parallelize(appended_list, parallelism)
        .flat_map(move |(partition_key, appended_files)| {
            let file_reader = Arc::clone(&file_reader);
            let instant_time = instant_for_appends.clone();
            let bloom_filter_type = bloom_filter_type.clone();
            async move {
                let mut records = Vec::new();
                for appended_file in appended_files {
                    if !is_base_file(&appended_file) {
                        continue;
                    }
                    let path_with_partition = join_partition_path(&partition_key, &appended_file);
                    match file_reader.read_bloom_filter(&path_with_partition).await {
                        Ok(Some(filter)) => records.push(Ok(MetadataRecord::bloom_filter(
                            partition_name(&partition_key),
                            appended_file,
                            instant_time.clone(),
                            bloom_filter_type.clone(),
                            filter,
                        ))),
                        Ok(None) => {
                            error!("Failed to read bloom filter for {}", path_with_partition);
                        }
                        Err(e) => {
                            error!(
                                "Failed to get bloom filter for file: {}: {}",
                                path_with_partition, e
                            );
                        }
                    }
                }
                records
            }
        });

    deleted_records.union(appended_records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SequentialEngine;
    use crate::error::{MetadataError, MetadataResult};
    use crate::reader::ColumnRange;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    /// Reader serving canned filters and recording the paths it was asked
    /// to open.
    struct CannedReader {
        filters: BTreeMap<String, Bytes>,
        failing: BTreeSet<String>,
        requested: Mutex<Vec<String>>,
    }

    impl CannedReader {
        fn new(filters: &[(&str, &[u8])], failing: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                filters: filters
                    .iter()
                    .map(|(path, bytes)| (path.to_string(), Bytes::copy_from_slice(bytes)))
                    .collect(),
                failing: failing.iter().map(|s| s.to_string()).collect(),
                requested: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl FileReader for CannedReader {
        async fn read_bloom_filter(&self, path: &str) -> MetadataResult<Option<Bytes>> {
            self.requested.lock().unwrap().push(path.to_string());
            if self.failing.contains(path) {
                return Err(MetadataError::Unsupported(format!("boom: {}", path)));
            }
            Ok(self.filters.get(path).cloned())
        }

        async fn read_column_ranges(
            &self,
            _path: &str,
            _columns: &[String],
        ) -> MetadataResult<Vec<ColumnRange>> {
            Ok(Vec::new())
        }
    }

    fn params() -> RecordsGenerationParams {
        RecordsGenerationParams::default()
    }

    #[tokio::test]
    async fn test_commit_emits_records_for_base_files_only() {
        let commit = CommitMetadata::from_json(
            br#"{"partitionToWriteStats": {"p1": [
                {"path": "p1/f1.parquet", "fileSizeInBytes": 10},
                {"path": "p1/.f2.log.1", "fileSizeInBytes": 5},
                {"path": "p1/f3.parquet", "fileSizeInBytes": 7, "isDelta": true}
            ]}}"#,
        )
        .unwrap();
        let reader = CannedReader::new(&[("p1/f1.parquet", b"bf1")], &[]);

        let engine = SequentialEngine;
        let records: Vec<_> =
            commit_to_bloom_filter_records(&engine, &commit, "t1", &params(), reader.clone())
                .try_collect()
                .await
                .unwrap();

        assert_eq!(records.len(), 1);
        match &records[0] {
            MetadataRecord::BloomFilterEntry {
                partition,
                file_name,
                bloom_filter,
            } => {
                assert_eq!(partition, "p1");
                assert_eq!(file_name, "f1.parquet");
                assert_eq!(bloom_filter.bloom_filter, Bytes::from_static(b"bf1"));
                assert_eq!(bloom_filter.timestamp, "t1");
                assert!(!bloom_filter.is_deleted);
            }
            other => panic!("unexpected record {:?}", other),
        }
        // The log file and the delta stat were never even opened
        assert_eq!(*reader.requested.lock().unwrap(), vec!["p1/f1.parquet"]);
    }

    #[tokio::test]
    async fn test_commit_read_failure_omits_record() {
        let commit = CommitMetadata::from_json(
            br#"{"partitionToWriteStats": {"p1": [
                {"path": "p1/f1.parquet", "fileSizeInBytes": 10},
                {"path": "p1/f2.parquet", "fileSizeInBytes": 20}
            ]}}"#,
        )
        .unwrap();
        let reader = CannedReader::new(&[("p1/f2.parquet", b"bf2")], &["p1/f1.parquet"]);

        let engine = SequentialEngine;
        let records = commit_to_bloom_filter_records(&engine, &commit, "t1", &params(), reader)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key(), "p1\u{0}f2.parquet");
    }

    #[tokio::test]
    async fn test_commit_without_stats_is_empty() {
        let commit = CommitMetadata::from_json(br#"{"partitionToWriteStats": {}}"#).unwrap();
        let reader = CannedReader::new(&[], &[]);
        let engine = SequentialEngine;
        let records = commit_to_bloom_filter_records(&engine, &commit, "t1", &params(), reader)
            .try_collect()
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_clean_emits_tombstones_for_base_files_only() {
        let clean = CleanMetadata::from_json(
            br#"{"partitionMetadata": {"p1": {
                "deletePathPatterns": ["p1/a.parquet", "p1/b.log"]}}}"#,
        )
        .unwrap();

        let engine = SequentialEngine;
        let records = clean_to_bloom_filter_records(&engine, &clean, "t2", &params())
            .try_collect()
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        match &records[0] {
            MetadataRecord::BloomFilterEntry {
                file_name,
                bloom_filter,
                ..
            } => {
                assert_eq!(file_name, "a.parquet");
                assert!(bloom_filter.is_deleted);
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rollback_view_mixes_tombstones_and_appends() {
        let deleted: BTreeMap<String, Vec<String>> = [(
            "p1".to_string(),
            vec!["f1.parquet".to_string(), ".f9.log.1".to_string()],
        )]
        .into_iter()
        .collect();
        let appended: BTreeMap<String, BTreeMap<String, i64>> = [(
            "p2".to_string(),
            [
                ("f2.parquet".to_string(), 10_i64),
                (".f3.log.1".to_string(), 4_i64),
            ]
            .into_iter()
            .collect(),
        )]
        .into_iter()
        .collect();
        let reader = CannedReader::new(&[("p2/f2.parquet", b"bf2")], &[]);

        let engine = SequentialEngine;
        let records = files_to_bloom_filter_records(
            &engine,
            &deleted,
            &appended,
            "t3",
            &params(),
            reader,
        )
        .try_collect()
        .await
        .unwrap();

        assert_eq!(records.len(), 2);
        let keys: BTreeSet<String> = records.iter().map(MetadataRecord::key).collect();
        assert!(keys.contains("p1\u{0}f1.parquet"));
        assert!(keys.contains("p2\u{0}f2.parquet"));
    }

    #[test]
    fn test_join_partition_path_non_partitioned() {
        assert_eq!(join_partition_path("", "f1.parquet"), "f1.parquet");
        assert_eq!(join_partition_path("p1", "f1.parquet"), "p1/f1.parquet");
    }
}
