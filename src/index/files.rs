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

//! Files index builder: derives the partition list and per-partition file
//! listing records from commits, cleans and normalized rollback/restore
//! views.

use crate::action::{CleanMetadata, CommitMetadata};
use crate::error::{MetadataError, MetadataResult};
use crate::index::record::MetadataRecord;
use crate::table::partition_name;
use crate::util::path::{file_name, strip_partition_prefix};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Files-partition records for one commit: one partition-list record plus
/// one record per touched partition carrying the `filename → size` map.
///
/// A file reported several times keeps its maximum size — write stats
/// arrive in no particular order and sizes only grow within a commit.
pub fn commit_to_files_partition_records(
    commit: &CommitMetadata,
    instant_time: &str,
) -> Vec<MetadataRecord> {
    let mut records = Vec::with_capacity(commit.partition_to_write_stats.len() + 1);

    records.push(MetadataRecord::partition_list(
        commit.partition_to_write_stats.keys().cloned().collect(),
    ));

    for (partition_stat_name, write_stats) in &commit.partition_to_write_stats {
        let partition = partition_name(partition_stat_name);

        let mut updated_files_to_sizes: BTreeMap<String, i64> = BTreeMap::new();
        for stat in write_stats {
            let Some(path_with_partition) = stat.path.as_deref() else {
                warn!(
                    "Unable to find path in write stat to update metadata table, partition={}",
                    partition
                );
                continue;
            };
            let filename = strip_partition_prefix(partition, path_with_partition);
            updated_files_to_sizes
                .entry(filename.to_string())
                .and_modify(|size| *size = (*size).max(stat.file_size_in_bytes))
                .or_insert(stat.file_size_in_bytes);
        }

        records.push(MetadataRecord::partition_files(
            partition,
            Some(updated_files_to_sizes),
            None,
        ));
    }

    info!(
        "Updating at {} from Commit/{}. #partitions_updated={}",
        instant_time,
        commit.operation_type.as_deref().unwrap_or("UNKNOWN"),
        records.len()
    );

    records
}

/// Files-partition records for one clean: a deletion list per partition.
pub fn clean_to_files_partition_records(
    clean: &CleanMetadata,
    instant_time: &str,
) -> Vec<MetadataRecord> {
    let mut records = Vec::with_capacity(clean.partition_metadata.len());
    let mut file_delete_count = 0usize;

    for (partition_stat_name, partition_metadata) in &clean.partition_metadata {
        let partition = partition_name(partition_stat_name);
        let deleted_files: Vec<String> = partition_metadata
            .delete_path_patterns
            .iter()
            .map(|path| file_name(path).to_string())
            .collect();
        file_delete_count += deleted_files.len();

        records.push(MetadataRecord::partition_files(
            partition,
            None,
            Some(deleted_files),
        ));
    }

    info!(
        "Updating at {} from Clean. #partitions_updated={}, #files_deleted={}",
        instant_time,
        records.len(),
        file_delete_count
    );

    records
}

/// Files-partition records from the normalized deleted/appended maps of a
/// rollback or restore. Partitions appearing in both maps get one merged
/// record; a filename present on both sides of one partition is a fatal
/// invariant breach.
pub fn files_to_files_partition_records(
    partition_to_deleted_files: &BTreeMap<String, Vec<String>>,
    partition_to_appended_files: &BTreeMap<String, BTreeMap<String, i64>>,
    instant_time: &str,
    operation: &str,
) -> MetadataResult<Vec<MetadataRecord>> {
    let partitions: BTreeSet<&String> = partition_to_deleted_files
        .keys()
        .chain(partition_to_appended_files.keys())
        .collect();

    let mut records = Vec::with_capacity(partitions.len());
    let mut deletes = 0usize;
    let mut appends = 0usize;

    for partition_stat_name in partitions {
        let deleted = partition_to_deleted_files.get(partition_stat_name);
        let appended = partition_to_appended_files.get(partition_stat_name);

        if let (Some(deleted), Some(appended)) = (deleted, appended) {
            if let Some(conflict) = deleted.iter().find(|name| appended.contains_key(*name)) {
                return Err(MetadataError::InvariantViolation(format!(
                    "Rollback file cannot both be appended and deleted: {}/{}",
                    partition_stat_name, conflict
                )));
            }
        }

        deletes += deleted.map_or(0, Vec::len);
        appends += appended.map_or(0, BTreeMap::len);

        records.push(MetadataRecord::partition_files(
            partition_name(partition_stat_name),
            appended.cloned(),
            deleted.cloned(),
        ));
    }

    info!(
        "Found at {} from {}. #partitions_updated={}, #files_deleted={}, #files_appended={}",
        instant_time,
        operation,
        records.len(),
        deletes,
        appends
    );

    Ok(records)
}
