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

//! Table-metadata capability and its filesystem-backed fallback.
//!
//! When the indexed view is unavailable (bootstrap, index disabled), the
//! fallback enumerates partitions by walking the base path breadth-first,
//! listing each frontier in parallel. Index-only queries (bloom filters,
//! column stats, synced instant) are unsupported on this path.

use crate::engine::EngineContext;
use crate::error::{MetadataError, MetadataResult};
use crate::index::record::ColumnStatsMetadata;
use crate::storage::{StorageEntry, StorageProvider};
use crate::table::{METAFOLDER_NAME, PARTITION_METAFILE};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Fan-out cap for one listing round.
const DEFAULT_LISTING_PARALLELISM: usize = 1500;

/// Read-side view of a table's file layout, served either by the metadata
/// table or by listing the filesystem.
#[async_trait]
pub trait TableMetadata: Send + Sync {
    /// All partition paths of the table, relative to the base path. The
    /// empty string denotes a non-partitioned table.
    async fn all_partition_paths(&self) -> MetadataResult<Vec<String>>;

    /// Data files of one partition.
    async fn all_files_in_partition(
        &self,
        partition_path: &str,
    ) -> MetadataResult<Vec<StorageEntry>>;

    /// Data files of several partitions, listed in parallel.
    async fn all_files_in_partitions(
        &self,
        partition_paths: &[String],
    ) -> MetadataResult<BTreeMap<String, Vec<StorageEntry>>>;

    /// Bloom filter of one file, where the implementation serves it.
    async fn bloom_filter(&self, partition: &str, file_name: &str) -> MetadataResult<Bytes>;

    /// Column statistics of one (file, column), where the implementation
    /// serves them.
    async fn column_stats(
        &self,
        partition: &str,
        file_name: &str,
        column_name: &str,
    ) -> MetadataResult<ColumnStatsMetadata>;

    /// The last table instant synced into this view, where tracked.
    fn synced_instant_time(&self) -> MetadataResult<Option<String>>;
}

/// [`TableMetadata`] served by walking the filesystem.
pub struct FsBackedTableMetadata<E: EngineContext> {
    engine: E,
    storage: Arc<dyn StorageProvider>,
    assume_date_partitioning: bool,
    listing_parallelism: usize,
}

impl<E: EngineContext> FsBackedTableMetadata<E> {
    /// `assume_date_partitioning` short-circuits partition discovery to
    /// exactly three directory levels; callers opt in explicitly for
    /// tables laid out as `yyyy/mm/dd`.
    pub fn new(engine: E, storage: Arc<dyn StorageProvider>, assume_date_partitioning: bool) -> Self {
        Self {
            engine,
            storage,
            assume_date_partitioning,
            listing_parallelism: DEFAULT_LISTING_PARALLELISM,
        }
    }

    pub fn with_listing_parallelism(mut self, listing_parallelism: usize) -> Self {
        self.listing_parallelism = listing_parallelism.max(1);
        self
    }

    /// One BFS round: list every directory of the frontier in parallel,
    /// recording partitions and enqueueing unexplored directories.
    async fn expand_frontier(
        &self,
        frontier: Vec<String>,
        paths_to_list: &Arc<Mutex<Vec<String>>>,
        partition_paths: &Arc<Mutex<Vec<String>>>,
    ) -> MetadataResult<()> {
        let listing_parallelism = self.listing_parallelism.min(frontier.len()).max(1);
        let storage = Arc::clone(&self.storage);
        let paths_to_list = Arc::clone(paths_to_list);
        let partition_paths = Arc::clone(partition_paths);

        self.engine
            .parallelize(frontier, listing_parallelism)
            .map_async(move |dir| {
                let storage = Arc::clone(&storage);
                let paths_to_list = Arc::clone(&paths_to_list);
                let partition_paths = Arc::clone(&partition_paths);
                async move {
                    let entries = storage.list_entries(&dir).await?;
                    for entry in entries {
                        if entry.is_dir {
                            let marker = format!("{}/{}", entry.path, PARTITION_METAFILE);
                            if storage.exists(&marker).await? {
                                partition_paths.lock().unwrap().push(entry.path);
                            } else if entry.name() != METAFOLDER_NAME {
                                paths_to_list.lock().unwrap().push(entry.path);
                            }
                        } else if entry.name() == PARTITION_METAFILE {
                            partition_paths.lock().unwrap().push(parent_dir(&entry.path));
                        }
                    }
                    Ok::<(), MetadataError>(())
                }
            })
            .try_collect()
            .await?;
        Ok(())
    }

    /// Partition discovery for date-partitioned tables: every directory
    /// exactly three levels below the base path is a partition.
    async fn partitions_three_levels_down(&self) -> MetadataResult<Vec<String>> {
        let mut frontier = vec![String::new()];
        for _ in 0..3 {
            let listing_parallelism = self.listing_parallelism.min(frontier.len()).max(1);
            let storage = Arc::clone(&self.storage);
            let level: Vec<Vec<String>> = self
                .engine
                .parallelize(frontier, listing_parallelism)
                .map_async(move |dir| {
                    let storage = Arc::clone(&storage);
                    async move {
                        let entries = storage.list_entries(&dir).await?;
                        Ok::<Vec<String>, MetadataError>(
                            entries
                                .into_iter()
                                .filter(|e| e.is_dir && e.name() != METAFOLDER_NAME)
                                .map(|e| e.path)
                                .collect(),
                        )
                    }
                })
                .try_collect()
                .await?;
            frontier = level.into_iter().flatten().collect();
            if frontier.is_empty() {
                break;
            }
        }
        Ok(frontier)
    }
}

#[async_trait]
impl<E: EngineContext> TableMetadata for FsBackedTableMetadata<E> {
    async fn all_partition_paths(&self) -> MetadataResult<Vec<String>> {
        if self.assume_date_partitioning {
            return self.partitions_three_levels_down().await;
        }

        let paths_to_list = Arc::new(Mutex::new(vec![String::new()]));
        let partition_paths = Arc::new(Mutex::new(Vec::new()));

        loop {
            let frontier: Vec<String> = {
                let mut worklist = paths_to_list.lock().unwrap();
                std::mem::take(&mut *worklist)
            };
            if frontier.is_empty() {
                break;
            }
            self.expand_frontier(frontier, &paths_to_list, &partition_paths)
                .await?;
        }

        let mut partitions = {
            let mut collected = partition_paths.lock().unwrap();
            std::mem::take(&mut *collected)
        };
        partitions.sort();
        partitions.dedup();
        Ok(partitions)
    }

    async fn all_files_in_partition(
        &self,
        partition_path: &str,
    ) -> MetadataResult<Vec<StorageEntry>> {
        let entries = self.storage.list_entries(partition_path).await?;
        Ok(entries
            .into_iter()
            .filter(|entry| !entry.is_dir && entry.name() != PARTITION_METAFILE)
            .collect())
    }

    async fn all_files_in_partitions(
        &self,
        partition_paths: &[String],
    ) -> MetadataResult<BTreeMap<String, Vec<StorageEntry>>> {
        if partition_paths.is_empty() {
            return Ok(BTreeMap::new());
        }

        let listing_parallelism = self.listing_parallelism.min(partition_paths.len()).max(1);
        let storage = Arc::clone(&self.storage);

        let listed: Vec<(String, Vec<StorageEntry>)> = self
            .engine
            .parallelize(partition_paths.to_vec(), listing_parallelism)
            .map_async(move |partition_path| {
                let storage = Arc::clone(&storage);
                async move {
                    let entries = storage.list_entries(&partition_path).await?;
                    let files = entries
                        .into_iter()
                        .filter(|entry| !entry.is_dir && entry.name() != PARTITION_METAFILE)
                        .collect();
                    Ok::<(String, Vec<StorageEntry>), MetadataError>((partition_path, files))
                }
            })
            .try_collect()
            .await?;

        Ok(listed.into_iter().collect())
    }

    async fn bloom_filter(&self, _partition: &str, file_name: &str) -> MetadataResult<Bytes> {
        Err(MetadataError::Unsupported(format!(
            "bloom filter lookup for {}",
            file_name
        )))
    }

    async fn column_stats(
        &self,
        _partition: &str,
        file_name: &str,
        column_name: &str,
    ) -> MetadataResult<ColumnStatsMetadata> {
        Err(MetadataError::Unsupported(format!(
            "column stats lookup for {}/{}",
            file_name, column_name
        )))
    }

    fn synced_instant_time(&self) -> MetadataResult<Option<String>> {
        Err(MetadataError::Unsupported(
            "synced instant time is not tracked by the filesystem view".to_string(),
        ))
    }
}

/// Parent directory of a relative path; the empty string at the root.
fn parent_dir(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => path[..idx].to_string(),
        None => String::new(),
    }
}
