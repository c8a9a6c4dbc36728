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

//! The metadata indexing core: converts timeline actions into record sets
//! for the enabled metadata-table partitions.
//!
//! [`TimelineIndexer`] is the driver. For each action it runs the files
//! builder eagerly (pure bookkeeping), fans the bloom-filter and
//! column-stats builders out over the engine, and hands back one lazy
//! record collection per enabled [`MetadataPartitionType`], ready for an
//! upsert into the metadata table.

pub mod bloom;
pub mod column_stats;
pub mod files;
pub mod record;
pub mod rollback;
pub mod router;

pub use record::{
    BloomFilterMetadata, ColumnStatsMetadata, FileInfo, MetadataPartitionType, MetadataPayload,
    MetadataRecord,
};
pub use rollback::RollbackChanges;
pub use router::{
    group_by_file_group, map_record_key_to_file_group_index, partition_file_group_count,
};

use crate::action::{CleanMetadata, CommitMetadata, RestoreMetadata, RollbackMetadata};
use crate::engine::{EngineContext, EngineData, ParallelEngine};
use crate::error::MetadataResult;
use crate::reader::{FileReader, ParquetFileReader};
use crate::storage::{StorageConfig, StorageProvider};
use crate::table::{TableConfig, METAFOLDER_NAME};
use crate::timeline::Timeline;
use apache_avro::Schema;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Result of producing one record: per-file failures that must abort the
/// sync travel through the collection.
pub type RecordResult = MetadataResult<MetadataRecord>;

/// Lazy collection of record results, one per enabled partition type.
pub type RecordData = EngineData<RecordResult>;

/// Bounded stage parallelism: never more tasks than inputs, never zero.
pub(crate) fn stage_parallelism(inputs: usize, configured: usize) -> usize {
    inputs.min(configured).max(1)
}

/// Tunables for record generation.
#[derive(Debug, Clone)]
pub struct RecordsGenerationParams {
    /// Metadata-table partitions records are generated for. The files
    /// partition is always enabled.
    pub enabled_partition_types: Vec<MetadataPartitionType>,
    /// Filter implementation code stamped on bloom-filter records.
    pub bloom_filter_type: String,
    pub bloom_index_parallelism: usize,
    pub column_stats_index_parallelism: usize,
    /// Index every top-level column rather than just the record keys.
    pub all_column_stats_enabled: bool,
    pub bloom_filter_file_group_count: usize,
    pub column_stats_file_group_count: usize,
}

impl Default for RecordsGenerationParams {
    fn default() -> Self {
        Self {
            enabled_partition_types: vec![MetadataPartitionType::Files],
            bloom_filter_type: "dynamic".to_string(),
            bloom_index_parallelism: 200,
            column_stats_index_parallelism: 10,
            all_column_stats_enabled: false,
            bloom_filter_file_group_count: 4,
            column_stats_file_group_count: 2,
        }
    }
}

impl RecordsGenerationParams {
    fn is_enabled(&self, partition_type: MetadataPartitionType) -> bool {
        partition_type == MetadataPartitionType::Files
            || self.enabled_partition_types.contains(&partition_type)
    }
}

/// Capability resolving the latest table schema from the timeline, used
/// when a commit carries no writer schema of its own.
#[async_trait]
pub trait SchemaResolver: Send + Sync {
    /// The latest table schema, or `None` for a table with no completed
    /// commits.
    async fn table_schema(&self) -> MetadataResult<Option<Schema>>;
}

/// Resolver for contexts where no timeline schema lookup is available.
pub struct NoSchemaResolver;

#[async_trait]
impl SchemaResolver for NoSchemaResolver {
    async fn table_schema(&self) -> MetadataResult<Option<Schema>> {
        Ok(None)
    }
}

/// Builder for [`TimelineIndexer`].
pub struct TimelineIndexerBuilder<E: EngineContext> {
    storage_config: StorageConfig,
    engine: E,
    table_config: TableConfig,
    params: RecordsGenerationParams,
    schema_resolver: Option<Arc<dyn SchemaResolver>>,
    file_reader: Option<Arc<dyn FileReader>>,
}

impl<E: EngineContext> TimelineIndexerBuilder<E> {
    /// Swap the engine (e.g. for a sequential engine in tests).
    pub fn with_engine<E2: EngineContext>(self, engine: E2) -> TimelineIndexerBuilder<E2> {
        TimelineIndexerBuilder {
            storage_config: self.storage_config,
            engine,
            table_config: self.table_config,
            params: self.params,
            schema_resolver: self.schema_resolver,
            file_reader: self.file_reader,
        }
    }

    pub fn with_table_config(mut self, table_config: TableConfig) -> Self {
        self.table_config = table_config;
        self
    }

    pub fn with_params(mut self, params: RecordsGenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_schema_resolver(mut self, resolver: Arc<dyn SchemaResolver>) -> Self {
        self.schema_resolver = Some(resolver);
        self
    }

    /// Override the file reader; defaults to parquet footers over the
    /// configured storage.
    pub fn with_file_reader(mut self, file_reader: Arc<dyn FileReader>) -> Self {
        self.file_reader = Some(file_reader);
        self
    }

    /// Build the indexer, initializing storage.
    ///
    /// # Errors
    ///
    /// Fails when the storage provider cannot be created.
    pub async fn build(self) -> MetadataResult<TimelineIndexer<E>> {
        let storage = self.storage_config.connect()?;
        let file_reader = self
            .file_reader
            .unwrap_or_else(|| Arc::new(ParquetFileReader::new(Arc::clone(&storage))));
        Ok(TimelineIndexer {
            engine: self.engine,
            storage,
            file_reader,
            schema_resolver: self
                .schema_resolver
                .unwrap_or_else(|| Arc::new(NoSchemaResolver)),
            table_config: self.table_config,
            params: self.params,
        })
    }
}

/// Driver converting timeline actions to metadata-table records.
pub struct TimelineIndexer<E: EngineContext> {
    engine: E,
    storage: Arc<dyn StorageProvider>,
    file_reader: Arc<dyn FileReader>,
    schema_resolver: Arc<dyn SchemaResolver>,
    table_config: TableConfig,
    params: RecordsGenerationParams,
}

impl TimelineIndexer<ParallelEngine> {
    /// Start building an indexer over the given storage, with the
    /// parallel engine.
    pub fn builder(storage_config: StorageConfig) -> TimelineIndexerBuilder<ParallelEngine> {
        TimelineIndexerBuilder {
            storage_config,
            engine: ParallelEngine,
            table_config: TableConfig::default(),
            params: RecordsGenerationParams::default(),
            schema_resolver: None,
            file_reader: None,
        }
    }
}

impl<E: EngineContext> TimelineIndexer<E> {
    pub fn params(&self) -> &RecordsGenerationParams {
        &self.params
    }

    pub fn table_config(&self) -> &TableConfig {
        &self.table_config
    }

    /// Records for one commit action, per enabled partition type.
    ///
    /// # Errors
    ///
    /// Fails when an attached writer schema cannot be parsed. Per-file
    /// failures surface later, when the returned collections are
    /// collected.
    pub async fn commit_to_records(
        &self,
        commit: &CommitMetadata,
        instant_time: &str,
    ) -> MetadataResult<BTreeMap<MetadataPartitionType, RecordData>> {
        let mut partition_to_records = BTreeMap::new();

        let files_records = files::commit_to_files_partition_records(commit, instant_time);
        partition_to_records.insert(
            MetadataPartitionType::Files,
            self.lift_records(files_records),
        );

        if self.params.is_enabled(MetadataPartitionType::BloomFilters) {
            partition_to_records.insert(
                MetadataPartitionType::BloomFilters,
                bloom::commit_to_bloom_filter_records(
                    &self.engine,
                    commit,
                    instant_time,
                    &self.params,
                    Arc::clone(&self.file_reader),
                ),
            );
        }

        if self.params.is_enabled(MetadataPartitionType::ColumnStats) {
            let columns = self.resolve_columns(Some(commit)).await?;
            partition_to_records.insert(
                MetadataPartitionType::ColumnStats,
                column_stats::commit_to_column_stats_records(
                    &self.engine,
                    commit,
                    &self.params,
                    columns,
                    Arc::clone(&self.file_reader),
                ),
            );
        }

        Ok(partition_to_records)
    }

    /// Records for one clean action, per enabled partition type.
    ///
    /// # Errors
    ///
    /// Fails when the schema resolver fails while selecting columns.
    pub async fn clean_to_records(
        &self,
        clean: &CleanMetadata,
        instant_time: &str,
    ) -> MetadataResult<BTreeMap<MetadataPartitionType, RecordData>> {
        let mut partition_to_records = BTreeMap::new();

        let files_records = files::clean_to_files_partition_records(clean, instant_time);
        partition_to_records.insert(
            MetadataPartitionType::Files,
            self.lift_records(files_records),
        );

        if self.params.is_enabled(MetadataPartitionType::BloomFilters) {
            partition_to_records.insert(
                MetadataPartitionType::BloomFilters,
                bloom::clean_to_bloom_filter_records(
                    &self.engine,
                    clean,
                    instant_time,
                    &self.params,
                ),
            );
        }

        if self.params.is_enabled(MetadataPartitionType::ColumnStats) {
            let columns = self.resolve_columns(None).await?;
            partition_to_records.insert(
                MetadataPartitionType::ColumnStats,
                column_stats::clean_to_column_stats_records(
                    &self.engine,
                    clean,
                    &self.params,
                    columns,
                ),
            );
        }

        Ok(partition_to_records)
    }

    /// Records for one rollback action. `was_synced` tells whether the
    /// rolled-back instant had reached the metadata table: if it had not,
    /// nothing was recorded for its files and only rollback log appends
    /// are kept.
    ///
    /// # Errors
    ///
    /// [`crate::error::MetadataError::ArchivedDependency`] when the
    /// rollback depends on an archived metadata-table instant, and
    /// [`crate::error::MetadataError::InvariantViolation`] when a file is
    /// both appended and deleted.
    pub async fn rollback_to_records(
        &self,
        metadata_timeline: &dyn Timeline,
        rollback_metadata: &RollbackMetadata,
        instant_time: &str,
        last_sync_ts: Option<&str>,
        was_synced: bool,
    ) -> MetadataResult<BTreeMap<MetadataPartitionType, RecordData>> {
        let mut changes = RollbackChanges::default();
        rollback::process_rollback_metadata(
            metadata_timeline,
            rollback_metadata,
            &mut changes,
            last_sync_ts,
        )?;
        if !was_synced {
            // The instant being rolled back never reached the metadata
            // table, so its file additions were never recorded; only the
            // rollback's own log appends matter.
            changes.clear_deleted_files();
        }
        self.changes_to_records(&changes, instant_time, "Rollback")
            .await
    }

    /// Records for one restore action: every inner rollback folded into a
    /// single normalized view.
    ///
    /// # Errors
    ///
    /// Same fatal conditions as [`Self::rollback_to_records`].
    pub async fn restore_to_records(
        &self,
        metadata_timeline: &dyn Timeline,
        restore_metadata: &RestoreMetadata,
        instant_time: &str,
        last_sync_ts: Option<&str>,
    ) -> MetadataResult<BTreeMap<MetadataPartitionType, RecordData>> {
        let mut changes = RollbackChanges::default();
        rollback::process_restore_metadata(
            metadata_timeline,
            restore_metadata,
            &mut changes,
            last_sync_ts,
        )?;
        self.changes_to_records(&changes, instant_time, "Restore")
            .await
    }

    /// Remove the metadata table entirely. Used by upgrade/downgrade
    /// flows while no other writer is active.
    ///
    /// # Errors
    ///
    /// Fails when any object under the metadata table path cannot be
    /// deleted.
    pub async fn delete_metadata_table(&self) -> MetadataResult<()> {
        let metadata_table_path = format!("{}/metadata", METAFOLDER_NAME);
        info!(
            "Removing metadata table from {}",
            self.storage.uri_from_path(&metadata_table_path)
        );
        self.storage.delete(&metadata_table_path, true).await?;
        Ok(())
    }

    async fn changes_to_records(
        &self,
        changes: &RollbackChanges,
        instant_time: &str,
        operation: &str,
    ) -> MetadataResult<BTreeMap<MetadataPartitionType, RecordData>> {
        let mut partition_to_records = BTreeMap::new();

        let files_records = files::files_to_files_partition_records(
            &changes.partition_to_deleted_files,
            &changes.partition_to_appended_files,
            instant_time,
            operation,
        )?;
        partition_to_records.insert(
            MetadataPartitionType::Files,
            self.lift_records(files_records),
        );

        if self.params.is_enabled(MetadataPartitionType::BloomFilters) {
            partition_to_records.insert(
                MetadataPartitionType::BloomFilters,
                bloom::files_to_bloom_filter_records(
                    &self.engine,
                    &changes.partition_to_deleted_files,
                    &changes.partition_to_appended_files,
                    instant_time,
                    &self.params,
                    Arc::clone(&self.file_reader),
                ),
            );
        }

        if self.params.is_enabled(MetadataPartitionType::ColumnStats) {
            let columns = self.resolve_columns(None).await?;
            partition_to_records.insert(
                MetadataPartitionType::ColumnStats,
                column_stats::files_to_column_stats_records(
                    &self.engine,
                    &changes.partition_to_deleted_files,
                    &changes.partition_to_appended_files,
                    &self.params,
                    columns,
                    Arc::clone(&self.file_reader),
                ),
            );
        }

        Ok(partition_to_records)
    }

    /// Columns for the stats index, preferring the commit's writer schema
    /// over the timeline resolver.
    async fn resolve_columns(
        &self,
        commit: Option<&CommitMetadata>,
    ) -> MetadataResult<Vec<String>> {
        if !self.params.all_column_stats_enabled {
            return Ok(self.table_config.record_key_fields.clone());
        }

        let schema = match commit.and_then(CommitMetadata::writer_schema) {
            Some(schema_str) => Some(Schema::parse_str(schema_str)?),
            None => self.schema_resolver.table_schema().await?,
        };
        let fields = schema.map(|schema| {
            column_stats::schema_field_names(&schema, self.table_config.populate_meta_fields)
        });
        Ok(column_stats::columns_to_index(
            &self.params,
            &self.table_config,
            fields,
        ))
    }

    fn lift_records(&self, records: Vec<MetadataRecord>) -> RecordData {
        self.engine
            .parallelize(records.into_iter().map(Ok).collect(), 1)
    }
}
