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

use super::{ColumnRange, FileReader};
use crate::error::MetadataResult;
use crate::storage::StorageProvider;
use crate::util::path::file_name;
use async_trait::async_trait;
use bytes::Bytes;
use parquet::file::reader::{FileReader as _, SerializedFileReader};
use parquet::file::statistics::Statistics;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Footer key under which writers serialize the bloom filter of a base
/// file.
pub const BLOOM_FILTER_FOOTER_KEY: &str = "lake.bloomfilter";

/// [`FileReader`] implementation over parquet footers.
///
/// Paths are resolved relative to the storage provider, which is expected
/// to be rooted at the table base path. Only footer metadata is decoded;
/// row data is never materialized.
pub struct ParquetFileReader {
    storage: Arc<dyn StorageProvider>,
}

impl ParquetFileReader {
    pub fn new(storage: Arc<dyn StorageProvider>) -> Self {
        Self { storage }
    }

    async fn open(&self, path: &str) -> MetadataResult<SerializedFileReader<Bytes>> {
        let bytes = self.storage.read_file(path).await?;
        Ok(SerializedFileReader::new(Bytes::from(bytes))?)
    }
}

#[async_trait]
impl FileReader for ParquetFileReader {
    async fn read_bloom_filter(&self, path: &str) -> MetadataResult<Option<Bytes>> {
        let reader = self.open(path).await?;
        let filter = reader
            .metadata()
            .file_metadata()
            .key_value_metadata()
            .and_then(|kvs| kvs.iter().find(|kv| kv.key == BLOOM_FILTER_FOOTER_KEY))
            .and_then(|kv| kv.value.as_ref())
            .map(|serialized| Bytes::copy_from_slice(serialized.as_bytes()));
        Ok(filter)
    }

    async fn read_column_ranges(
        &self,
        path: &str,
        columns: &[String],
    ) -> MetadataResult<Vec<ColumnRange>> {
        let reader = self.open(path).await?;
        let metadata = reader.metadata();
        let name = file_name(path).to_string();

        // Accumulate chunk-level statistics per column across row groups
        let mut ranges: BTreeMap<String, ColumnRange> = BTreeMap::new();
        for row_group in metadata.row_groups() {
            for column_chunk in row_group.columns() {
                let column = column_chunk.column_path().string();
                if !columns.contains(&column) {
                    continue;
                }

                let (min_value, max_value, null_count) = match column_chunk.statistics() {
                    Some(stats) => {
                        let (min, max) = min_max_strings(stats);
                        (min, max, stats.null_count_opt().unwrap_or(0) as i64)
                    }
                    None => (None, None, 0),
                };

                let chunk_range = ColumnRange {
                    file_name: name.clone(),
                    column_name: column.clone(),
                    min_value,
                    max_value,
                    value_count: column_chunk.num_values(),
                    null_count,
                    total_size: column_chunk.compressed_size(),
                    total_uncompressed_size: column_chunk.uncompressed_size(),
                };

                ranges
                    .entry(column)
                    .and_modify(|existing| {
                        *existing = existing.clone().merge(chunk_range.clone());
                    })
                    .or_insert(chunk_range);
            }
        }

        Ok(ranges.into_values().collect())
    }
}

/// Chunk statistics as serialized strings. Int96 carries no usable
/// ordering and yields no bounds.
fn min_max_strings(stats: &Statistics) -> (Option<String>, Option<String>) {
    match stats {
        Statistics::Boolean(s) => (
            s.min_opt().map(|v| v.to_string()),
            s.max_opt().map(|v| v.to_string()),
        ),
        Statistics::Int32(s) => (
            s.min_opt().map(|v| v.to_string()),
            s.max_opt().map(|v| v.to_string()),
        ),
        Statistics::Int64(s) => (
            s.min_opt().map(|v| v.to_string()),
            s.max_opt().map(|v| v.to_string()),
        ),
        Statistics::Int96(_) => (None, None),
        Statistics::Float(s) => (
            s.min_opt().map(|v| v.to_string()),
            s.max_opt().map(|v| v.to_string()),
        ),
        Statistics::Double(s) => (
            s.min_opt().map(|v| v.to_string()),
            s.max_opt().map(|v| v.to_string()),
        ),
        Statistics::ByteArray(s) => (
            s.min_opt()
                .and_then(|v| v.as_utf8().ok())
                .map(str::to_string),
            s.max_opt()
                .and_then(|v| v.as_utf8().ok())
                .map(str::to_string),
        ),
        Statistics::FixedLenByteArray(s) => (
            s.min_opt()
                .and_then(|v| v.as_utf8().ok())
                .map(str::to_string),
            s.max_opt()
                .and_then(|v| v.as_utf8().ok())
                .map(str::to_string),
        ),
    }
}
