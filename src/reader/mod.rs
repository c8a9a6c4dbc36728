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

//! File-reading capability consumed by the bloom-filter and column-stats
//! builders. The capability is deliberately narrow: a bloom filter and
//! per-column ranges are the only things the index ever pulls out of a
//! data file.

pub mod parquet;

pub use self::parquet::ParquetFileReader;

use crate::error::MetadataResult;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Per-column range statistics for one file.
///
/// Minimum and maximum are carried as serialized strings and compared as
/// strings at the index layer, regardless of the underlying column type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ColumnRange {
    pub file_name: String,
    pub column_name: String,
    pub min_value: Option<String>,
    pub max_value: Option<String>,
    #[serde(default)]
    pub value_count: i64,
    #[serde(default)]
    pub null_count: i64,
    #[serde(default)]
    pub total_size: i64,
    #[serde(default)]
    pub total_uncompressed_size: i64,
}

impl ColumnRange {
    /// Combine two ranges for the same column (e.g. across row groups):
    /// minimum of mins, maximum of maxes, counts and sizes summed.
    pub fn merge(self, other: ColumnRange) -> ColumnRange {
        ColumnRange {
            file_name: self.file_name,
            column_name: self.column_name,
            min_value: min_option(self.min_value, other.min_value),
            max_value: max_option(self.max_value, other.max_value),
            value_count: self.value_count + other.value_count,
            null_count: self.null_count + other.null_count,
            total_size: self.total_size + other.total_size,
            total_uncompressed_size: self.total_uncompressed_size + other.total_uncompressed_size,
        }
    }
}

pub(crate) fn min_option(a: Option<String>, b: Option<String>) -> Option<String> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if a <= b { a } else { b }),
        (a, b) => a.or(b),
    }
}

pub(crate) fn max_option(a: Option<String>, b: Option<String>) -> Option<String> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if a >= b { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Capability for reading index-relevant metadata out of base files.
#[async_trait]
pub trait FileReader: Send + Sync {
    /// Read the serialized bloom filter embedded in a base file, if the
    /// file carries one.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or its footer cannot be decoded.
    /// Callers treat such failures as transient: they are logged and the
    /// file's record is omitted.
    async fn read_bloom_filter(&self, path: &str) -> MetadataResult<Option<Bytes>>;

    /// Read per-column ranges for the requested columns from the file's
    /// metadata. Columns absent from the file are omitted from the result.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or its footer cannot be decoded.
    async fn read_column_ranges(
        &self,
        path: &str,
        columns: &[String],
    ) -> MetadataResult<Vec<ColumnRange>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(min: &str, max: &str, values: i64, nulls: i64) -> ColumnRange {
        ColumnRange {
            file_name: "f1.parquet".to_string(),
            column_name: "a".to_string(),
            min_value: Some(min.to_string()),
            max_value: Some(max.to_string()),
            value_count: values,
            null_count: nulls,
            total_size: 10,
            total_uncompressed_size: 20,
        }
    }

    #[test]
    fn test_merge_combines_ranges() {
        let merged = range("b", "f", 5, 1).merge(range("a", "d", 3, 0));
        assert_eq!(merged.min_value.as_deref(), Some("a"));
        assert_eq!(merged.max_value.as_deref(), Some("f"));
        assert_eq!(merged.value_count, 8);
        assert_eq!(merged.null_count, 1);
        assert_eq!(merged.total_size, 20);
        assert_eq!(merged.total_uncompressed_size, 40);
    }

    #[test]
    fn test_merge_with_absent_bounds() {
        let mut empty = range("", "", 0, 4);
        empty.min_value = None;
        empty.max_value = None;
        let merged = empty.merge(range("c", "c", 1, 0));
        assert_eq!(merged.min_value.as_deref(), Some("c"));
        assert_eq!(merged.max_value.as_deref(), Some("c"));
        assert_eq!(merged.null_count, 4);
    }

    #[test]
    fn test_min_max_option_are_string_ordered() {
        // "10" < "9" in string order; the index compares strings
        assert_eq!(
            min_option(Some("10".to_string()), Some("9".to_string())),
            Some("10".to_string())
        );
        assert_eq!(
            max_option(Some("10".to_string()), Some("9".to_string())),
            Some("9".to_string())
        );
    }
}
