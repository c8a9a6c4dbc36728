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

use crate::storage::StorageError;
use thiserror::Error;

/// Errors surfaced by the metadata indexing core.
///
/// Per-file read failures are not represented here: they are logged and the
/// affected record is omitted, leaving the rest of the action's record set
/// intact. Everything below aborts the index sync for the action.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// An action blob could not be parsed into its in-memory shape.
    #[error("Malformed {action} action: {source}")]
    MalformedAction {
        action: String,
        #[source]
        source: serde_json::Error,
    },

    /// A rollback depends on a metadata-table instant that has been
    /// archived; the index cannot be reconciled without operator help.
    #[error("The instant {instant} required to sync rollback of {rolled_back} has been archived")]
    ArchivedDependency {
        instant: String,
        rolled_back: String,
    },

    /// An internal consistency rule was broken by the incoming action.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Column statistics were requested for a file format that does not
    /// carry per-column ranges.
    #[error("Column range index not supported for file {0}")]
    UnsupportedColumnStatsFormat(String),

    /// The operation is not served by this metadata implementation.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Writer schema attached to the commit could not be parsed.
    #[error("Failed to parse writer schema: {0}")]
    Schema(#[from] apache_avro::Error),

    /// A columnar footer could not be decoded.
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for indexing operations
pub type MetadataResult<T> = Result<T, MetadataError>;

impl MetadataError {
    pub(crate) fn malformed(action: &str, source: serde_json::Error) -> Self {
        MetadataError::MalformedAction {
            action: action.to_string(),
            source,
        }
    }
}
