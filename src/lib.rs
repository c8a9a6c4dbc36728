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

//! # Lake Index
//!
//! A Rust library deriving the metadata-table indices of a transactional
//! data-lake table from its action timeline.
//!
//! Given the actions committed against a table — commits, cleans,
//! rollbacks, restores — Lake Index produces the records of three derived
//! indices: the per-partition file listings (FILES), per-file bloom
//! filters (BLOOM_FILTERS), and per-file per-column statistics
//! (COLUMN_STATS). Records are keyed so that replaying an action upserts
//! idempotently, and rollbacks of instants the index never saw are
//! reconciled safely.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lake_index::action::CommitMetadata;
//! use lake_index::index::{MetadataPartitionType, TimelineIndexer};
//! use lake_index::storage::StorageConfig;
//!
//! # async fn example() -> Result<(), lake_index::error::MetadataError> {
//! // Storage rooted at the table base path
//! let storage = StorageConfig::at("/tables/trips");
//!
//! let indexer = TimelineIndexer::builder(storage).build().await?;
//!
//! // Convert one commit action into metadata records
//! let blob = std::fs::read("/tables/trips/.lake/t42.commit").unwrap();
//! let commit = CommitMetadata::from_json(&blob)?;
//! let mut records = indexer.commit_to_records(&commit, "t42").await?;
//!
//! // Collect the FILES partition records for upsert
//! let files = records
//!     .remove(&MetadataPartitionType::Files)
//!     .unwrap()
//!     .try_collect()
//!     .await?;
//! println!("{} records", files.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`action`] - Action reader: commit / clean / rollback / restore shapes
//! - [`index`] - Record model, builders, router, and the indexing driver
//! - [`engine`] - Parallel and sequential execution engines
//! - [`metadata`] - Table-metadata capability and the filesystem fallback
//! - [`reader`] - File-reading capability (bloom filters, column ranges)
//! - [`storage`] - Cloud storage abstraction layer
//! - [`table`] - Table configuration and reserved layout names
//! - [`timeline`] - Instants and the timeline capability

pub mod action;
pub mod engine;
pub mod error;
pub mod index;
pub mod metadata;
pub mod reader;
pub mod storage;
pub mod table;
pub mod timeline;
pub mod util;

// Re-export commonly used types
pub use engine::{EngineContext, ParallelEngine, SequentialEngine};
pub use error::{MetadataError, MetadataResult};
pub use index::{MetadataPartitionType, MetadataRecord, TimelineIndexer};
pub use storage::StorageConfig;
