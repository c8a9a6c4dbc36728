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

use async_trait::async_trait;
use object_store::path::Path as ObjectPath;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use super::error::StorageResult;

/// One entry returned by a single-level listing: either a file object or a
/// directory (common prefix).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntry {
    /// Path relative to the provider base
    pub path: String,

    /// File size in bytes; zero for directories
    pub size: u64,

    /// Whether the entry is a directory / common prefix
    pub is_dir: bool,

    /// Last modified timestamp, when the backend reports one
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
}

impl StorageEntry {
    /// The final path component.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Generic trait for storage backends the index core reads through
///
/// This is the `FileSystem` capability of the indexing subsystem: the
/// fallback partition lister walks directories through it, action blobs and
/// columnar footers are read through it, and index deletion goes through it.
/// One implementation backed by `object_store` covers local filesystems and
/// the cloud providers.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// The base path/prefix for this storage provider.
    fn base_path(&self) -> &str;

    /// List a single directory level: file objects and child directories.
    ///
    /// # Errors
    ///
    /// Fails if the path is not accessible or the backend listing fails.
    async fn list_entries(&self, path: &str) -> StorageResult<Vec<StorageEntry>>;

    /// List all files below the given path, recursively. Directories are
    /// not reported.
    ///
    /// # Errors
    ///
    /// Fails if the path is not accessible or the backend listing fails.
    async fn list_files(&self, path: &str) -> StorageResult<Vec<StorageEntry>>;

    /// Read the contents of a file.
    ///
    /// # Errors
    ///
    /// Fails if the file does not exist or cannot be read.
    async fn read_file(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Check whether a file exists. NotFound is an answer (`Ok(false)`),
    /// not an error.
    async fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Delete a path. With `recursive`, removes every object below it.
    ///
    /// # Errors
    ///
    /// Fails if any object cannot be removed.
    async fn delete(&self, path: &str, recursive: bool) -> StorageResult<()>;

    /// A full provider-specific URI for a path (e.g. "s3://bucket/path").
    fn uri_from_path(&self, path: &str) -> String;
}

impl Debug for dyn StorageProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "StorageProvider(base_path={})", self.base_path())
    }
}

/// Helper function to create an ObjectPath from a string
pub(crate) fn string_to_path(s: &str) -> ObjectPath {
    ObjectPath::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_name_returns_last_component() {
        let entry = StorageEntry {
            path: "2021/01/02/f1.parquet".to_string(),
            size: 128,
            is_dir: false,
            last_modified: None,
        };
        assert_eq!(entry.name(), "f1.parquet");
    }

    #[test]
    fn test_entry_name_without_separator() {
        let entry = StorageEntry {
            path: "f1.parquet".to_string(),
            size: 0,
            is_dir: false,
            last_modified: None,
        };
        assert_eq!(entry.name(), "f1.parquet");
    }

    #[test]
    fn test_string_to_path() {
        let object_path = string_to_path("a/b/c/file.parquet");
        assert_eq!(object_path.as_ref(), "a/b/c/file.parquet");
    }
}
