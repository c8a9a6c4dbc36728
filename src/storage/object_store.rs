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

use super::config::StorageConfig;
use super::error::{StorageError, StorageResult};
use super::provider::{string_to_path, StorageEntry, StorageProvider};
use crate::util::retry::retry_with_max_retries;
use async_trait::async_trait;
use futures::stream::StreamExt;
use object_store::local::LocalFileSystem;
use object_store::prefix::PrefixStore;
use object_store::{parse_url_opts, ObjectStore};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use url::Url;

/// Whether a storage failure is worth retrying. Connection-level failures
/// are; NotFound and configuration failures are not.
fn is_retryable(error: &StorageError) -> bool {
    match error {
        StorageError::ConnectionError(_) => true,
        StorageError::IoError(e) => matches!(
            e.kind(),
            std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::Interrupted
                | std::io::ErrorKind::TimedOut
        ),
        StorageError::ObjectStoreError(object_store::Error::Generic { .. }) => true,
        _ => false,
    }
}

/// Storage provider over any `object_store` backend, rooted at the table
/// base path.
///
/// Construction has exactly two shapes: a location with a URL scheme is
/// handed to `object_store`'s URL parser (which picks the backend and
/// consumes the forwarded options), and everything else is treated as a
/// local directory. Either way the resulting store is table-rooted, so
/// callers only ever see paths relative to the base.
pub struct ObjectStoreProvider {
    store: Arc<dyn ObjectStore>,
    base_path: String,
    max_retries: usize,
}

impl ObjectStoreProvider {
    /// Open the store a configuration describes.
    ///
    /// # Errors
    ///
    /// Fails when a local location does not exist or is not a directory,
    /// when a URL names an unsupported scheme, or when the selected
    /// backend cannot be built from the forwarded options.
    pub fn open(config: &StorageConfig) -> StorageResult<Self> {
        let (store, base_path) = match Url::parse(&config.location) {
            Ok(url) => Self::open_url(&url, config)?,
            // No scheme: a local directory
            Err(_) => Self::open_local_dir(&config.location)?,
        };

        Ok(Self {
            store,
            base_path,
            max_retries: config.max_retries,
        })
    }

    fn open_url(url: &Url, config: &StorageConfig) -> StorageResult<(Arc<dyn ObjectStore>, String)> {
        let options = config
            .options
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()));
        let (store, table_prefix) = parse_url_opts(url, options)?;

        // Root the store at the table path inside the bucket, so relative
        // paths resolve the same way they do for a local directory
        let store: Arc<dyn ObjectStore> = if table_prefix.parts().next().is_none() {
            Arc::from(store)
        } else {
            Arc::new(PrefixStore::new(store, table_prefix))
        };

        Ok((store, config.location.trim_end_matches('/').to_string()))
    }

    fn open_local_dir(location: &str) -> StorageResult<(Arc<dyn ObjectStore>, String)> {
        let canonical = Path::new(location).canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("table location '{}' is not reachable: {}", location, e))
        })?;
        if !canonical.is_dir() {
            return Err(StorageError::ConfigError(format!(
                "table location '{}' is not a directory",
                canonical.display()
            )));
        }

        let store = LocalFileSystem::new_with_prefix(&canonical).map_err(|e| {
            StorageError::ConfigError(format!(
                "cannot open table location '{}': {}",
                canonical.display(),
                e
            ))
        })?;

        Ok((Arc::new(store), canonical.to_string_lossy().to_string()))
    }

    async fn retry_operation<F, Fut, T>(
        &self,
        operation_name: &str,
        operation: F,
    ) -> StorageResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StorageResult<T>>,
    {
        retry_with_max_retries(self.max_retries, operation_name, is_retryable, operation).await
    }
}

#[async_trait]
impl StorageProvider for ObjectStoreProvider {
    fn base_path(&self) -> &str {
        &self.base_path
    }

    async fn list_entries(&self, path: &str) -> StorageResult<Vec<StorageEntry>> {
        let path_str = path.to_string();
        let store = Arc::clone(&self.store);

        self.retry_operation(&format!("list_entries({})", path), || async {
            let object_path = if path_str.is_empty() {
                None
            } else {
                Some(string_to_path(&path_str))
            };

            let list_result = store.list_with_delimiter(object_path.as_ref()).await?;

            let mut entries = Vec::with_capacity(
                list_result.common_prefixes.len() + list_result.objects.len(),
            );
            for prefix in list_result.common_prefixes {
                entries.push(StorageEntry {
                    path: prefix.to_string(),
                    size: 0,
                    is_dir: true,
                    last_modified: None,
                });
            }
            for meta in list_result.objects {
                entries.push(StorageEntry {
                    path: meta.location.to_string(),
                    size: meta.size,
                    is_dir: false,
                    last_modified: Some(meta.last_modified),
                });
            }

            Ok(entries)
        })
        .await
    }

    async fn list_files(&self, path: &str) -> StorageResult<Vec<StorageEntry>> {
        let path_str = path.to_string();
        let store = Arc::clone(&self.store);

        self.retry_operation(&format!("list_files({})", path), || async {
            let object_path = if path_str.is_empty() {
                None
            } else {
                Some(string_to_path(&path_str))
            };

            let mut files = Vec::new();
            let mut stream = store.list(object_path.as_ref());
            while let Some(meta) = stream.next().await {
                let meta = meta?;
                files.push(StorageEntry {
                    path: meta.location.to_string(),
                    size: meta.size,
                    is_dir: false,
                    last_modified: Some(meta.last_modified),
                });
            }

            Ok(files)
        })
        .await
    }

    async fn read_file(&self, path: &str) -> StorageResult<Vec<u8>> {
        let path_str = path.to_string();
        let store = Arc::clone(&self.store);

        self.retry_operation(&format!("read_file({})", path), || async {
            let object_path = string_to_path(&path_str);
            let bytes = store.get(&object_path).await?.bytes().await?;
            Ok(bytes.to_vec())
        })
        .await
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let object_path = string_to_path(path);
        match self.store.head(&object_path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str, recursive: bool) -> StorageResult<()> {
        if recursive {
            let files = self.list_files(path).await?;
            for file in files {
                self.store.delete(&string_to_path(&file.path)).await?;
            }
            Ok(())
        } else {
            self.store.delete(&string_to_path(path)).await?;
            Ok(())
        }
    }

    fn uri_from_path(&self, path: &str) -> String {
        let base = self.base_path.trim_end_matches('/');
        if base.starts_with('/') {
            format!("file://{}/{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn local_provider(temp_dir: &TempDir) -> ObjectStoreProvider {
        ObjectStoreProvider::open(&StorageConfig::at(temp_dir.path().to_str().unwrap())).unwrap()
    }

    #[test]
    fn test_open_missing_local_dir_fails() {
        let result = ObjectStoreProvider::open(&StorageConfig::at("/no/such/table"));
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }

    #[test]
    fn test_open_local_file_is_not_a_table() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("blob"), b"x").unwrap();
        let location = temp_dir.path().join("blob");
        let result = ObjectStoreProvider::open(&StorageConfig::at(location.to_str().unwrap()));
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }

    #[test]
    fn test_open_s3_url_roots_at_table_path() {
        let config = StorageConfig::at("s3://warehouse/tables/t1/")
            .with_option("aws_region", "us-east-1")
            .with_option("aws_access_key_id", "k")
            .with_option("aws_secret_access_key", "s");
        let provider = ObjectStoreProvider::open(&config).unwrap();
        assert_eq!(provider.base_path(), "s3://warehouse/tables/t1");
        assert_eq!(
            provider.uri_from_path("p1/f1.parquet"),
            "s3://warehouse/tables/t1/p1/f1.parquet"
        );
    }

    #[test]
    fn test_open_unsupported_scheme_fails() {
        let result = ObjectStoreProvider::open(&StorageConfig::at("ftp://host/t1"));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_list_entries_splits_files_and_dirs() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("p1")).unwrap();
        fs::write(temp_dir.path().join("p1/f1.parquet"), b"x").unwrap();
        fs::write(temp_dir.path().join("top.properties"), b"k=v").unwrap();

        let provider = local_provider(&temp_dir);
        let entries = provider.list_entries("").await.unwrap();

        let dirs: Vec<_> = entries.iter().filter(|e| e.is_dir).collect();
        let files: Vec<_> = entries.iter().filter(|e| !e.is_dir).collect();
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].path, "p1");
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name(), "top.properties");
    }

    #[tokio::test]
    async fn test_list_files_recursive() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("a/b")).unwrap();
        fs::write(temp_dir.path().join("a/b/f1.parquet"), b"x").unwrap();
        fs::write(temp_dir.path().join("a/f2.parquet"), b"xy").unwrap();

        let provider = local_provider(&temp_dir);
        let mut files = provider.list_files("a").await.unwrap();
        files.sort_by(|l, r| l.path.cmp(&r.path));

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "a/b/f1.parquet");
        assert_eq!(files[1].size, 2);
    }

    #[tokio::test]
    async fn test_read_file_and_exists() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("blob.json"), b"{\"k\":1}").unwrap();

        let provider = local_provider(&temp_dir);
        let content = provider.read_file("blob.json").await.unwrap();
        assert_eq!(content, b"{\"k\":1}");

        assert!(provider.exists("blob.json").await.unwrap());
        assert!(!provider.exists("missing.json").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_recursive() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("meta/files")).unwrap();
        fs::write(temp_dir.path().join("meta/files/f1"), b"x").unwrap();
        fs::write(temp_dir.path().join("meta/props"), b"y").unwrap();

        let provider = local_provider(&temp_dir);
        provider.delete("meta", true).await.unwrap();

        assert!(provider.list_files("meta").await.unwrap().is_empty());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(is_retryable(&StorageError::ConnectionError("r".into())));
        assert!(!is_retryable(&StorageError::ConfigError("c".into())));
        let not_found: StorageError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "nf").into();
        assert!(!is_retryable(&not_found));
    }
}
