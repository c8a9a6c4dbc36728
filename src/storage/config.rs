use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::StorageResult;
use super::object_store::ObjectStoreProvider;
use super::provider::StorageProvider;

/// Where a table lives and how to reach it.
///
/// `location` is either a local directory or an object-store URL
/// (`s3://bucket/table`, `gs://bucket/table`, `az://account/table`).
/// Everything else — credentials, endpoints, client tuning — is forwarded
/// verbatim to the store builder as `(key, value)` options under the
/// store's own configuration names, so no per-provider plumbing lives
/// here.
///
/// # Examples
///
/// ```
/// use lake_index::storage::StorageConfig;
///
/// let local = StorageConfig::at("/tables/trips");
///
/// let s3 = StorageConfig::at("s3://warehouse/tables/trips")
///     .with_option("aws_region", "us-east-1")
///     .with_option("aws_access_key_id", "AKIA...");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Table base: local directory path or object-store URL.
    pub location: String,

    /// Options forwarded to the object-store builder, keyed by the
    /// store's configuration names (`aws_region`, `azure_storage_account_name`,
    /// `google_service_account`, `timeout`, ...). Ignored for local
    /// directories.
    #[serde(default)]
    pub options: Vec<(String, String)>,

    /// Retries for transient storage failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

fn default_max_retries() -> usize {
    10
}

impl StorageConfig {
    /// Configuration for a table at the given location.
    pub fn at(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            options: Vec::new(),
            max_retries: default_max_retries(),
        }
    }

    /// Add a store option (chaining).
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }

    /// Override the transient-failure retry budget (chaining).
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Open the storage provider this configuration describes.
    ///
    /// # Errors
    ///
    /// Fails when the location does not exist (local directories), names
    /// an unsupported scheme, or the selected backend cannot be built
    /// from the given options.
    pub fn connect(&self) -> StorageResult<Arc<dyn StorageProvider>> {
        Ok(Arc::new(ObjectStoreProvider::open(self)?))
    }
}
