//! Configuration module for storage backend selection and store settings
//!
//! This module provides configuration structures and enums for selecting
//! between the storage backends (local filesystem, in-memory) and naming the
//! store root.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::path::{validate_root, DEFAULT_ROOT};
use crate::storage::{LocalFileStorage, MemoryStorage, StorageAdapter};
use crate::{RecordStore, Result, StoreError};

/// Enumeration of supported storage backends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackend {
    /// Local filesystem storage
    Local,
    /// In-process storage, gone when the process exits
    Memory,
}

/// Configuration structure for a record store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// The storage backend to use
    pub backend: StorageBackend,
    /// Namespace prefix for every path the store writes
    pub root: String,
    /// Base path for local storage (optional, defaults to current directory)
    pub local_base_path: Option<PathBuf>,
}

impl StoreConfig {
    /// Create a default configuration for local filesystem storage
    pub fn default_local() -> Self {
        StoreConfig {
            backend: StorageBackend::Local,
            root: DEFAULT_ROOT.to_string(),
            local_base_path: None,
        }
    }

    /// Create a default configuration for in-memory storage
    pub fn default_memory() -> Self {
        StoreConfig {
            backend: StorageBackend::Memory,
            root: DEFAULT_ROOT.to_string(),
            local_base_path: None,
        }
    }

    /// Create a local configuration with the specified base directory
    pub fn local_with_base<P: Into<PathBuf>>(base: P) -> Self {
        StoreConfig {
            local_base_path: Some(base.into()),
            ..Self::default_local()
        }
    }

    /// Replace the store root
    pub fn with_root<S: Into<String>>(mut self, root: S) -> Self {
        self.root = root.into();
        self
    }

    /// Parse a storage URI and create the matching configuration
    ///
    /// Supports formats:
    /// - `memory://` or `memory://<root>` for in-memory storage
    /// - `file:///base/dir` for local storage under a base directory
    /// - `/local/path` or `./relative/path` for local storage
    ///
    /// The root stays [`DEFAULT_ROOT`] unless the memory URI names one.
    pub fn from_uri(uri: &str) -> Result<StoreConfig> {
        if let Some(root) = uri.strip_prefix("memory://") {
            let config = StoreConfig::default_memory();
            return Ok(if root.is_empty() {
                config
            } else {
                config.with_root(root.trim_end_matches('/'))
            });
        }

        let base = uri.strip_prefix("file://").unwrap_or(uri);
        if base.is_empty() {
            return Err(StoreError::validation(
                "Invalid storage URI: missing base directory",
            ));
        }
        Ok(StoreConfig::local_with_base(base))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_root(&self.root)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::default_local()
    }
}

/// Create a record store based on configuration
///
/// The backend is boxed so callers can pick it at runtime. The root is
/// validated before any storage is touched.
///
/// # Example
/// ```rust
/// use shelf_core::{create_store_from_config, StoreConfig};
///
/// let store = create_store_from_config(StoreConfig::from_uri("memory://app")?)?;
/// assert_eq!(store.root(), "app");
/// # Ok::<(), shelf_core::StoreError>(())
/// ```
pub fn create_store_from_config(
    config: StoreConfig,
) -> Result<RecordStore<Box<dyn StorageAdapter>>> {
    let storage: Box<dyn StorageAdapter> = match config.backend {
        StorageBackend::Local => match config.local_base_path {
            Some(base_path) => Box::new(LocalFileStorage::with_base_dir(base_path)),
            None => Box::new(LocalFileStorage::new()),
        },
        StorageBackend::Memory => Box::new(MemoryStorage::new()),
    };

    RecordStore::new(storage, config.root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_local_config() {
        let config = StoreConfig::default_local();
        assert_eq!(config.backend, StorageBackend::Local);
        assert_eq!(config.root, DEFAULT_ROOT);
        assert!(config.local_base_path.is_none());
    }

    #[test]
    fn test_from_uri_memory() {
        let config = StoreConfig::from_uri("memory://my-app").unwrap();
        assert_eq!(config.backend, StorageBackend::Memory);
        assert_eq!(config.root, "my-app");

        let config = StoreConfig::from_uri("memory://").unwrap();
        assert_eq!(config.root, DEFAULT_ROOT);
    }

    #[test]
    fn test_from_uri_file() {
        let config = StoreConfig::from_uri("file:///var/lib/shelf").unwrap();
        assert_eq!(config.backend, StorageBackend::Local);
        assert_eq!(config.local_base_path, Some(PathBuf::from("/var/lib/shelf")));
    }

    #[test]
    fn test_from_uri_local() {
        let config = StoreConfig::from_uri("./data").unwrap();
        assert_eq!(config.backend, StorageBackend::Local);
        assert_eq!(config.local_base_path, Some(PathBuf::from("./data")));
    }

    #[test]
    fn test_from_uri_invalid() {
        let result = StoreConfig::from_uri("file://");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("missing base directory"));
    }

    #[test]
    fn test_validate_root() {
        assert!(StoreConfig::default_local().validate().is_ok());
        assert!(StoreConfig::default_local().with_root("app/v2").validate().is_ok());

        for root in ["", "/abs", "a//b", "../up", "a/./b", "win\\dows"] {
            let config = StoreConfig::default_local().with_root(root);
            assert!(config.validate().is_err(), "{root:?} should be rejected");
        }
    }

    #[test]
    fn test_create_store_from_config() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = StoreConfig::local_with_base(temp_dir.path()).with_root("app");

        let store = create_store_from_config(config).unwrap();
        store.storage().save(b"{}", "app/t/1.json").unwrap();

        assert!(temp_dir.path().join("app/t/1.json").is_file());
    }

    #[test]
    fn test_create_store_rejects_invalid_config() {
        let config = StoreConfig::default_memory().with_root("");
        assert!(matches!(
            create_store_from_config(config),
            Err(StoreError::Validation(_))
        ));
    }
}
