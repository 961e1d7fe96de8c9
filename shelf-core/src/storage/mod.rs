/*!
Storage adapters for record persistence.

This module defines the storage abstraction (port) and concrete implementations (adapters)
following hexagonal architecture principles. The record store only resolves paths and
encodes records; where the bytes end up is the adapter's business.

Paths handed to an adapter are `/`-separated strings relative to the adapter's own base.
*/

pub mod local;
pub mod memory;

use crate::StorageResult;

/// One entry returned by [`StorageAdapter::load_sequence`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    /// Entry name relative to the listed path (e.g. `42.json`)
    pub name: String,
    /// Raw stored bytes
    pub data: Vec<u8>,
}

/// Storage abstraction for saving and loading record data
///
/// This trait defines the interface that all storage implementations must provide.
/// It abstracts away the specifics of where and how data is stored, allowing
/// the record store to work with any storage backend.
pub trait StorageAdapter: Send + Sync {
    /// Save data to the specified location, overwriting whatever is there
    ///
    /// Missing parent locations are created.
    fn save(&self, data: &[u8], path: &str) -> StorageResult<()>;

    /// Load data from the specified location
    ///
    /// # Errors
    /// [`StorageError::Missing`](crate::StorageError::Missing) if nothing is stored there
    fn load(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Load every entry stored directly under `path`
    ///
    /// Entries come back in the order they were first saved; overwriting an
    /// entry keeps its position.
    ///
    /// # Errors
    /// [`StorageError::Missing`](crate::StorageError::Missing) if `path` holds nothing
    fn load_sequence(&self, path: &str) -> StorageResult<Vec<StoredEntry>>;

    /// Check if anything is stored at the specified location
    ///
    /// Probe failures count as "not stored".
    fn exists(&self, path: &str) -> bool;

    /// Delete the entry at the specified location
    ///
    /// # Errors
    /// [`StorageError::Missing`](crate::StorageError::Missing) if nothing is stored there
    fn delete(&self, path: &str) -> StorageResult<()>;

    /// Remove `root` and everything under it
    ///
    /// Clearing a root that holds nothing succeeds.
    fn clear(&self, root: &str) -> StorageResult<()>;

    /// Names of the entries directly under `path`, sorted
    ///
    /// Returns an empty list when `path` holds nothing.
    fn list(&self, path: &str) -> StorageResult<Vec<String>>;
}

impl<A: StorageAdapter + ?Sized> StorageAdapter for Box<A> {
    fn save(&self, data: &[u8], path: &str) -> StorageResult<()> {
        (**self).save(data, path)
    }

    fn load(&self, path: &str) -> StorageResult<Vec<u8>> {
        (**self).load(path)
    }

    fn load_sequence(&self, path: &str) -> StorageResult<Vec<StoredEntry>> {
        (**self).load_sequence(path)
    }

    fn exists(&self, path: &str) -> bool {
        (**self).exists(path)
    }

    fn delete(&self, path: &str) -> StorageResult<()> {
        (**self).delete(path)
    }

    fn clear(&self, root: &str) -> StorageResult<()> {
        (**self).clear(root)
    }

    fn list(&self, path: &str) -> StorageResult<Vec<String>> {
        (**self).list(path)
    }
}

// Re-export types for convenience
pub use local::LocalFileStorage;
pub use memory::MemoryStorage;
