/*!
Version-gated invalidation of a whole store root.

A store root has no schema migration. When the shape of the records changes,
the application bumps its store version; the next startup sees a version
different from the one recorded last time and clears the root before first
use. The last seen version lives in a [`VersionSlot`], kept outside the root
so the clear does not erase it.
*/

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::storage::StorageAdapter;
use crate::{RecordStore, Result, StorageError, StorageResult, StoreError};

impl<S> RecordStore<S>
where
    S: StorageAdapter,
{
    /// Clear the store when `previous` is not `current`
    ///
    /// A missing `previous` (first run, or a store that predates versioning)
    /// also counts as a change. Returns whether the store was cleared.
    pub fn flush_if_version_changed(&self, previous: Option<u32>, current: u32) -> Result<bool> {
        if previous == Some(current) {
            return Ok(false);
        }
        self.clear()?;
        info!(root = %self.root(), ?previous, current, "Flushed record store for new version");
        Ok(true)
    }
}

/// Small persistent slot holding the last seen store version
pub trait VersionSlot {
    /// The recorded version, or `None` when nothing was recorded yet
    fn read(&self) -> StorageResult<Option<u32>>;

    /// Record `version`, replacing the previous value
    fn write(&self, version: u32) -> StorageResult<()>;
}

/// Compare the slot against `target`, flush the store on mismatch, then
/// record `target`
///
/// Returns whether the store was cleared. The slot is only updated after a
/// successful clear, so a failed flush is retried on the next startup.
///
/// # Example
/// ```rust
/// use shelf_core::epoch::{ensure_epoch, MemoryVersionSlot};
/// use shelf_core::{MemoryStorage, RecordStore};
///
/// let store = RecordStore::new(MemoryStorage::new(), "app")?;
/// let slot = MemoryVersionSlot::with_version(1);
///
/// assert!(!ensure_epoch(&store, &slot, 1)?);
/// assert!(ensure_epoch(&store, &slot, 2)?);
/// # Ok::<(), shelf_core::StoreError>(())
/// ```
pub fn ensure_epoch<S, V>(store: &RecordStore<S>, slot: &V, target: u32) -> Result<bool>
where
    S: StorageAdapter,
    V: VersionSlot + ?Sized,
{
    let previous = slot.read().map_err(StoreError::VersionMarker)?;
    let flushed = store.flush_if_version_changed(previous, target)?;
    if previous != Some(target) {
        slot.write(target).map_err(StoreError::VersionMarker)?;
    }
    Ok(flushed)
}

/// On-disk shape of a [`FileVersionSlot`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionMarker {
    pub version: u32,
    pub recorded_at: DateTime<Utc>,
}

/// Version slot backed by a small JSON file
#[derive(Debug, Clone)]
pub struct FileVersionSlot {
    path: PathBuf,
}

impl FileVersionSlot {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Location of the marker file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The full marker, including when it was written
    pub fn marker(&self) -> StorageResult<Option<VersionMarker>> {
        match fs::read(&self.path) {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(self.path.display().to_string(), e)),
        }
    }
}

impl VersionSlot for FileVersionSlot {
    fn read(&self) -> StorageResult<Option<u32>> {
        Ok(self.marker()?.map(|marker| marker.version))
    }

    fn write(&self, version: u32) -> StorageResult<()> {
        let marker = VersionMarker {
            version,
            recorded_at: Utc::now(),
        };
        let data = serde_json::to_vec_pretty(&marker)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| StorageError::io(parent.display().to_string(), e))?;
        }
        fs::write(&self.path, data)
            .map_err(|e| StorageError::io(self.path.display().to_string(), e))
    }
}

/// In-process version slot for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryVersionSlot {
    version: Mutex<Option<u32>>,
}

impl MemoryVersionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(version: u32) -> Self {
        Self {
            version: Mutex::new(Some(version)),
        }
    }
}

impl VersionSlot for MemoryVersionSlot {
    fn read(&self) -> StorageResult<Option<u32>> {
        self.version
            .lock()
            .map(|version| *version)
            .map_err(|_| StorageError::backend("version slot lock poisoned"))
    }

    fn write(&self, version: u32) -> StorageResult<()> {
        let mut slot = self
            .version
            .lock()
            .map_err(|_| StorageError::backend("version slot lock poisoned"))?;
        *slot = Some(version);
        Ok(())
    }
}
