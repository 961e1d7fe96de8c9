/*!
# shelf core

A file-backed store for typed records, for applications that want simple
local persistence without a database engine.

- Records are plain serde types implementing [`Record`]
- Each record is one JSON document at `<root>/<collection>/<identifier>.json`
- Storage backends are pluggable adapters ([`StorageAdapter`]); a local
  filesystem and an in-memory adapter ship with the crate
- A whole store root can be invalidated when the application's store version
  changes ([`epoch`])

## Architecture

The core follows hexagonal architecture principles:
- Path resolution and encoding are isolated from I/O
- Storage is implemented as adapters behind one small trait
- Errors always carry the underlying cause

## Usage

```rust
use serde::{Deserialize, Serialize};
use shelf_core::{LocalFileStorage, Record, RecordStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct News {
    id: String,
    title: String,
    is_read: bool,
}

impl Record for News {
    fn identifier(&self) -> String {
        self.id.clone()
    }
}

# let dir = tempfile::tempdir()?;
let store = RecordStore::new(LocalFileStorage::with_base_dir(dir.path()), "news-app")?;

store.persist(&News { id: "1".into(), title: "Hello".into(), is_read: false })?;
store.persist(&News { id: "2".into(), title: "World".into(), is_read: true })?;

let unread = store.filter::<News, _>(|news| !news.is_read)?;
assert_eq!(unread.len(), 1);
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/

pub mod config;
pub mod epoch;
pub mod error;
pub mod observability;
pub mod path;
pub mod record;
pub mod storage;
pub mod store;

#[cfg(feature = "async-rt")]
pub mod asynchronous;

#[cfg(test)]
mod error_tests;

pub use config::{create_store_from_config, StorageBackend, StoreConfig};
pub use epoch::{ensure_epoch, FileVersionSlot, MemoryVersionSlot, VersionSlot};
pub use error::{Result, StorageError, StorageResult, StoreError};
pub use record::Record;
pub use storage::{LocalFileStorage, MemoryStorage, StorageAdapter, StoredEntry};
pub use store::RecordStore;

#[cfg(feature = "async-rt")]
pub use asynchronous::AsyncRecordStore;
