/*!
In-process storage adapter.
*/

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{StorageAdapter, StoredEntry};
use crate::{StorageError, StorageResult};

/// Memory-based storage adapter
///
/// Stores entries in a HashMap keyed by their full path. Useful for unit testing
/// and for embedding a store that should not touch the filesystem. Each entry
/// remembers when it was first saved so sequences come back in save order.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_seq: u64,
    entries: HashMap<String, MemoryEntry>,
}

#[derive(Debug)]
struct MemoryEntry {
    seq: u64,
    data: Vec<u8>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently stored
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    /// Returns `true` if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    // Every operation leaves the map consistent, so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn child_prefix(path: &str) -> String {
    format!("{}/", path.trim_end_matches('/'))
}

fn is_under(key: &str, path: &str, prefix: &str) -> bool {
    key == path || key.starts_with(prefix)
}

impl StorageAdapter for MemoryStorage {
    fn save(&self, data: &[u8], path: &str) -> StorageResult<()> {
        let mut state = self.write();
        if let Some(entry) = state.entries.get_mut(path) {
            entry.data = data.to_vec();
            return Ok(());
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.insert(
            path.to_string(),
            MemoryEntry {
                seq,
                data: data.to_vec(),
            },
        );
        Ok(())
    }

    fn load(&self, path: &str) -> StorageResult<Vec<u8>> {
        self.read()
            .entries
            .get(path)
            .map(|entry| entry.data.clone())
            .ok_or_else(|| StorageError::Missing(path.to_string()))
    }

    fn load_sequence(&self, path: &str) -> StorageResult<Vec<StoredEntry>> {
        let prefix = child_prefix(path);
        let state = self.read();

        let mut children: Vec<(u64, StoredEntry)> = state
            .entries
            .iter()
            .filter_map(|(key, entry)| {
                let name = key.strip_prefix(&prefix)?;
                (!name.contains('/')).then(|| {
                    (
                        entry.seq,
                        StoredEntry {
                            name: name.to_string(),
                            data: entry.data.clone(),
                        },
                    )
                })
            })
            .collect();

        if children.is_empty() && !state.entries.keys().any(|key| key.starts_with(&prefix)) {
            return Err(StorageError::Missing(path.to_string()));
        }

        children.sort_by_key(|(seq, _)| *seq);
        Ok(children.into_iter().map(|(_, entry)| entry).collect())
    }

    fn exists(&self, path: &str) -> bool {
        let prefix = child_prefix(path);
        self.read()
            .entries
            .keys()
            .any(|key| is_under(key, path, &prefix))
    }

    fn delete(&self, path: &str) -> StorageResult<()> {
        self.write()
            .entries
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::Missing(path.to_string()))
    }

    fn clear(&self, root: &str) -> StorageResult<()> {
        let prefix = child_prefix(root);
        self.write()
            .entries
            .retain(|key, _| !is_under(key, root, &prefix));
        Ok(())
    }

    fn list(&self, path: &str) -> StorageResult<Vec<String>> {
        let prefix = child_prefix(path);
        let names: BTreeSet<String> = self
            .read()
            .entries
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .map(str::to_string)
            .collect();
        Ok(names.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_basic_operations() {
        let storage = MemoryStorage::new();

        storage.save(b"one", "root/user/1.json").unwrap();
        assert!(storage.exists("root/user/1.json"));
        assert!(storage.exists("root/user"));
        assert!(storage.exists("root"));
        assert!(!storage.exists("root/us"));

        assert_eq!(storage.load("root/user/1.json").unwrap(), b"one");

        storage.delete("root/user/1.json").unwrap();
        assert!(!storage.exists("root/user"));
        assert!(storage.is_empty());
    }

    #[test]
    fn test_sequence_keeps_first_save_order() {
        let storage = MemoryStorage::new();
        storage.save(b"b", "root/t/b.json").unwrap();
        storage.save(b"a", "root/t/a.json").unwrap();
        storage.save(b"c", "root/t/c.json").unwrap();
        storage.save(b"b2", "root/t/b.json").unwrap();

        let entries = storage.load_sequence("root/t").unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["b.json", "a.json", "c.json"]);
        assert_eq!(entries[0].data, b"b2");
    }

    #[test]
    fn test_sequence_skips_nested_entries() {
        let storage = MemoryStorage::new();
        storage.save(b"x", "root/t/1.json").unwrap();
        storage.save(b"y", "root/t/nested/2.json").unwrap();

        let entries = storage.load_sequence("root/t").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "1.json");
    }

    #[test]
    fn test_missing_paths() {
        let storage = MemoryStorage::new();
        assert!(matches!(storage.load("nope"), Err(StorageError::Missing(_))));
        assert!(matches!(storage.load_sequence("nope"), Err(StorageError::Missing(_))));
        assert!(matches!(storage.delete("nope"), Err(StorageError::Missing(_))));
        assert!(storage.list("nope").unwrap().is_empty());
    }

    #[test]
    fn test_clear_is_scoped_to_root() {
        let storage = MemoryStorage::new();
        storage.save(b"1", "app/user/1.json").unwrap();
        storage.save(b"2", "app/news/2.json").unwrap();
        storage.save(b"3", "application/user/3.json").unwrap();

        storage.clear("app").unwrap();
        assert!(!storage.exists("app"));
        assert!(storage.exists("application/user/3.json"));

        // clearing again is still fine
        storage.clear("app").unwrap();
    }

    #[test]
    fn test_list_children() {
        let storage = MemoryStorage::new();
        storage.save(b"1", "app/user/1.json").unwrap();
        storage.save(b"2", "app/news/2.json").unwrap();
        storage.save(b"3", "app/news/3.json").unwrap();

        assert_eq!(storage.list("app").unwrap(), ["news", "user"]);
        assert_eq!(storage.list("app/news").unwrap(), ["2.json", "3.json"]);
    }
}
