/*!
The record store: path resolution, JSON encoding and storage calls combined
into typed persist / get / get_all / filter / exists / delete operations.

Every operation comes in a plain blocking form and a `*_with` form that takes
a completion closure. The closure runs on the caller's thread, only after the
operation succeeded; failures are returned from the call itself and the
closure is dropped without being invoked.
*/

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::Instant;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::observability::observe_operation;
use crate::path::{
    self, identifier_from_file_name, validate_identifier, validate_root, DEFAULT_ROOT,
};
use crate::storage::StorageAdapter;
use crate::{Record, Result, StorageError, StoreError};

/// Typed record store over a [`StorageAdapter`]
///
/// Records of type `T` live at `<root>/<collection>/<identifier>.json` where
/// `<collection>` is `T::collection_name()` lower-cased.
///
/// # Example
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use shelf_core::{MemoryStorage, Record, RecordStore};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct User {
///     id: String,
///     first_name: String,
/// }
///
/// impl Record for User {
///     fn identifier(&self) -> String {
///         self.id.clone()
///     }
/// }
///
/// let store = RecordStore::new(MemoryStorage::new(), "my-app")?;
/// let mario = User { id: "1".into(), first_name: "Mario".into() };
///
/// store.persist(&mario)?;
/// assert!(store.exists(&mario));
/// assert_eq!(store.get::<User>("1")?, mario);
///
/// store.delete(&mario)?;
/// assert!(store.get::<User>("1").unwrap_err().is_not_found());
/// # Ok::<(), shelf_core::StoreError>(())
/// ```
pub struct RecordStore<S>
where
    S: StorageAdapter,
{
    storage: S,
    root: String,
    registered: HashMap<TypeId, String>,
}

impl<S> RecordStore<S>
where
    S: StorageAdapter,
{
    /// Create a store whose paths all live under `root`
    ///
    /// # Errors
    /// * `StoreError::Validation` - `root` is empty, absolute, contains `\`, or has an empty,
    ///   `.` or `..` segment
    pub fn new(storage: S, root: impl Into<String>) -> Result<Self> {
        let root = root.into();
        validate_root(&root)?;
        Ok(Self::unchecked(storage, root))
    }

    /// Create a store rooted at [`DEFAULT_ROOT`]
    pub fn with_default_root(storage: S) -> Self {
        Self::unchecked(storage, DEFAULT_ROOT.to_string())
    }

    fn unchecked(storage: S, root: String) -> Self {
        Self {
            storage,
            root,
            registered: HashMap::new(),
        }
    }

    /// The namespace prefix of every path this store touches
    pub fn root(&self) -> &str {
        &self.root
    }

    /// The underlying storage adapter
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Declare `T` as a record type this store is responsible for
    pub fn register<T: Record + 'static>(&mut self) {
        self.registered.insert(TypeId::of::<T>(), type_tag::<T>());
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_record<T: Record + 'static>(mut self) -> Self {
        self.register::<T>();
        self
    }

    /// Whether `value` is of a record type registered on this store
    ///
    /// Pass the concrete value; a `&Box<dyn Any>` would be checked as the box.
    pub fn is_responsible_for(&self, value: &dyn Any) -> bool {
        self.registered.contains_key(&value.type_id())
    }

    /// Whether `T` is a record type registered on this store
    pub fn is_responsible_for_type<T: ?Sized + 'static>(&self) -> bool {
        self.registered.contains_key(&TypeId::of::<T>())
    }

    /// Collection tag `value` would be stored under, if its type is registered
    pub fn collection_for(&self, value: &dyn Any) -> Option<&str> {
        self.registered.get(&value.type_id()).map(String::as_str)
    }

    // ---- write path ----

    /// Store `record`, replacing whatever was stored under its identifier
    ///
    /// # Errors
    /// * `StoreError::InvalidIdentifier` - the identifier cannot be used in a path
    /// * `StoreError::CannotPersist` - encoding or the storage write failed
    pub fn persist<T: Record>(&self, record: &T) -> Result<()> {
        observed("persist", || self.write_record(record))
    }

    /// [`persist`](Self::persist), then run `on_persisted`
    pub fn persist_with<T, F>(&self, record: &T, on_persisted: F) -> Result<()>
    where
        T: Record,
        F: FnOnce(),
    {
        self.persist(record)?;
        on_persisted();
        Ok(())
    }

    /// Same as [`persist`](Self::persist): the stored record is fully replaced,
    /// no fields are merged
    pub fn update<T: Record>(&self, record: &T) -> Result<()> {
        observed("update", || self.write_record(record))
    }

    /// [`update`](Self::update), then run `on_updated`
    pub fn update_with<T, F>(&self, record: &T, on_updated: F) -> Result<()>
    where
        T: Record,
        F: FnOnce(),
    {
        self.update(record)?;
        on_updated();
        Ok(())
    }

    fn write_record<T: Record>(&self, record: &T) -> Result<()> {
        let path = self.record_path::<T>(&record.identifier())?;
        let cannot_persist = |source| StoreError::CannotPersist {
            path: path.clone(),
            source,
        };

        let data = serde_json::to_vec(record).map_err(|e| cannot_persist(e.into()))?;
        self.storage.save(&data, &path).map_err(cannot_persist)?;

        debug!(path = %path, bytes = data.len(), "Persisted record");
        Ok(())
    }

    // ---- read path ----

    /// Load the record of type `T` stored under `identifier`
    ///
    /// # Errors
    /// * `StoreError::InvalidIdentifier` - the identifier cannot be used in a path
    /// * `StoreError::NotFound` - nothing is stored there, or it does not decode as `T`
    pub fn get<T: Record>(&self, identifier: &str) -> Result<T> {
        observed("get", || {
            let path = self.record_path::<T>(identifier)?;
            self.read_document(&path)
        })
    }

    /// [`get`](Self::get), handing the record to `on_found`
    pub fn get_with<T, F>(&self, identifier: &str, on_found: F) -> Result<()>
    where
        T: Record,
        F: FnOnce(T),
    {
        let record = self.get::<T>(identifier)?;
        on_found(record);
        Ok(())
    }

    /// Load every record of type `T`, in the order they were first persisted
    ///
    /// The collection is all-or-nothing: one record that fails to decode fails
    /// the whole call.
    ///
    /// # Errors
    /// * `StoreError::NotFound` - no record of `T` is stored, or one fails to decode
    pub fn get_all<T: Record>(&self) -> Result<Vec<T>> {
        observed("get_all", || {
            let documents = self.read_collection::<T>(&self.collection_path::<T>()?)?;
            Ok(documents.into_iter().map(|(_, record)| record).collect())
        })
    }

    /// [`get_all`](Self::get_all), handing the records to `on_loaded`
    pub fn get_all_with<T, F>(&self, on_loaded: F) -> Result<()>
    where
        T: Record,
        F: FnOnce(Vec<T>),
    {
        let records = self.get_all::<T>()?;
        on_loaded(records);
        Ok(())
    }

    /// Records of type `T` for which `predicate` holds, in storage order
    ///
    /// # Errors
    /// * `StoreError::CannotFilter` - loading the collection failed; wraps that error
    pub fn filter<T, P>(&self, predicate: P) -> Result<Vec<T>>
    where
        T: Record,
        P: Fn(&T) -> bool,
    {
        observed("filter", || {
            let records = self
                .get_all::<T>()
                .map_err(|source| StoreError::CannotFilter {
                    type_tag: type_tag::<T>(),
                    source: Box::new(source),
                })?;
            Ok(records.into_iter().filter(|record| predicate(record)).collect())
        })
    }

    /// [`filter`](Self::filter), handing the matches to `on_filtered`
    pub fn filter_with<T, P, F>(&self, predicate: P, on_filtered: F) -> Result<()>
    where
        T: Record,
        P: Fn(&T) -> bool,
        F: FnOnce(Vec<T>),
    {
        let records = self.filter(predicate)?;
        on_filtered(records);
        Ok(())
    }

    // ---- existence ----

    /// Whether a record with `record`'s identifier is stored
    pub fn exists<T: Record>(&self, record: &T) -> bool {
        self.exists_id::<T>(&record.identifier())
    }

    /// [`exists`](Self::exists), handing the answer to `on_checked`
    pub fn exists_with<T, F>(&self, record: &T, on_checked: F)
    where
        T: Record,
        F: FnOnce(bool),
    {
        on_checked(self.exists(record));
    }

    /// Whether a record of type `T` is stored under `identifier`
    ///
    /// Identifiers that cannot be used in a path are never stored.
    pub fn exists_id<T: Record>(&self, identifier: &str) -> bool {
        self.record_path::<T>(identifier)
            .map(|path| self.storage.exists(&path))
            .unwrap_or(false)
    }

    /// [`exists_id`](Self::exists_id), handing the answer to `on_checked`
    pub fn exists_id_with<T, F>(&self, identifier: &str, on_checked: F)
    where
        T: Record,
        F: FnOnce(bool),
    {
        on_checked(self.exists_id::<T>(identifier));
    }

    /// Whether any record of type `T` is stored
    pub fn exists_collection<T: Record>(&self) -> bool {
        self.collection_path::<T>()
            .map(|path| self.storage.exists(&path))
            .unwrap_or(false)
    }

    /// [`exists_collection`](Self::exists_collection), handing the answer to `on_checked`
    pub fn exists_collection_with<T, F>(&self, on_checked: F)
    where
        T: Record,
        F: FnOnce(bool),
    {
        on_checked(self.exists_collection::<T>());
    }

    // ---- deletion ----

    /// Remove the stored record with `record`'s identifier
    ///
    /// # Errors
    /// * `StoreError::NotFound` - nothing is stored under that identifier
    pub fn delete<T: Record>(&self, record: &T) -> Result<()> {
        self.delete_id::<T>(&record.identifier())
    }

    /// [`delete`](Self::delete), then run `on_deleted`
    pub fn delete_with<T, F>(&self, record: &T, on_deleted: F) -> Result<()>
    where
        T: Record,
        F: FnOnce(),
    {
        self.delete(record)?;
        on_deleted();
        Ok(())
    }

    /// Remove the record of type `T` stored under `identifier`
    ///
    /// # Errors
    /// * `StoreError::InvalidIdentifier` - the identifier cannot be used in a path
    /// * `StoreError::NotFound` - nothing is stored under that identifier
    pub fn delete_id<T: Record>(&self, identifier: &str) -> Result<()> {
        observed("delete", || {
            let path = self.record_path::<T>(identifier)?;
            self.remove_document(&path)
        })
    }

    /// [`delete_id`](Self::delete_id), then run `on_deleted`
    pub fn delete_id_with<T, F>(&self, identifier: &str, on_deleted: F) -> Result<()>
    where
        T: Record,
        F: FnOnce(),
    {
        self.delete_id::<T>(identifier)?;
        on_deleted();
        Ok(())
    }

    // ---- maintenance ----

    /// Remove every collection under this store's root
    ///
    /// # Errors
    /// * `StoreError::CannotClear` - the storage backend could not remove the root
    pub fn clear(&self) -> Result<()> {
        observed("clear", || {
            self.storage
                .clear(&self.root)
                .map_err(|source| StoreError::CannotClear {
                    root: self.root.clone(),
                    source,
                })?;
            info!(root = %self.root, "Cleared record store");
            Ok(())
        })
    }

    // ---- untyped access ----

    /// Collection tags currently stored under this root, sorted
    pub fn collections(&self) -> Result<Vec<String>> {
        self.storage
            .list(&self.root)
            .map_err(|source| StoreError::NotFound {
                path: self.root.clone(),
                source,
            })
    }

    /// Raw JSON of one record, for callers without a Rust type for it
    pub fn get_document(&self, type_tag: &str, identifier: &str) -> Result<serde_json::Value> {
        let path = self.tagged_path(type_tag, identifier)?;
        self.read_document(&path)
    }

    /// Raw JSON of every record in a collection as `(identifier, document)` pairs
    pub fn get_all_documents(&self, type_tag: &str) -> Result<Vec<(String, serde_json::Value)>> {
        validate_identifier(type_tag)?;
        self.read_collection(&path::resolve(&self.root, type_tag, None))
    }

    /// Remove one record by collection tag and identifier
    pub fn delete_document(&self, type_tag: &str, identifier: &str) -> Result<()> {
        let path = self.tagged_path(type_tag, identifier)?;
        self.remove_document(&path)
    }

    // ---- helpers ----

    fn record_path<T: Record>(&self, identifier: &str) -> Result<String> {
        self.tagged_path(&T::collection_name(), identifier)
    }

    fn collection_path<T: Record>(&self) -> Result<String> {
        let type_tag = T::collection_name();
        validate_identifier(&type_tag)?;
        Ok(path::resolve(&self.root, &type_tag, None))
    }

    fn tagged_path(&self, type_tag: &str, identifier: &str) -> Result<String> {
        validate_identifier(type_tag)?;
        validate_identifier(identifier)?;
        Ok(path::resolve(&self.root, type_tag, Some(identifier)))
    }

    fn read_document<D: DeserializeOwned>(&self, path: &str) -> Result<D> {
        let not_found = |source| StoreError::NotFound {
            path: path.to_string(),
            source,
        };

        let data = self.storage.load(path).map_err(not_found)?;
        serde_json::from_slice(&data).map_err(|e| not_found(e.into()))
    }

    /// Decode every record file under a collection path, keeping storage order
    ///
    /// A collection without a single record file is `NotFound`.
    fn read_collection<D: DeserializeOwned>(&self, path: &str) -> Result<Vec<(String, D)>> {
        let entries = self
            .storage
            .load_sequence(path)
            .map_err(|source| StoreError::NotFound {
                path: path.to_string(),
                source,
            })?;

        let records: Vec<_> = entries
            .into_iter()
            .filter_map(|entry| {
                let identifier = identifier_from_file_name(&entry.name)?.to_string();
                Some((identifier, entry))
            })
            .collect();
        if records.is_empty() {
            return Err(StoreError::NotFound {
                path: path.to_string(),
                source: StorageError::Missing(path.to_string()),
            });
        }

        records
            .into_iter()
            .map(|(identifier, entry)| {
                let document = serde_json::from_slice(&entry.data).map_err(|e| {
                    StoreError::NotFound {
                        path: format!("{path}/{}", entry.name),
                        source: StorageError::from(e),
                    }
                })?;
                Ok((identifier, document))
            })
            .collect()
    }

    fn remove_document(&self, path: &str) -> Result<()> {
        self.storage
            .delete(path)
            .map_err(|source| StoreError::NotFound {
                path: path.to_string(),
                source,
            })?;
        debug!(path = %path, "Deleted record");
        Ok(())
    }
}

/// Lower-cased collection tag of `T`
fn type_tag<T: Record>() -> String {
    T::collection_name().to_lowercase()
}

fn observed<R>(operation: &'static str, run: impl FnOnce() -> Result<R>) -> Result<R> {
    let started = Instant::now();
    let result = run();
    observe_operation(operation, result.is_ok(), started.elapsed());
    result
}
