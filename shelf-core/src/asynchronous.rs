/*!
Tokio wrapper around the blocking record store.

Each call still performs the same blocking I/O; it just runs on tokio's
blocking pool so async callers do not stall their executor.
*/

use std::sync::Arc;

use tokio::task;

use crate::storage::StorageAdapter;
use crate::{Record, RecordStore, Result, StoreError};

/// Async facade over a shared [`RecordStore`]
pub struct AsyncRecordStore<S>
where
    S: StorageAdapter,
{
    inner: Arc<RecordStore<S>>,
}

impl<S> Clone for AsyncRecordStore<S>
where
    S: StorageAdapter,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> AsyncRecordStore<S>
where
    S: StorageAdapter + 'static,
{
    pub fn new(store: RecordStore<S>) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// The wrapped blocking store
    pub fn blocking(&self) -> &RecordStore<S> {
        &self.inner
    }

    async fn run<R, F>(&self, call: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&RecordStore<S>) -> Result<R> + Send + 'static,
    {
        let store = Arc::clone(&self.inner);
        task::spawn_blocking(move || call(&store))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    pub async fn persist<T>(&self, record: T) -> Result<()>
    where
        T: Record + Send + 'static,
    {
        self.run(move |store| store.persist(&record)).await
    }

    pub async fn update<T>(&self, record: T) -> Result<()>
    where
        T: Record + Send + 'static,
    {
        self.run(move |store| store.update(&record)).await
    }

    pub async fn get<T>(&self, identifier: impl Into<String>) -> Result<T>
    where
        T: Record + Send + 'static,
    {
        let identifier = identifier.into();
        self.run(move |store| store.get::<T>(&identifier)).await
    }

    pub async fn get_all<T>(&self) -> Result<Vec<T>>
    where
        T: Record + Send + 'static,
    {
        self.run(|store| store.get_all::<T>()).await
    }

    pub async fn filter<T, P>(&self, predicate: P) -> Result<Vec<T>>
    where
        T: Record + Send + 'static,
        P: Fn(&T) -> bool + Send + 'static,
    {
        self.run(move |store| store.filter(predicate)).await
    }

    pub async fn exists_id<T>(&self, identifier: impl Into<String>) -> Result<bool>
    where
        T: Record + 'static,
    {
        let identifier = identifier.into();
        self.run(move |store| Ok(store.exists_id::<T>(&identifier)))
            .await
    }

    pub async fn exists_collection<T>(&self) -> Result<bool>
    where
        T: Record + 'static,
    {
        self.run(|store| Ok(store.exists_collection::<T>())).await
    }

    pub async fn delete_id<T>(&self, identifier: impl Into<String>) -> Result<()>
    where
        T: Record + 'static,
    {
        let identifier = identifier.into();
        self.run(move |store| store.delete_id::<T>(&identifier)).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.run(|store| store.clear()).await
    }
}
