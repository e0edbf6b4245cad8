use crate::features::system_metrics::HealthSample;
use crate::shared::error::StorageError;
use crate::shared::traits::{SampleStore, StoreConnection};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Inner {
    samples: Mutex<Vec<HealthSample>>,
    connects: AtomicUsize,
    releases: AtomicUsize,
    fail_connect: AtomicBool,
    fail_write: AtomicBool,
    fail_read: AtomicBool,
}

/// Process-local sample store. Clones share the same rows.
///
/// Counts opened and released connections and can be told to fail each
/// operation, which makes it the store double for pipeline tests.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<HealthSample> {
        self.inner
            .samples
            .lock()
            .map(|samples| samples.clone())
            .unwrap_or_default()
    }

    pub fn connections_opened(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    pub fn connections_released(&self) -> usize {
        self.inner.releases.load(Ordering::SeqCst)
    }

    pub fn fail_connect(&self, fail: bool) {
        self.inner.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn fail_write(&self, fail: bool) {
        self.inner.fail_write.store(fail, Ordering::SeqCst);
    }

    pub fn fail_read(&self, fail: bool) {
        self.inner.fail_read.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SampleStore for InMemoryStore {
    type Connection = InMemoryConnection;

    async fn connect(&self) -> Result<InMemoryConnection, StorageError> {
        if self.inner.fail_connect.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("store unavailable".to_string()));
        }
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        Ok(InMemoryConnection {
            inner: Arc::clone(&self.inner),
        })
    }
}

pub struct InMemoryConnection {
    inner: Arc<Inner>,
}

#[async_trait]
impl StoreConnection for InMemoryConnection {
    async fn insert(&mut self, sample: &HealthSample) -> Result<(), StorageError> {
        if self.inner.fail_write.load(Ordering::SeqCst) {
            return Err(StorageError::Write("insert rejected".to_string()));
        }
        self.inner
            .samples
            .lock()
            .map_err(|_| StorageError::Write("lock poisoned".into()))?
            .push(sample.clone());
        Ok(())
    }

    async fn query_latest(&mut self) -> Result<Option<HealthSample>, StorageError> {
        if self.inner.fail_read.load(Ordering::SeqCst) {
            return Err(StorageError::Read("query rejected".to_string()));
        }
        let samples = self
            .inner
            .samples
            .lock()
            .map_err(|_| StorageError::Read("lock poisoned".into()))?;

        Ok(samples
            .iter()
            .enumerate()
            .max_by_key(|(position, sample)| (sample.check_time, *position))
            .map(|(_, sample)| sample.clone()))
    }

    async fn close(self) {
        self.inner.releases.fetch_add(1, Ordering::SeqCst);
    }
}
