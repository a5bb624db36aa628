//! Chunk writers

use crate::database::CreditStore;
use crate::error::{Error, Result};
use crate::item::ItemWriter;
use crate::types::CustomerCredit;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Saves customers through the store's transactional upsert
#[derive(Debug, Clone)]
pub struct RepositoryItemWriter {
    store: CreditStore,
}

impl RepositoryItemWriter {
    /// Create a writer over a store
    pub fn new(store: CreditStore) -> Self {
        Self { store }
    }

    /// Underlying store
    pub fn store(&self) -> &CreditStore {
        &self.store
    }
}

#[async_trait]
impl ItemWriter<CustomerCredit> for RepositoryItemWriter {
    async fn write(&self, items: &[CustomerCredit]) -> Result<()> {
        // Only transaction conflicts come back retryable
        self.store.save_all(items).await?;
        tracing::debug!(count = items.len(), "Wrote chunk");
        Ok(())
    }
}

/// Collects written items in memory
#[derive(Debug)]
pub struct ListItemWriter<T> {
    items: Arc<Mutex<Vec<T>>>,
}

impl<T> Default for ListItemWriter<T> {
    fn default() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T> Clone for ListItemWriter<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T: Clone> ListItemWriter<T> {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far
    pub fn written(&self) -> Vec<T> {
        self.items
            .lock()
            .map(|items| items.clone())
            .unwrap_or_default()
    }

    /// Number of written items
    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    /// Check if nothing was written
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<T: Clone + Send + Sync> ItemWriter<T> for ListItemWriter<T> {
    async fn write(&self, items: &[T]) -> Result<()> {
        let mut guard = self
            .items
            .lock()
            .map_err(|_| Error::write("list writer lock poisoned"))?;
        guard.extend_from_slice(items);
        Ok(())
    }
}
