// in-process store, used by tests and embedding callers
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::store::{CollectionPath, Document, InventoryStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes `record` as the body of document `id` in `path`.
    pub async fn put<T: Serialize>(&self, path: &CollectionPath, id: &str, record: &T) -> Result<(), StoreError> {
        let body = serde_json::to_value(record)
            .map_err(|e| StoreError::Decode { path: path.to_string(), message: e.to_string() })?;
        self.put_raw(path, Document::new(id, body)).await;
        Ok(())
    }

    pub async fn put_raw(&self, path: &CollectionPath, doc: Document) {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(path.to_string()).or_default();
        docs.retain(|d| d.id != doc.id);
        docs.push(doc);
    }

    /// While offline every fetch fails with `Unreachable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn fetch(&self, path: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable("memory store is offline".to_string()));
        }
        let collections = self.collections.read().await;
        Ok(collections.get(&path.to_string()).cloned().unwrap_or_default())
    }
}
