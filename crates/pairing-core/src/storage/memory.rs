//! In-memory durable storage
//!
//! Clones share the same map, so a test can drop every component built on
//! one handle and rebuild them on another to simulate a process restart.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::DurableStorage;
use crate::error::Result;

#[derive(Clone, Default)]
pub struct MemoryStorage {
    items: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DurableStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: Value) -> Result<()> {
        self.items.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.items.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::DurableStorageExt;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_and_get() {
        let storage = MemoryStorage::new();

        storage.set_item("a", json!([1, 2])).await.unwrap();
        assert_eq!(storage.get_item("a").await.unwrap(), Some(json!([1, 2])));
        assert_eq!(storage.get_item("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_typed_helpers() {
        let storage = MemoryStorage::new();

        storage.set_typed("n", &vec![1u32, 2, 3]).await.unwrap();
        let back: Option<Vec<u32>> = storage.get_typed("n").await.unwrap();
        assert_eq!(back, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_clones_share_items() {
        let storage = MemoryStorage::new();
        let restarted = storage.clone();

        storage.set_item("k", json!("v")).await.unwrap();
        storage.remove_item("missing").await.unwrap();

        assert_eq!(restarted.keys().await.unwrap(), vec!["k".to_string()]);
    }
}
