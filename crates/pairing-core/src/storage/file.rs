//! JSON file storage backend
//!
//! All items live in one JSON object on disk. Every mutation rewrites the
//! file atomically; memory only changes once the write has succeeded.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

use super::DurableStorage;
use crate::error::Result;

/// File format for persistent storage
#[derive(Debug, Default, Serialize, Deserialize)]
struct StorageFile {
    version: u32,
    items: BTreeMap<String, Value>,
}

pub struct FileStorage {
    path: PathBuf,
    items: RwLock<BTreeMap<String, Value>>,
}

impl FileStorage {
    /// Open (or create) the storage file at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let items = if path.exists() {
            let contents = tokio::fs::read_to_string(&path).await?;
            let file: StorageFile = serde_json::from_str(&contents)?;
            debug!("Loaded {} storage items from {:?}", file.items.len(), path);
            file.items
        } else {
            debug!("No existing storage file at {:?}", path);
            BTreeMap::new()
        };

        Ok(Self {
            path,
            items: RwLock::new(items),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn save(&self, items: &BTreeMap<String, Value>) -> Result<()> {
        let file = StorageFile {
            version: 1,
            items: items.clone(),
        };
        let contents = serde_json::to_string_pretty(&file)?;

        // Write atomically using a temp file
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl DurableStorage for FileStorage {
    async fn get_item(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: Value) -> Result<()> {
        let mut items = self.items.write().await;
        let mut updated = items.clone();
        updated.insert(key.to_string(), value);
        self.save(&updated).await?;
        *items = updated;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.write().await;
        if !items.contains_key(key) {
            return Ok(());
        }
        let mut updated = items.clone();
        updated.remove(key);
        self.save(&updated).await?;
        *items = updated;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items.read().await.keys().cloned().collect())
    }
}
