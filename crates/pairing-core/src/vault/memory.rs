//! Process-local vault
//!
//! Secrets live only as long as the process. Used by tests and by clients
//! that deliberately do not keep keys across restarts.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use zeroize::Zeroizing;

use super::SecretVault;
use crate::error::Result;

/// In-memory secret vault
#[derive(Clone, Default)]
pub struct MemoryVault {
    entries: Arc<RwLock<HashMap<String, Zeroizing<Vec<u8>>>>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored secrets
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SecretVault for MemoryVault {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn get(&self, tag: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.read().await;
        Ok(entries.get(tag).map(|secret| secret.to_vec()))
    }

    async fn set(&self, tag: &str, secret: &[u8]) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(tag.to_string(), Zeroizing::new(secret.to_vec()));
        Ok(())
    }

    async fn del(&self, tag: &str) -> Result<()> {
        self.entries.write().await.remove(tag);
        Ok(())
    }

    async fn has(&self, tag: &str) -> Result<bool> {
        Ok(self.entries.read().await.contains_key(tag))
    }

    fn is_hardware_backed(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "In-Memory Vault"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_del() {
        let vault = MemoryVault::new();

        vault.set("tag", b"secret").await.unwrap();
        assert_eq!(vault.get("tag").await.unwrap(), Some(b"secret".to_vec()));
        assert!(vault.has("tag").await.unwrap());

        vault.del("tag").await.unwrap();
        assert_eq!(vault.get("tag").await.unwrap(), None);

        // deleting twice is fine
        vault.del("tag").await.unwrap();
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let vault = MemoryVault::new();

        vault.set("tag", b"one").await.unwrap();
        vault.set("tag", b"two").await.unwrap();

        assert_eq!(vault.get("tag").await.unwrap(), Some(b"two".to_vec()));
        assert_eq!(vault.len().await, 1);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let vault = MemoryVault::new();
        let other = vault.clone();

        vault.set("tag", b"shared").await.unwrap();
        assert!(other.has("tag").await.unwrap());
    }
}
