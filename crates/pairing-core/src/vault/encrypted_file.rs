//! Encrypted file vault backend
//!
//! Fallback for machines without a usable keychain. Secrets are kept in a
//! single JSON file in the data directory; each entry is individually
//! encrypted with AES-256-GCM under a master key derived from a password.

use async_trait::async_trait;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::SecretVault;
use crate::crypto::{
    decrypt_from_string, derive_key, encrypt_to_string, generate_salt, KeyDerivationParams,
    SymKey,
};
use crate::error::{CoreError, Result};

/// Known plaintext used to check a password
const VERIFICATION_PLAINTEXT: &[u8] = b"pairing-core-vault-verification";

/// Encrypted file vault
pub struct EncryptedFileVault {
    /// Directory for vault files
    storage_dir: PathBuf,
    /// In-memory copy of the encrypted entries
    cache: Arc<RwLock<VaultCache>>,
    /// Master key (if unlocked)
    master_key: Arc<RwLock<Option<SymKey>>>,
    /// Argon2 parameters
    params: KeyDerivationParams,
}

#[derive(Debug, Default)]
struct VaultCache {
    /// Map of tag -> encrypted value
    entries: HashMap<String, String>,
}

/// File format for persistent storage
#[derive(Debug, Serialize, Deserialize)]
struct VaultFile {
    version: u32,
    entries: HashMap<String, String>,
}

impl EncryptedFileVault {
    /// Create a vault in the default data directory
    pub fn new() -> Result<Self> {
        let storage_dir = Self::default_dir()?;
        Self::with_dir(storage_dir)
    }

    /// Create with a custom directory
    pub fn with_dir(storage_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&storage_dir)?;
        debug!("Encrypted file vault at: {:?}", storage_dir);

        Ok(Self {
            storage_dir,
            cache: Arc::new(RwLock::new(VaultCache::default())),
            master_key: Arc::new(RwLock::new(None)),
            params: KeyDerivationParams::default(),
        })
    }

    /// Override the Argon2 parameters
    pub fn with_params(mut self, params: KeyDerivationParams) -> Self {
        self.params = params;
        self
    }

    fn default_dir() -> Result<PathBuf> {
        ProjectDirs::from("com", "symbia-labs", "pairing-core")
            .map(|dirs| dirs.data_dir().join("vault"))
            .ok_or_else(|| {
                CoreError::StorageError("Could not determine data directory".to_string())
            })
    }

    fn vault_file_path(&self) -> PathBuf {
        self.storage_dir.join("vault.json")
    }

    fn salt_file_path(&self) -> PathBuf {
        self.storage_dir.join("salt")
    }

    fn verification_file_path(&self) -> PathBuf {
        self.storage_dir.join("verify")
    }

    /// Whether a password has been set up for this directory
    pub fn is_provisioned(&self) -> bool {
        self.salt_file_path().exists() && self.verification_file_path().exists()
    }

    /// Derive the master key from `password`
    ///
    /// The first unlock of a fresh directory provisions it with a new salt;
    /// later unlocks check the password against the verification file.
    pub async fn unlock(&self, password: &str) -> Result<()> {
        if !self.is_provisioned() {
            let salt = generate_salt();
            let key = derive_key(password, &salt, Some(self.params.clone()))?;
            let verification = encrypt_to_string(VERIFICATION_PLAINTEXT, &key)?;

            tokio::fs::write(self.salt_file_path(), &salt).await?;
            tokio::fs::write(self.verification_file_path(), &verification).await?;

            *self.master_key.write().await = Some(key);
            debug!("Provisioned new vault");
            return Ok(());
        }

        let salt = tokio::fs::read_to_string(self.salt_file_path()).await?;
        let key = derive_key(password, salt.trim(), Some(self.params.clone()))?;

        let verification = tokio::fs::read_to_string(self.verification_file_path()).await?;
        match decrypt_from_string(verification.trim(), &key) {
            Ok(plaintext) if plaintext == VERIFICATION_PLAINTEXT => {
                *self.master_key.write().await = Some(key);
                debug!("Vault unlocked");
                Ok(())
            }
            _ => Err(CoreError::InvalidPassword),
        }
    }

    /// Drop the master key from memory
    pub async fn lock(&self) {
        *self.master_key.write().await = None;
    }

    pub async fn is_unlocked(&self) -> bool {
        self.master_key.read().await.is_some()
    }

    /// Load entries from disk
    async fn load(&self) -> Result<()> {
        let path = self.vault_file_path();

        if !path.exists() {
            debug!("No existing vault file found");
            return Ok(());
        }

        let contents = tokio::fs::read_to_string(&path).await?;
        let file: VaultFile = serde_json::from_str(&contents)?;

        let mut cache = self.cache.write().await;
        cache.entries = file.entries;

        debug!("Loaded {} vault entries", cache.entries.len());
        Ok(())
    }

    /// Write `entries` to disk; the cache is replaced only after this succeeds
    async fn save(&self, entries: &HashMap<String, String>) -> Result<()> {
        let file = VaultFile {
            version: 1,
            entries: entries.clone(),
        };

        let contents = serde_json::to_string_pretty(&file)?;
        let path = self.vault_file_path();

        // Write atomically using a temp file
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl SecretVault for EncryptedFileVault {
    async fn init(&self) -> Result<()> {
        if !self.is_unlocked().await {
            return Err(CoreError::VaultLocked);
        }
        self.load().await
    }

    async fn get(&self, tag: &str) -> Result<Option<Vec<u8>>> {
        let master_key = self.master_key.read().await;
        let key = master_key.as_ref().ok_or(CoreError::VaultLocked)?;

        let cache = self.cache.read().await;
        match cache.entries.get(tag) {
            Some(encrypted) => Ok(Some(decrypt_from_string(encrypted, key)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, tag: &str, secret: &[u8]) -> Result<()> {
        let encrypted = {
            let master_key = self.master_key.read().await;
            let key = master_key.as_ref().ok_or(CoreError::VaultLocked)?;
            encrypt_to_string(secret, key)?
        };

        let mut cache = self.cache.write().await;
        let mut entries = cache.entries.clone();
        entries.insert(tag.to_string(), encrypted);
        self.save(&entries).await?;
        cache.entries = entries;

        debug!("Stored secret: {}", tag);
        Ok(())
    }

    async fn del(&self, tag: &str) -> Result<()> {
        let mut cache = self.cache.write().await;

        if !cache.entries.contains_key(tag) {
            return Ok(());
        }

        let mut entries = cache.entries.clone();
        entries.remove(tag);
        self.save(&entries).await?;
        cache.entries = entries;

        debug!("Deleted secret: {}", tag);
        Ok(())
    }

    async fn has(&self, tag: &str) -> Result<bool> {
        Ok(self.cache.read().await.entries.contains_key(tag))
    }

    fn is_hardware_backed(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "Encrypted File Vault"
    }
}
