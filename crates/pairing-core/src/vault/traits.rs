//! Secret vault trait definition

use crate::error::Result;
use async_trait::async_trait;

/// Durable store for raw secret material (private keys, symmetric keys, seeds)
///
/// Entries are keyed by opaque tags. The vault exclusively owns the material;
/// callers fetch it for the duration of one operation and drop it.
#[async_trait]
pub trait SecretVault: Send + Sync {
    /// Prepare the backend (load files, probe the keychain)
    async fn init(&self) -> Result<()>;

    /// Retrieve a secret by tag
    async fn get(&self, tag: &str) -> Result<Option<Vec<u8>>>;

    /// Store a secret, overwriting any previous value under the same tag
    async fn set(&self, tag: &str, secret: &[u8]) -> Result<()>;

    /// Delete a secret; absent tags are not an error
    async fn del(&self, tag: &str) -> Result<()>;

    /// Check if a tag exists
    async fn has(&self, tag: &str) -> Result<bool>;

    /// Check if this backend is hardware-backed
    fn is_hardware_backed(&self) -> bool;

    /// Get a human-readable name for this backend
    fn backend_name(&self) -> &'static str;
}
