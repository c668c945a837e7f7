//! Durable storage trait definition

use crate::error::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Durable key/value storage for JSON-serializable blobs
///
/// Values are opaque to the core; backends decide how they are encoded.
#[async_trait]
pub trait DurableStorage: Send + Sync {
    /// Read a value by key
    async fn get_item(&self, key: &str) -> Result<Option<Value>>;

    /// Write a value, replacing any previous one
    async fn set_item(&self, key: &str, value: Value) -> Result<()>;

    /// Remove a value; absent keys are not an error
    async fn remove_item(&self, key: &str) -> Result<()>;

    /// All keys currently stored
    async fn keys(&self) -> Result<Vec<String>>;
}

/// Typed helpers over [`DurableStorage`]
#[async_trait]
pub trait DurableStorageExt: DurableStorage {
    async fn get_typed<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self.get_item(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn set_typed<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        self.set_item(key, serde_json::to_value(value)?).await
    }
}

impl<S: DurableStorage + ?Sized> DurableStorageExt for S {}
