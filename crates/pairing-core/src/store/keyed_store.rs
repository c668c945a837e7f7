//! Persisted, restorable map of protocol records
//!
//! Each store mirrors its whole map into one [`DurableStorage`] entry as a
//! JSON array. The map is read from storage once, at `init`; afterwards every
//! mutation rewrites the entry, and the in-memory map only changes once that
//! write has succeeded.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::recently_deleted::RecentlyDeleted;
use super::records::StoreRecord;
use crate::error::{CoreError, Result};
use crate::storage::DurableStorage;

/// Requirements on a store key
pub trait StoreKey: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static {}

impl<T> StoreKey for T where T: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static {}

/// Requirements on a stored value
pub trait StoreValue: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

impl<T> StoreValue for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Extracts the key of a restored value
pub type KeyFn<K, V> = Arc<dyn Fn(&V) -> K + Send + Sync>;

struct StoreState<K, V> {
    initialized: bool,
    records: IndexMap<K, V>,
    recently_deleted: RecentlyDeleted<K>,
}

/// Keyed store
pub struct KeyedStore<K, V> {
    name: String,
    storage_key: String,
    storage: Arc<dyn DurableStorage>,
    key_fn: KeyFn<K, V>,
    state: RwLock<StoreState<K, V>>,
}

impl<K: StoreKey, V: StoreValue> KeyedStore<K, V> {
    /// Create a store named `name`, persisted under `storage_key`
    ///
    /// `key_fn` extracts the key of each record restored from storage.
    pub fn new(
        storage: Arc<dyn DurableStorage>,
        name: impl Into<String>,
        storage_key: impl Into<String>,
        key_fn: impl Fn(&V) -> K + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            storage_key: storage_key.into(),
            storage,
            key_fn: Arc::new(key_fn),
            state: RwLock::new(StoreState {
                initialized: false,
                records: IndexMap::new(),
                recently_deleted: RecentlyDeleted::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Restore persisted records
    ///
    /// Fails with `RestoreWillOverride` if the store already holds records;
    /// an initialized but empty store is left as is.
    pub async fn init(&self) -> Result<()> {
        let mut state = self.state.write().await;

        if !state.records.is_empty() {
            return Err(CoreError::RestoreWillOverride(self.name.clone()));
        }
        if state.initialized {
            return Ok(());
        }

        if let Some(persisted) = self.storage.get_item(&self.storage_key).await? {
            let values: Vec<V> = serde_json::from_value(persisted)?;
            for value in values {
                state.records.insert((self.key_fn)(&value), value);
            }
        }

        state.initialized = true;
        info!("Restored {} records into store {}", state.records.len(), self.name);
        Ok(())
    }

    /// Insert `value` under `key`, or merge it into the existing record
    pub async fn set(&self, key: K, value: V) -> Result<()> {
        let mut state = self.state.write().await;
        self.ensure_initialized(&state)?;

        let mut records = state.records.clone();
        let existed = match records.get(&key) {
            Some(current) => {
                let merged = merge(current, serde_json::to_value(&value)?)?;
                records.insert(key.clone(), merged);
                true
            }
            None => {
                records.insert(key.clone(), value);
                false
            }
        };

        self.persist(&records).await?;
        state.records = records;

        if existed {
            debug!("Updated {} in store {}", key, self.name);
        } else {
            debug!("Inserted {} into store {}", key, self.name);
        }
        Ok(())
    }

    pub async fn get(&self, key: &K) -> Result<V> {
        let state = self.state.read().await;
        self.ensure_initialized(&state)?;
        self.lookup(&state, key).cloned()
    }

    /// All records, or those whose fields equal every field of `filter`
    ///
    /// `filter` is matched only when it is a JSON object.
    pub async fn get_all(&self, filter: Option<&Value>) -> Result<Vec<V>> {
        let state = self.state.read().await;
        self.ensure_initialized(&state)?;

        let fields = match filter.and_then(Value::as_object) {
            Some(fields) => fields,
            None => return Ok(state.records.values().cloned().collect()),
        };

        let mut matching = Vec::new();
        for value in state.records.values() {
            let json = serde_json::to_value(value)?;
            if fields.iter().all(|(field, expected)| json.get(field) == Some(expected)) {
                matching.push(value.clone());
            }
        }
        Ok(matching)
    }

    /// Shallow-merge `partial` (a JSON object) into the record under `key`
    pub async fn update(&self, key: &K, partial: Value) -> Result<V> {
        let mut state = self.state.write().await;
        self.ensure_initialized(&state)?;

        let merged = merge(self.lookup(&state, key)?, partial)?;
        let mut records = state.records.clone();
        records.insert(key.clone(), merged.clone());

        self.persist(&records).await?;
        state.records = records;

        debug!("Updated {} in store {}", key, self.name);
        Ok(merged)
    }

    /// Remove the record under `key`; absent keys are ignored
    pub async fn delete(&self, key: &K, reason: &str) -> Result<()> {
        let mut state = self.state.write().await;
        self.ensure_initialized(&state)?;

        if !state.records.contains_key(key) {
            return Ok(());
        }
        let mut records = state.records.clone();
        records.shift_remove(key);

        self.persist(&records).await?;
        state.records = records;
        state.recently_deleted.push(key.clone());

        info!("Deleted {} from store {}: {}", key, self.name, reason);
        Ok(())
    }

    pub async fn keys(&self) -> Result<Vec<K>> {
        let state = self.state.read().await;
        self.ensure_initialized(&state)?;
        Ok(state.records.keys().cloned().collect())
    }

    pub async fn len(&self) -> Result<usize> {
        let state = self.state.read().await;
        self.ensure_initialized(&state)?;
        Ok(state.records.len())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    fn ensure_initialized(&self, state: &StoreState<K, V>) -> Result<()> {
        if state.initialized {
            Ok(())
        } else {
            Err(CoreError::NotInitialized("KeyedStore"))
        }
    }

    fn lookup<'a>(&self, state: &'a StoreState<K, V>, key: &K) -> Result<&'a V> {
        match state.records.get(key) {
            Some(value) => Ok(value),
            None if state.recently_deleted.contains(key) => Err(CoreError::RecentlyDeleted(
                format!("{} in store {}", key, self.name),
            )),
            None => Err(CoreError::NoMatchingKey(format!("{} in store {}", key, self.name))),
        }
    }

    /// Write `records` to storage; called with the write guard held, before
    /// the in-memory map is replaced
    async fn persist(&self, records: &IndexMap<K, V>) -> Result<()> {
        let values = records.values().collect::<Vec<_>>();
        self.storage
            .set_item(&self.storage_key, serde_json::to_value(values)?)
            .await
    }
}

impl<K: StoreKey, V: StoreValue + StoreRecord<Key = K>> KeyedStore<K, V> {
    /// Create a store keyed by [`StoreRecord::record_key`]
    pub fn for_records(
        storage: Arc<dyn DurableStorage>,
        name: impl Into<String>,
        storage_key: impl Into<String>,
    ) -> Self {
        Self::new(storage, name, storage_key, |record: &V| record.record_key())
    }
}

fn merge<V: StoreValue>(current: &V, partial: Value) -> Result<V> {
    let merged = match (serde_json::to_value(current)?, partial) {
        (Value::Object(mut target), Value::Object(fields)) => {
            target.extend(fields);
            Value::Object(target)
        }
        (_, replacement) => replacement,
    };
    Ok(serde_json::from_value(merged)?)
}
