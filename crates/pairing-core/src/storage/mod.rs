//! Durable storage for protocol state
//!
//! Backends implement [`DurableStorage`]; keys follow the stable scheme
//! produced by [`storage_key`].

mod file;
mod memory;
mod traits;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use traits::{DurableStorage, DurableStorageExt};

/// Default prefix for core storage keys
pub const CORE_STORAGE_PREFIX: &str = "wc@2:core:";

/// Default storage layout version
pub const STORAGE_VERSION: &str = "0.3";

/// Storage name of the telemetry ledger
pub const EVENTS_STORAGE_CONTEXT: &str = "events";

/// Build a storage key: `<prefix><version><scope>//<name>`
///
/// Persisted data only survives upgrades while this stays stable.
pub fn storage_key(prefix: &str, version: &str, scope: &str, name: &str) -> String {
    format!("{}{}{}//{}", prefix, version, scope, name)
}
