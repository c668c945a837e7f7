//! # pairing-core
//!
//! Session-security and durable-state core for a wallet pairing client:
//! - X25519 key agreement, topic registration and `did:key` client identity
//! - AES-256-GCM envelopes in three wire types
//! - Persisted keyed record stores with single-restore semantics
//! - Telemetry ledger with heartbeat-driven persistence and batched delivery
//!
//! Secrets live in a [`SecretVault`] (OS keychain, encrypted file or memory);
//! protocol state lives in a [`DurableStorage`].

pub mod context;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod heartbeat;
pub mod keys;
pub mod settings;
pub mod storage;
pub mod store;
pub mod telemetry;
pub mod vault;

pub use context::CoreContext;
pub use crypto::{hash_key, hash_message, SymKey};
pub use envelope::{DecodeOptions, EncodeOptions, Encoding, EnvelopeCodec, EnvelopeType};
pub use error::{CoreError, ErrorKind, Result};
pub use heartbeat::{Heartbeat, HeartbeatHandle};
pub use keys::{KeyManager, TokenClaims, Topic};
pub use settings::{CoreSettings, SettingsManager, TelemetrySettings};
pub use storage::{DurableStorage, DurableStorageExt, FileStorage, MemoryStorage};
pub use store::{KeyedStore, PairingRecord, ProposalRecord, SessionRecord, StoreRecord};
pub use telemetry::{
    EventHandle, EventLookup, EventProperties, ReqwestSender, TelemetryBuffer, TelemetryEvent,
    TelemetrySender,
};
pub use vault::{EncryptedFileVault, KeychainVault, MemoryVault, SecretVault};
