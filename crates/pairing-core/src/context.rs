//! Core context
//!
//! One explicit handle per client, built from settings and the collaborators
//! the host provides, and passed by reference to protocol code.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::envelope::EnvelopeCodec;
use crate::error::Result;
use crate::heartbeat::Heartbeat;
use crate::keys::KeyManager;
use crate::settings::CoreSettings;
use crate::storage::{DurableStorage, EVENTS_STORAGE_CONTEXT};
use crate::store::{KeyedStore, StoreKey, StoreRecord, StoreValue};
use crate::telemetry::{ReqwestSender, TelemetryBuffer, TelemetrySender};
use crate::vault::SecretVault;

/// Core context
pub struct CoreContext {
    settings: CoreSettings,
    storage: Arc<dyn DurableStorage>,
    heartbeat: Heartbeat,
    /// Key manager
    pub keys: Arc<KeyManager>,
    /// Envelope codec over [`Self::keys`]
    pub codec: EnvelopeCodec,
    /// Telemetry ledger
    pub telemetry: Arc<TelemetryBuffer>,
    running: AtomicBool,
}

impl CoreContext {
    /// Create a context; nothing touches the collaborators until [`Self::init`]
    pub fn new(
        settings: CoreSettings,
        vault: Arc<dyn SecretVault>,
        storage: Arc<dyn DurableStorage>,
        sender: Arc<dyn TelemetrySender>,
    ) -> Self {
        let keys = Arc::new(KeyManager::new(vault));
        let codec = EnvelopeCodec::new(keys.clone());
        let telemetry = Arc::new(TelemetryBuffer::new(
            settings.telemetry.clone(),
            settings.storage_key(EVENTS_STORAGE_CONTEXT),
            storage.clone(),
            sender,
        ));
        let heartbeat = Heartbeat::new(settings.telemetry.heartbeat_interval());

        Self {
            settings,
            storage,
            heartbeat,
            keys,
            codec,
            telemetry,
            running: AtomicBool::new(false),
        }
    }

    /// Create a context that submits telemetry over HTTP
    pub fn with_http_telemetry(
        settings: CoreSettings,
        vault: Arc<dyn SecretVault>,
        storage: Arc<dyn DurableStorage>,
    ) -> Result<Self> {
        let sender = Arc::new(ReqwestSender::new()?);
        Ok(Self::new(settings, vault, storage, sender))
    }

    pub fn settings(&self) -> &CoreSettings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Initialize the key manager and start telemetry; repeated calls are no-ops
    pub async fn init(&self) -> Result<()> {
        if self.is_running() {
            debug!("Core context already initialized");
            return Ok(());
        }

        self.keys.init().await?;
        self.telemetry.start(&self.heartbeat).await;
        self.running.store(true, Ordering::Release);

        info!("Core context initialized");
        Ok(())
    }

    /// Stop the heartbeat and write out pending telemetry
    pub async fn shutdown(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }

        self.telemetry.stop();
        self.telemetry.persist().await;

        info!("Core context shut down");
    }

    /// Uninitialized store named `name`, keyed by `key_fn`
    pub fn keyed_store<K, V>(
        &self,
        name: &str,
        key_fn: impl Fn(&V) -> K + Send + Sync + 'static,
    ) -> KeyedStore<K, V>
    where
        K: StoreKey,
        V: StoreValue,
    {
        KeyedStore::new(
            self.storage.clone(),
            name,
            self.settings.storage_key(name),
            key_fn,
        )
    }

    /// Uninitialized store of typed protocol records
    pub fn record_store<K, V>(&self, name: &str) -> KeyedStore<K, V>
    where
        K: StoreKey,
        V: StoreValue + StoreRecord<Key = K>,
    {
        KeyedStore::for_records(self.storage.clone(), name, self.settings.storage_key(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SymKey;
    use crate::envelope::{DecodeOptions, EncodeOptions};
    use crate::error::ErrorKind;
    use crate::storage::MemoryStorage;
    use crate::store::{
        PairingRecord, ProposalRecord, SessionRecord, PAIRING_STORE_NAME, PROPOSAL_STORE_NAME,
        SESSION_STORE_NAME,
    };
    use crate::telemetry::{EventProperties, SendResponse};
    use crate::vault::MemoryVault;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct AcceptingSender;

    #[async_trait]
    impl TelemetrySender for AcceptingSender {
        async fn send(&self, _url: &str, _body: &Value) -> Result<SendResponse> {
            Ok(SendResponse { ok: true, status: 200 })
        }
    }

    fn context(vault: &MemoryVault, storage: &MemoryStorage, settings: CoreSettings) -> CoreContext {
        CoreContext::new(
            settings,
            Arc::new(vault.clone()),
            Arc::new(storage.clone()),
            Arc::new(AcceptingSender),
        )
    }

    #[tokio::test]
    async fn test_init_and_shutdown() {
        let storage = MemoryStorage::new();
        let ctx = context(&MemoryVault::new(), &storage, CoreSettings::default());

        let err = ctx.keys.generate_key_pair().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInitialized);

        ctx.init().await.unwrap();
        ctx.init().await.unwrap();
        assert!(ctx.is_running());

        ctx.telemetry
            .create_event("pair", "", EventProperties::for_topic("t"));
        ctx.shutdown().await;
        assert!(!ctx.is_running());

        let ledger = storage.get_item("wc@2:core:0.3//events").await.unwrap().unwrap();
        assert_eq!(ledger.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_codec_shares_key_manager() {
        let ctx = context(&MemoryVault::new(), &MemoryStorage::new(), CoreSettings::default());
        ctx.init().await.unwrap();

        let topic = ctx.keys.set_sym_key(&SymKey::generate(), None).await.unwrap();
        let encoded = ctx
            .codec
            .encode(topic.as_str(), &json!({"method": "wc_pairingPing"}), &EncodeOptions::default())
            .await
            .unwrap();
        let decoded: Value = ctx
            .codec
            .decode(topic.as_str(), &encoded, &DecodeOptions::default())
            .await
            .unwrap();
        assert_eq!(decoded["method"], "wc_pairingPing");

        ctx.shutdown().await;
    }

    #[tokio::test]
    async fn test_stores_survive_restart() {
        let vault = MemoryVault::new();
        let storage = MemoryStorage::new();
        let settings = CoreSettings {
            custom_scope_id: "app-a".to_string(),
            ..CoreSettings::default()
        };

        let pairing: PairingRecord = serde_json::from_value(json!({
            "topic": "p1",
            "expiry": 100,
            "active": false
        }))
        .unwrap();

        {
            let ctx = context(&vault, &storage, settings.clone());
            ctx.init().await.unwrap();
            let pairings = ctx.record_store::<String, PairingRecord>(PAIRING_STORE_NAME);
            pairings.init().await.unwrap();
            pairings.set("p1".to_string(), pairing.clone()).await.unwrap();
            ctx.shutdown().await;
        }

        assert!(storage
            .get_item("wc@2:core:0.3app-a//pairing")
            .await
            .unwrap()
            .is_some());

        let ctx = context(&vault, &storage, settings);
        ctx.init().await.unwrap();
        let pairings = ctx.record_store::<String, PairingRecord>(PAIRING_STORE_NAME);
        pairings.init().await.unwrap();
        assert_eq!(pairings.get(&"p1".to_string()).await.unwrap(), pairing);

        let sessions = ctx.record_store::<String, SessionRecord>(SESSION_STORE_NAME);
        sessions.init().await.unwrap();
        assert!(sessions.is_empty().await.unwrap());
        assert_eq!(sessions.storage_key(), "wc@2:core:0.3app-a//session");

        let proposals = ctx.record_store::<u64, ProposalRecord>(PROPOSAL_STORE_NAME);
        proposals.init().await.unwrap();
        assert_eq!(proposals.storage_key(), "wc@2:core:0.3app-a//proposal");

        let requests = ctx.keyed_store("request", |v: &Value| v["id"].to_string());
        requests.init().await.unwrap();
        requests.set("1".to_string(), json!({"id": 1})).await.unwrap();
        assert!(storage
            .get_item("wc@2:core:0.3app-a//request")
            .await
            .unwrap()
            .is_some());

        ctx.shutdown().await;
    }
}
