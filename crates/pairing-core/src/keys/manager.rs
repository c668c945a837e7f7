//! Key manager
//!
//! Mints X25519 key pairs, derives shared symmetric keys, registers symmetric
//! keys under their topic, and owns the Ed25519 client identity. Secret
//! material always round-trips through the [`SecretVault`]; nothing is cached
//! here.

use ed25519_dalek::SigningKey;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::identity::{decode_jwt, encode_did_key, sign_jwt};
use super::types::{TokenClaims, Topic};
use crate::crypto::{
    decode_public_key, derive_sym_key, generate_key_pair, generate_random_bytes32, hash_key,
    shared_secret, SymKey,
};
use crate::error::{CoreError, Result};
use crate::vault::SecretVault;

/// Vault tag of the identity seed
pub const CLIENT_SEED_TAG: &str = "client_ed25519_seed";

/// Key manager
pub struct KeyManager {
    /// Vault holding every secret this manager mints
    vault: Arc<dyn SecretVault>,
    initialized: AtomicBool,
    /// Token subject, fixed for the life of this process
    session_subject: String,
}

impl KeyManager {
    /// Create a new key manager over `vault`
    pub fn new(vault: Arc<dyn SecretVault>) -> Self {
        Self {
            vault,
            initialized: AtomicBool::new(false),
            session_subject: generate_random_bytes32(),
        }
    }

    /// Initialize the underlying vault; repeated calls are no-ops
    pub async fn init(&self) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }

        self.vault.init().await?;
        self.initialized.store(true, Ordering::Release);

        info!("Key manager initialized ({})", self.vault.backend_name());
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(CoreError::NotInitialized("KeyManager"))
        }
    }

    /// Check whether the vault holds an entry for `tag` (public key or topic)
    pub async fn has_keys(&self, tag: &str) -> Result<bool> {
        self.ensure_initialized()?;
        self.vault.has(tag).await
    }

    /// Generate an X25519 key pair, store the private half under the public
    /// half, and return the public key (hex)
    pub async fn generate_key_pair(&self) -> Result<String> {
        self.ensure_initialized()?;

        let key_pair = generate_key_pair();
        let public_key = hex::encode(key_pair.public_key);
        self.vault.set(&public_key, &key_pair.private_key[..]).await?;

        debug!("Generated key pair {}", public_key);
        Ok(public_key)
    }

    /// Derive the symmetric key shared between a local key pair and a peer,
    /// register it, and return its topic
    pub async fn generate_shared_key(
        &self,
        self_public_key: &str,
        peer_public_key: &str,
        override_topic: Option<&str>,
    ) -> Result<Topic> {
        let sym_key = self.derive_shared_key(self_public_key, peer_public_key).await?;
        self.set_sym_key(&sym_key, override_topic).await
    }

    /// Shared symmetric key between a local key pair and a peer, without
    /// registering it
    pub(crate) async fn derive_shared_key(
        &self,
        self_public_key: &str,
        peer_public_key: &str,
    ) -> Result<SymKey> {
        self.ensure_initialized()?;

        let private_key = self.get_private_key(self_public_key).await?;
        let peer = decode_public_key(peer_public_key)?;

        let shared = shared_secret(&private_key, &peer)?;
        derive_sym_key(&shared[..])
    }

    /// Store `sym_key` under `override_topic`, or under the hash of the key
    ///
    /// Registering the same key twice yields the same topic and overwrites
    /// the vault entry.
    pub async fn set_sym_key(&self, sym_key: &SymKey, override_topic: Option<&str>) -> Result<Topic> {
        self.ensure_initialized()?;

        let topic = match override_topic {
            Some(topic) => Topic::new(topic),
            None => Topic::new(hash_key(sym_key.as_bytes())),
        };
        self.vault.set(topic.as_str(), sym_key.as_bytes()).await?;

        debug!("Registered symmetric key for topic {}", topic);
        Ok(topic)
    }

    /// Remove the private key stored for `public_key`
    pub async fn delete_key_pair(&self, public_key: &str) -> Result<()> {
        self.ensure_initialized()?;
        self.vault.del(public_key).await
    }

    /// Remove the symmetric key stored for `topic`
    pub async fn delete_sym_key(&self, topic: &str) -> Result<()> {
        self.ensure_initialized()?;
        self.vault.del(topic).await
    }

    /// Stable client identifier (`did:key`) derived from the persisted seed
    pub async fn get_client_id(&self) -> Result<String> {
        let identity = self.identity_key().await?;
        Ok(encode_did_key(&identity.verifying_key()))
    }

    /// Sign a relay authentication token for `audience`, valid for `ttl`
    pub async fn sign_token(&self, audience: &str, ttl: Duration) -> Result<String> {
        let identity = self.identity_key().await?;

        let iat = chrono::Utc::now().timestamp();
        let exp = i64::try_from(ttl.as_secs())
            .ok()
            .and_then(|ttl| iat.checked_add(ttl))
            .ok_or_else(|| CoreError::InvalidKey(format!("Token lifetime {:?} is out of range", ttl)))?;

        let claims = TokenClaims {
            iss: encode_did_key(&identity.verifying_key()),
            sub: self.session_subject.clone(),
            aud: audience.to_string(),
            iat,
            exp,
        };

        sign_jwt(&identity, &claims)
    }

    /// Verify a token issued by any client and return its claims
    pub fn decode_token(&self, token: &str) -> Result<TokenClaims> {
        decode_jwt(token)
    }

    /// Look up the symmetric key registered for `topic`
    pub(crate) async fn get_sym_key(&self, topic: &str) -> Result<SymKey> {
        self.ensure_initialized()?;

        let bytes = Zeroizing::new(
            self.vault
                .get(topic)
                .await?
                .ok_or_else(|| CoreError::NoMatchingKey(format!("symmetric key for topic {}", topic)))?,
        );

        SymKey::from_slice(&bytes).ok_or_else(|| {
            CoreError::InvalidKey(format!("Stored key for topic {} is not 32 bytes", topic))
        })
    }

    async fn get_private_key(&self, public_key: &str) -> Result<Zeroizing<Vec<u8>>> {
        self.vault
            .get(public_key)
            .await?
            .map(Zeroizing::new)
            .ok_or_else(|| CoreError::NoMatchingKey(format!("private key for {}", public_key)))
    }

    /// Client id if the identity seed already exists; never creates the seed
    pub(crate) async fn existing_client_id(&self) -> Option<String> {
        if !self.is_initialized() {
            return None;
        }

        let seed = Zeroizing::new(self.vault.get(CLIENT_SEED_TAG).await.ok()??);
        let identity = signing_key_from_seed(&seed).ok()?;
        Some(encode_did_key(&identity.verifying_key()))
    }

    /// Ed25519 identity derived from the seed, creating the seed on first use
    async fn identity_key(&self) -> Result<SigningKey> {
        self.ensure_initialized()?;

        let seed = match self.vault.get(CLIENT_SEED_TAG).await? {
            Some(seed) => Zeroizing::new(seed),
            None => {
                let seed = SymKey::generate();
                self.vault.set(CLIENT_SEED_TAG, seed.as_bytes()).await?;
                info!("Created new client identity seed");
                Zeroizing::new(seed.as_bytes().to_vec())
            }
        };

        signing_key_from_seed(&seed)
    }
}

fn signing_key_from_seed(seed: &[u8]) -> Result<SigningKey> {
    let seed: Zeroizing<[u8; 32]> = Zeroizing::new(
        seed.try_into()
            .map_err(|_| CoreError::InvalidKey("Client seed is not 32 bytes".to_string()))?,
    );
    Ok(SigningKey::from_bytes(&seed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::vault::MemoryVault;

    async fn test_manager() -> (KeyManager, MemoryVault) {
        let vault = MemoryVault::new();
        let manager = KeyManager::new(Arc::new(vault.clone()));
        manager.init().await.unwrap();
        (manager, vault)
    }

    #[tokio::test]
    async fn test_operations_require_init() {
        let manager = KeyManager::new(Arc::new(MemoryVault::new()));

        let err = manager.generate_key_pair().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInitialized);

        let err = manager.set_sym_key(&SymKey::generate(), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInitialized);
    }

    #[tokio::test]
    async fn test_generate_key_pair_stores_private_half() {
        let (manager, vault) = test_manager().await;

        let public_key = manager.generate_key_pair().await.unwrap();
        assert_eq!(public_key.len(), 64);

        let private_key = vault.get(&public_key).await.unwrap().unwrap();
        assert_eq!(private_key.len(), 32);
        assert_ne!(hex::encode(&private_key), public_key);
    }

    #[tokio::test]
    async fn test_set_sym_key_topic_is_hash() {
        let (manager, _) = test_manager().await;
        let key = SymKey::generate();

        let first = manager.set_sym_key(&key, None).await.unwrap();
        let second = manager.set_sym_key(&key, None).await.unwrap();

        assert_eq!(first.as_str(), hash_key(key.as_bytes()));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_set_sym_key_override_topic() {
        let (manager, _) = test_manager().await;
        let key = SymKey::generate();

        let topic = manager.set_sym_key(&key, Some("pairing-topic")).await.unwrap();
        assert_eq!(topic.as_str(), "pairing-topic");

        let stored = manager.get_sym_key("pairing-topic").await.unwrap();
        assert_eq!(stored.as_bytes(), key.as_bytes());
    }

    #[tokio::test]
    async fn test_shared_key_agreement() {
        let (manager, _) = test_manager().await;

        let a = manager.generate_key_pair().await.unwrap();
        let b = manager.generate_key_pair().await.unwrap();

        let topic_ab = manager.generate_shared_key(&a, &b, None).await.unwrap();
        let topic_ba = manager.generate_shared_key(&b, &a, None).await.unwrap();

        assert_eq!(topic_ab, topic_ba);
        assert!(manager.has_keys(topic_ab.as_str()).await.unwrap());
    }

    #[tokio::test]
    async fn test_shared_key_agreement_across_vaults() {
        let (alice, _) = test_manager().await;
        let (bob, _) = test_manager().await;

        let a = alice.generate_key_pair().await.unwrap();
        let b = bob.generate_key_pair().await.unwrap();

        let topic_a = alice.generate_shared_key(&a, &b, None).await.unwrap();
        let topic_b = bob.generate_shared_key(&b, &a, None).await.unwrap();
        assert_eq!(topic_a, topic_b);
    }

    #[tokio::test]
    async fn test_shared_key_without_private_key() {
        let (manager, _) = test_manager().await;
        let peer = manager.generate_key_pair().await.unwrap();
        let unknown = hex::encode([5u8; 32]);

        let err = manager
            .generate_shared_key(&unknown, &peer, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoMatchingKey);
    }

    #[tokio::test]
    async fn test_delete_keys() {
        let (manager, _) = test_manager().await;

        let public_key = manager.generate_key_pair().await.unwrap();
        manager.delete_key_pair(&public_key).await.unwrap();
        assert!(!manager.has_keys(&public_key).await.unwrap());

        let topic = manager.set_sym_key(&SymKey::generate(), None).await.unwrap();
        manager.delete_sym_key(topic.as_str()).await.unwrap();
        let err = manager.get_sym_key(topic.as_str()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoMatchingKey);

        // deleting absent entries is a no-op
        manager.delete_sym_key(topic.as_str()).await.unwrap();
        manager.delete_key_pair(&public_key).await.unwrap();
    }

    #[tokio::test]
    async fn test_client_id_stable_across_restarts() {
        let vault = MemoryVault::new();

        let first = KeyManager::new(Arc::new(vault.clone()));
        first.init().await.unwrap();
        let id = first.get_client_id().await.unwrap();
        assert!(id.starts_with("did:key:z"));
        assert_eq!(first.get_client_id().await.unwrap(), id);

        let restarted = KeyManager::new(Arc::new(vault));
        restarted.init().await.unwrap();
        assert_eq!(restarted.get_client_id().await.unwrap(), id);
    }

    #[tokio::test]
    async fn test_sign_token() {
        let (manager, _) = test_manager().await;

        let token = manager
            .sign_token("wss://relay.example.com", Duration::from_secs(86400))
            .await
            .unwrap();
        let claims = manager.decode_token(&token).unwrap();

        assert_eq!(claims.iss, manager.get_client_id().await.unwrap());
        assert_eq!(claims.aud, "wss://relay.example.com");
        assert_eq!(claims.exp - claims.iat, 86400);
        assert_eq!(claims.sub.len(), 64);

        // subject is fixed per process
        let again = manager
            .sign_token("wss://relay.example.com", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(manager.decode_token(&again).unwrap().sub, claims.sub);
    }

    #[tokio::test]
    async fn test_sign_token_rejects_out_of_range_lifetime() {
        let (manager, _) = test_manager().await;

        let err = manager
            .sign_token("wss://relay.example.com", Duration::MAX)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Crypto);

        let err = manager
            .sign_token("wss://relay.example.com", Duration::from_secs(i64::MAX as u64))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Crypto);
    }

    #[tokio::test]
    async fn test_existing_client_id_never_creates_seed() {
        let (manager, vault) = test_manager().await;

        assert_eq!(manager.existing_client_id().await, None);
        assert!(!vault.has(CLIENT_SEED_TAG).await.unwrap());

        let id = manager.get_client_id().await.unwrap();
        assert_eq!(manager.existing_client_id().await, Some(id));
    }

    #[tokio::test]
    async fn test_derive_shared_key_does_not_register() {
        let (manager, vault) = test_manager().await;
        let a = manager.generate_key_pair().await.unwrap();
        let b = manager.generate_key_pair().await.unwrap();
        let entries = vault.len().await;

        let key = manager.derive_shared_key(&a, &b).await.unwrap();
        assert_eq!(vault.len().await, entries);

        let topic = manager.generate_shared_key(&b, &a, None).await.unwrap();
        assert_eq!(topic.as_str(), hash_key(key.as_bytes()));
    }
}
