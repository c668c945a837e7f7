//! Envelope encoder/decoder
//!
//! Seals payloads into typed envelopes before they cross the transport and
//! opens them on the way back. Key material is looked up through the
//! [`KeyManager`] for each call and never retained.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

use super::types::{DecodeOptions, EncodeOptions, Encoding, Envelope, EnvelopeType};
use crate::crypto::{
    decode_public_key, decrypt, encrypt, is_canonical_public_key, EncryptedData, SymKey,
};
use crate::error::{CoreError, ErrorKind, Result};
use crate::keys::KeyManager;

/// Envelope codec
pub struct EnvelopeCodec {
    keys: Arc<KeyManager>,
}

impl EnvelopeCodec {
    pub fn new(keys: Arc<KeyManager>) -> Self {
        Self { keys }
    }

    /// Serialize `payload` to JSON and wrap it in an envelope
    ///
    /// Type 2 (the default) encrypts under the key registered for `topic`.
    /// Type 1 first derives the shared key between the sender and receiver
    /// public keys and encrypts under that. Type 0 is sent in the clear.
    pub async fn encode<T: Serialize + ?Sized>(
        &self,
        topic: &str,
        payload: &T,
        opts: &EncodeOptions,
    ) -> Result<String> {
        let envelope_type = opts.resolve_type()?;
        let message = serde_json::to_vec(payload)?;

        let envelope = match envelope_type {
            EnvelopeType::Type0 => Envelope::Type0 { message },
            EnvelopeType::Type1 => {
                let (sender, receiver) = match (&opts.sender_public_key, &opts.receiver_public_key) {
                    (Some(sender), Some(receiver)) => (sender, receiver),
                    _ => {
                        return Err(CoreError::InvalidEnvelope(
                            "type 1 envelopes require sender and receiver public keys".to_string(),
                        ))
                    }
                };
                let sender_public_key = decode_public_key(sender)?;
                let shared_topic = self.keys.generate_shared_key(sender, receiver, None).await?;
                let key = self.keys.get_sym_key(shared_topic.as_str()).await?;

                Envelope::Type1 {
                    sender_public_key,
                    sealed: encrypt(&message, &key)?.to_sealed_bytes(),
                }
            }
            EnvelopeType::Type2 => {
                let key = self.keys.get_sym_key(topic).await?;
                Envelope::Type2 {
                    sealed: encrypt(&message, &key)?.to_sealed_bytes(),
                }
            }
        };

        debug!("Encoded {:?} envelope on topic {}", envelope_type, topic);
        Ok(opts.encoding.encode(&envelope.to_bytes()))
    }

    /// Open an envelope and deserialize its JSON payload
    ///
    /// Anything that cannot be authenticated or parsed fails with
    /// `DecryptionFailed`; a missing key fails with `NoMatchingKey`.
    pub async fn decode<T: DeserializeOwned>(
        &self,
        topic: &str,
        encoded: &str,
        opts: &DecodeOptions,
    ) -> Result<T> {
        let bytes = opts.encoding.decode(encoded)?;

        let result = self.open(topic, &bytes, opts).await;
        if let Err(CoreError::DecryptionFailed { reason, .. }) = &result {
            let client_id = self
                .keys
                .existing_client_id()
                .await
                .unwrap_or_else(|| "unknown".to_string());
            error!(topic, client_id = %client_id, reason = %reason, "Failed to decode envelope");
        }
        result
    }

    async fn open<T: DeserializeOwned>(
        &self,
        topic: &str,
        bytes: &[u8],
        opts: &DecodeOptions,
    ) -> Result<T> {
        let envelope =
            Envelope::from_bytes(bytes).map_err(|e| CoreError::decryption(topic, e.to_string()))?;

        let message = match envelope {
            Envelope::Type0 { message } => message,
            Envelope::Type1 {
                sender_public_key,
                sealed,
            } => {
                let receiver = opts.receiver_public_key.as_deref().ok_or_else(|| {
                    CoreError::decryption(topic, "type 1 envelope without a receiver public key")
                })?;
                if !is_canonical_public_key(&sender_public_key) {
                    return Err(CoreError::decryption(topic, "non-canonical sender public key"));
                }
                // roles are swapped relative to encode: we are the receiver
                let key = self
                    .keys
                    .derive_shared_key(receiver, &hex::encode(sender_public_key))
                    .await
                    .map_err(|e| match e.kind() {
                        ErrorKind::Crypto => CoreError::decryption(topic, e.to_string()),
                        _ => e,
                    })?;
                open_sealed(topic, &sealed, &key)?
            }
            Envelope::Type2 { sealed } => {
                if opts.receiver_public_key.is_some() {
                    return Err(CoreError::decryption(
                        topic,
                        "expected a type 1 envelope for the given receiver",
                    ));
                }
                let key = self.keys.get_sym_key(topic).await?;
                open_sealed(topic, &sealed, &key)?
            }
        };

        serde_json::from_slice(&message)
            .map_err(|e| CoreError::decryption(topic, format!("payload is not valid JSON: {}", e)))
    }

    /// Envelope type of an encoded message, without decrypting it
    pub fn get_payload_type(encoded: &str, encoding: Encoding) -> Result<EnvelopeType> {
        let bytes = encoding.decode(encoded)?;
        let first = bytes
            .first()
            .copied()
            .ok_or_else(|| CoreError::InvalidEnvelope("empty envelope".to_string()))?;
        EnvelopeType::from_byte(first)
            .ok_or_else(|| CoreError::InvalidEnvelope(format!("unsupported envelope type {}", first)))
    }

    /// Sender public key (hex) of a type 1 message; `None` for other types
    pub fn get_payload_sender_public_key(encoded: &str, encoding: Encoding) -> Result<Option<String>> {
        let bytes = encoding.decode(encoded)?;
        match Envelope::from_bytes(&bytes)? {
            Envelope::Type1 {
                sender_public_key, ..
            } => Ok(Some(hex::encode(sender_public_key))),
            _ => Ok(None),
        }
    }
}

fn open_sealed(topic: &str, sealed: &[u8], key: &SymKey) -> Result<Vec<u8>> {
    let encrypted =
        EncryptedData::from_sealed_bytes(sealed).map_err(|e| CoreError::decryption(topic, e.to_string()))?;
    decrypt(&encrypted, key).map_err(|e| CoreError::decryption(topic, e.to_string()))
}
