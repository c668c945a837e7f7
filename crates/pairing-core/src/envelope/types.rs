//! Envelope wire types
//!
//! Wire layout (first byte is always the type):
//! - type 0: `0x00 || json`
//! - type 1: `0x01 || sender_public_key(32) || iv(12) || ciphertext || tag(16)`
//! - type 2: `0x02 || iv(12) || ciphertext || tag(16)`

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;

use crate::crypto::{IV_LENGTH, KEY_LENGTH, TAG_LENGTH};
use crate::error::{CoreError, Result};

/// Envelope type, carried in the first byte of every serialized envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EnvelopeType {
    /// Unencrypted JSON body
    Type0 = 0,
    /// Encrypted under a key derived from the sender's public key
    Type1 = 1,
    /// Encrypted under the symmetric key registered for the topic
    Type2 = 2,
}

impl EnvelopeType {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Type0),
            1 => Some(Self::Type1),
            2 => Some(Self::Type2),
            _ => None,
        }
    }
}

/// Text encoding applied to serialized envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Base64,
    Base64Url,
    Base16,
}

impl Encoding {
    pub fn encode(self, bytes: &[u8]) -> String {
        match self {
            Self::Base64 => STANDARD.encode(bytes),
            Self::Base64Url => URL_SAFE_NO_PAD.encode(bytes),
            Self::Base16 => hex::encode(bytes),
        }
    }

    pub fn decode(self, encoded: &str) -> Result<Vec<u8>> {
        let decoded = match self {
            Self::Base64 => STANDARD.decode(encoded).map_err(|e| e.to_string()),
            Self::Base64Url => URL_SAFE_NO_PAD.decode(encoded).map_err(|e| e.to_string()),
            Self::Base16 => hex::decode(encoded).map_err(|e| e.to_string()),
        };
        decoded.map_err(|e| CoreError::InvalidEnvelope(format!("{:?} decode error: {}", self, e)))
    }
}

/// Options for [`crate::envelope::EnvelopeCodec::encode`]
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    /// Force an envelope type; inferred from the keys when absent
    pub envelope_type: Option<EnvelopeType>,
    /// Local public key (type 1)
    pub sender_public_key: Option<String>,
    /// Peer public key (type 1)
    pub receiver_public_key: Option<String>,
    pub encoding: Encoding,
}

impl EncodeOptions {
    /// Options for a type 1 envelope from `sender` to `receiver`
    pub fn type1(sender_public_key: &str, receiver_public_key: &str) -> Self {
        Self {
            envelope_type: Some(EnvelopeType::Type1),
            sender_public_key: Some(sender_public_key.to_string()),
            receiver_public_key: Some(receiver_public_key.to_string()),
            encoding: Encoding::default(),
        }
    }

    /// Options for an unencrypted type 0 envelope
    pub fn type0() -> Self {
        Self {
            envelope_type: Some(EnvelopeType::Type0),
            ..Self::default()
        }
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// The envelope type this call will produce
    pub(crate) fn resolve_type(&self) -> Result<EnvelopeType> {
        let has_keys = self.sender_public_key.is_some() && self.receiver_public_key.is_some();

        match self.envelope_type {
            Some(EnvelopeType::Type1) if !has_keys => Err(CoreError::InvalidEnvelope(
                "type 1 envelopes require sender and receiver public keys".to_string(),
            )),
            Some(envelope_type) => Ok(envelope_type),
            None if has_keys => Ok(EnvelopeType::Type1),
            None => Ok(EnvelopeType::Type2),
        }
    }
}

/// Options for [`crate::envelope::EnvelopeCodec::decode`]
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Local public key a type 1 envelope was addressed to
    pub receiver_public_key: Option<String>,
    pub encoding: Encoding,
}

impl DecodeOptions {
    pub fn with_receiver(receiver_public_key: &str) -> Self {
        Self {
            receiver_public_key: Some(receiver_public_key.to_string()),
            encoding: Encoding::default(),
        }
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }
}

/// Parsed envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    Type0 {
        message: Vec<u8>,
    },
    Type1 {
        sender_public_key: [u8; KEY_LENGTH],
        /// `iv || ciphertext || tag`
        sealed: Vec<u8>,
    },
    Type2 {
        /// `iv || ciphertext || tag`
        sealed: Vec<u8>,
    },
}

impl Envelope {
    pub fn envelope_type(&self) -> EnvelopeType {
        match self {
            Self::Type0 { .. } => EnvelopeType::Type0,
            Self::Type1 { .. } => EnvelopeType::Type1,
            Self::Type2 { .. } => EnvelopeType::Type2,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![self.envelope_type().as_byte()];
        match self {
            Self::Type0 { message } => out.extend_from_slice(message),
            Self::Type1 {
                sender_public_key,
                sealed,
            } => {
                out.extend_from_slice(sender_public_key);
                out.extend_from_slice(sealed);
            }
            Self::Type2 { sealed } => out.extend_from_slice(sealed),
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (&type_byte, body) = bytes
            .split_first()
            .ok_or_else(|| CoreError::InvalidEnvelope("empty envelope".to_string()))?;

        let envelope_type = EnvelopeType::from_byte(type_byte).ok_or_else(|| {
            CoreError::InvalidEnvelope(format!("unsupported envelope type {}", type_byte))
        })?;

        let min_sealed = IV_LENGTH + TAG_LENGTH;
        match envelope_type {
            EnvelopeType::Type0 => Ok(Self::Type0 {
                message: body.to_vec(),
            }),
            EnvelopeType::Type1 => {
                if body.len() < KEY_LENGTH + min_sealed {
                    return Err(CoreError::InvalidEnvelope(format!(
                        "type 1 envelope too short: {} bytes",
                        bytes.len()
                    )));
                }
                let (key, sealed) = body.split_at(KEY_LENGTH);
                let mut sender_public_key = [0u8; KEY_LENGTH];
                sender_public_key.copy_from_slice(key);
                Ok(Self::Type1 {
                    sender_public_key,
                    sealed: sealed.to_vec(),
                })
            }
            EnvelopeType::Type2 => {
                if body.len() < min_sealed {
                    return Err(CoreError::InvalidEnvelope(format!(
                        "type 2 envelope too short: {} bytes",
                        bytes.len()
                    )));
                }
                Ok(Self::Type2 {
                    sealed: body.to_vec(),
                })
            }
        }
    }
}
