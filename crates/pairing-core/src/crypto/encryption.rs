//! AES-256-GCM authenticated encryption
//!
//! Two serialized forms are supported:
//! - text: `{iv_hex}:{auth_tag_hex}:{ciphertext_hex}` (vault files)
//! - sealed bytes: `iv || ciphertext || auth_tag` (envelope bodies)
//!
//! IV is 12 bytes (96 bits), auth tag 16 bytes (128 bits).

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;

use super::SymKey;
use crate::error::{CoreError, Result};

pub const IV_LENGTH: usize = 12;
pub const TAG_LENGTH: usize = 16;

/// Encrypted data with IV and auth tag
#[derive(Debug, Clone)]
pub struct EncryptedData {
    /// Initialization vector (12 bytes for GCM)
    pub iv: [u8; IV_LENGTH],
    /// Authentication tag (16 bytes)
    pub auth_tag: [u8; TAG_LENGTH],
    /// Encrypted ciphertext
    pub ciphertext: Vec<u8>,
}

impl std::fmt::Display for EncryptedData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            hex::encode(self.iv),
            hex::encode(self.auth_tag),
            hex::encode(&self.ciphertext)
        )
    }
}

impl EncryptedData {
    /// Parse from the format: `{iv_hex}:{auth_tag_hex}:{ciphertext_hex}`
    pub fn from_string(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err(CoreError::EncryptionError(
                "Invalid encrypted data format: expected iv:tag:ciphertext".to_string(),
            ));
        }

        let iv_bytes = hex::decode(parts[0])
            .map_err(|e| CoreError::EncryptionError(format!("Invalid IV hex: {}", e)))?;
        let auth_tag_bytes = hex::decode(parts[1])
            .map_err(|e| CoreError::EncryptionError(format!("Invalid auth tag hex: {}", e)))?;
        let ciphertext = hex::decode(parts[2])
            .map_err(|e| CoreError::EncryptionError(format!("Invalid ciphertext hex: {}", e)))?;

        let iv: [u8; IV_LENGTH] = iv_bytes.as_slice().try_into().map_err(|_| {
            CoreError::EncryptionError(format!(
                "Invalid IV length: expected {}, got {}",
                IV_LENGTH,
                iv_bytes.len()
            ))
        })?;
        let auth_tag: [u8; TAG_LENGTH] = auth_tag_bytes.as_slice().try_into().map_err(|_| {
            CoreError::EncryptionError(format!(
                "Invalid auth tag length: expected {}, got {}",
                TAG_LENGTH,
                auth_tag_bytes.len()
            ))
        })?;

        Ok(Self {
            iv,
            auth_tag,
            ciphertext,
        })
    }

    /// Sealed byte layout: `iv || ciphertext || auth_tag`
    pub fn to_sealed_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(IV_LENGTH + self.ciphertext.len() + TAG_LENGTH);
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.auth_tag);
        out
    }

    /// Parse the sealed byte layout produced by [`EncryptedData::to_sealed_bytes`]
    pub fn from_sealed_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < IV_LENGTH + TAG_LENGTH {
            return Err(CoreError::EncryptionError(format!(
                "Sealed data too short: {} bytes",
                bytes.len()
            )));
        }

        let tag_start = bytes.len() - TAG_LENGTH;
        let mut iv = [0u8; IV_LENGTH];
        iv.copy_from_slice(&bytes[..IV_LENGTH]);
        let mut auth_tag = [0u8; TAG_LENGTH];
        auth_tag.copy_from_slice(&bytes[tag_start..]);

        Ok(Self {
            iv,
            auth_tag,
            ciphertext: bytes[IV_LENGTH..tag_start].to_vec(),
        })
    }
}

/// Encrypt plaintext using AES-256-GCM with a random IV
pub fn encrypt(plaintext: &[u8], key: &SymKey) -> Result<EncryptedData> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CoreError::EncryptionError(e.to_string()))?;

    let mut iv = [0u8; IV_LENGTH];
    rand::thread_rng().fill_bytes(&mut iv);
    let nonce = Nonce::from_slice(&iv);

    // aes-gcm appends the auth tag to the ciphertext
    let ciphertext_with_tag = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CoreError::EncryptionError(e.to_string()))?;

    if ciphertext_with_tag.len() < TAG_LENGTH {
        return Err(CoreError::EncryptionError(
            "Ciphertext too short".to_string(),
        ));
    }

    let tag_start = ciphertext_with_tag.len() - TAG_LENGTH;
    let ciphertext = ciphertext_with_tag[..tag_start].to_vec();
    let mut auth_tag = [0u8; TAG_LENGTH];
    auth_tag.copy_from_slice(&ciphertext_with_tag[tag_start..]);

    Ok(EncryptedData {
        iv,
        auth_tag,
        ciphertext,
    })
}

/// Decrypt ciphertext using AES-256-GCM
///
/// Fails when the tag does not authenticate (wrong key or tampered bytes).
pub fn decrypt(encrypted: &EncryptedData, key: &SymKey) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CoreError::EncryptionError(e.to_string()))?;

    let nonce = Nonce::from_slice(&encrypted.iv);

    let mut ciphertext_with_tag = encrypted.ciphertext.clone();
    ciphertext_with_tag.extend_from_slice(&encrypted.auth_tag);

    cipher
        .decrypt(nonce, ciphertext_with_tag.as_slice())
        .map_err(|_| CoreError::EncryptionError("authentication failed".to_string()))
}

/// Encrypt a byte string into the text format
pub fn encrypt_to_string(plaintext: &[u8], key: &SymKey) -> Result<String> {
    Ok(encrypt(plaintext, key)?.to_string())
}

/// Decrypt the text format back into bytes
pub fn decrypt_from_string(encrypted_str: &str, key: &SymKey) -> Result<Vec<u8>> {
    let encrypted = EncryptedData::from_string(encrypted_str)?;
    decrypt(&encrypted, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = SymKey::generate();
        let plaintext = b"Hello, World!";

        let encrypted = encrypt(plaintext, &key).unwrap();
        let decrypted = decrypt(&encrypted, &key).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_string_format_roundtrip() {
        let key = SymKey::generate();

        let encrypted = encrypt_to_string(b"seed-material", &key).unwrap();
        assert_eq!(encrypted.split(':').count(), 3);

        let decrypted = decrypt_from_string(&encrypted, &key).unwrap();
        assert_eq!(decrypted, b"seed-material");
    }

    #[test]
    fn test_sealed_bytes_layout() {
        let key = SymKey::generate();
        let encrypted = encrypt(b"abc", &key).unwrap();

        let sealed = encrypted.to_sealed_bytes();
        assert_eq!(sealed.len(), IV_LENGTH + 3 + TAG_LENGTH);
        assert_eq!(&sealed[..IV_LENGTH], &encrypted.iv);

        let parsed = EncryptedData::from_sealed_bytes(&sealed).unwrap();
        assert_eq!(decrypt(&parsed, &key).unwrap(), b"abc");
    }

    #[test]
    fn test_sealed_bytes_too_short() {
        assert!(EncryptedData::from_sealed_bytes(&[0u8; 27]).is_err());
    }

    #[test]
    fn test_different_ivs_produce_different_ciphertext() {
        let key = SymKey::generate();
        let plaintext = b"same plaintext";

        let encrypted1 = encrypt(plaintext, &key).unwrap();
        let encrypted2 = encrypt(plaintext, &key).unwrap();

        assert_ne!(encrypted1.iv, encrypted2.iv);
        assert_ne!(encrypted1.ciphertext, encrypted2.ciphertext);
    }

    #[test]
    fn test_wrong_key_fails_decryption() {
        let encrypted = encrypt(b"secret data", &SymKey::generate()).unwrap();
        assert!(decrypt(&encrypted, &SymKey::generate()).is_err());
    }

    #[test]
    fn test_tampered_auth_tag_fails_decryption() {
        let key = SymKey::generate();
        let mut encrypted = encrypt(b"secret data", &key).unwrap();
        encrypted.auth_tag[0] ^= 0xFF;

        assert!(decrypt(&encrypted, &key).is_err());
    }

    #[test]
    fn test_invalid_format_parsing() {
        assert!(EncryptedData::from_string("invalid").is_err());
        assert!(EncryptedData::from_string("a:b").is_err());
        assert!(EncryptedData::from_string("a:b:c:d").is_err());
        assert!(EncryptedData::from_string("not_hex:not_hex:not_hex").is_err());
    }
}
