//! Secure memory handling with automatic zeroization

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CoreError, Result};

/// 256-bit symmetric key - automatically zeroed when dropped
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymKey {
    key: [u8; 32],
}

impl SymKey {
    /// Create a key from raw bytes
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Generate a fresh random key
    pub fn generate() -> Self {
        use rand::RngCore;

        let mut key = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self { key }
    }

    /// Get the key bytes (use carefully - avoid copying)
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    /// Create from a slice (must be exactly 32 bytes)
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() != 32 {
            return None;
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(slice);
        Some(Self { key })
    }

    /// Parse a hex-encoded key
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| CoreError::InvalidKey(format!("Invalid key hex: {}", e)))?;
        Self::from_slice(&bytes).ok_or_else(|| {
            CoreError::InvalidKey(format!(
                "Invalid key length: expected 32, got {}",
                bytes.len()
            ))
        })
    }

    /// Hex encoding of the key, for handing to the caller that minted it
    pub fn to_hex(&self) -> String {
        hex::encode(self.key)
    }
}

impl Clone for SymKey {
    fn clone(&self) -> Self {
        Self { key: self.key }
    }
}

impl std::fmt::Debug for SymKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sym_key_from_slice() {
        let bytes = [42u8; 32];
        let key = SymKey::from_slice(&bytes).unwrap();
        assert_eq!(key.as_bytes(), &bytes);
    }

    #[test]
    fn test_sym_key_from_invalid_slice() {
        let bytes = [42u8; 16];
        assert!(SymKey::from_slice(&bytes).is_none());
    }

    #[test]
    fn test_hex_roundtrip() {
        let key = SymKey::generate();
        let parsed = SymKey::from_hex(&key.to_hex()).unwrap();
        assert_eq!(key.as_bytes(), parsed.as_bytes());
        assert!(SymKey::from_hex("abcd").is_err());
    }

    #[test]
    fn test_debug_redacted() {
        let key = SymKey::new([7u8; 32]);
        let debug = format!("{:?}", key);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains('7'));
    }
}
