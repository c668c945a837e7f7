//! Key derivation
//!
//! - Argon2id: vault master key from a password
//! - HKDF-SHA256: symmetric key from a raw Diffie-Hellman shared secret

use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Algorithm, Argon2, Params, Version,
};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use sha2::Sha256;

use super::SymKey;
use crate::error::{CoreError, Result};

/// Parameters for Argon2id key derivation
#[derive(Debug, Clone)]
pub struct KeyDerivationParams {
    /// Memory cost in KiB (default: 65536 = 64MB)
    pub memory_cost: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KeyDerivationParams {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64 MB
            time_cost: 3,
            parallelism: 4,
        }
    }
}

/// Generate a cryptographically secure random salt
pub fn generate_salt() -> String {
    SaltString::generate(&mut OsRng).to_string()
}

/// Derive a 256-bit vault master key from a password using Argon2id
pub fn derive_key(
    password: &str,
    salt: &str,
    params: Option<KeyDerivationParams>,
) -> Result<SymKey> {
    let params = params.unwrap_or_default();

    let argon2_params = Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(32),
    )
    .map_err(|e| CoreError::KeyDerivationError(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let salt = SaltString::from_b64(salt)
        .map_err(|e| CoreError::KeyDerivationError(format!("Invalid salt: {}", e)))?;

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CoreError::KeyDerivationError(e.to_string()))?;

    let hash = password_hash
        .hash
        .ok_or_else(|| CoreError::KeyDerivationError("No hash output".to_string()))?;

    SymKey::from_slice(&hash.as_bytes()[..32.min(hash.as_bytes().len())])
        .ok_or_else(|| CoreError::KeyDerivationError("Hash output too short".to_string()))
}

/// Expand a raw shared secret into a symmetric key (HKDF-SHA256, no salt, empty info)
pub fn derive_sym_key(shared_secret: &[u8]) -> Result<SymKey> {
    let hkdf = Hkdf::<Sha256>::new(None, shared_secret);
    let mut okm = [0u8; 32];
    hkdf.expand(&[], &mut okm)
        .map_err(|e| CoreError::KeyDerivationError(format!("HKDF expand failed: {}", e)))?;
    Ok(SymKey::new(okm))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> Option<KeyDerivationParams> {
        Some(KeyDerivationParams {
            memory_cost: 8192,
            time_cost: 1,
            parallelism: 1,
        })
    }

    #[test]
    fn test_generate_salt() {
        let salt1 = generate_salt();
        let salt2 = generate_salt();

        assert_ne!(salt1, salt2);
        assert!(!salt1.is_empty());
    }

    #[test]
    fn test_derive_key_deterministic() {
        let salt = generate_salt();

        let key1 = derive_key("test-password-123", &salt, fast_params()).unwrap();
        let key2 = derive_key("test-password-123", &salt, fast_params()).unwrap();

        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_derive_key_different_passwords() {
        let salt = generate_salt();

        let key1 = derive_key("password1", &salt, fast_params()).unwrap();
        let key2 = derive_key("password2", &salt, fast_params()).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_derive_key_invalid_salt() {
        assert!(derive_key("pw", "!!not base64!!", fast_params()).is_err());
    }

    #[test]
    fn test_derive_sym_key_deterministic() {
        let secret = [9u8; 32];
        let a = derive_sym_key(&secret).unwrap();
        let b = derive_sym_key(&secret).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());

        // HKDF output must not simply echo the input
        assert_ne!(a.as_bytes(), &secret);
        assert_ne!(derive_sym_key(&[8u8; 32]).unwrap().as_bytes(), a.as_bytes());
    }
}
