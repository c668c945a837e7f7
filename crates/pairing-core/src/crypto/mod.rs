//! Cryptographic primitives
//!
//! This module provides:
//! - AES-256-GCM authenticated encryption
//! - X25519 key agreement with HKDF-SHA256 symmetric key derivation
//! - Argon2id key derivation from passwords (file vault)
//! - SHA-256 topic hashing
//! - Secure memory handling with zeroize

mod agreement;
mod encryption;
mod hashing;
mod key_derivation;
mod secure_memory;

pub use agreement::{
    decode_public_key, generate_key_pair, is_canonical_public_key, shared_secret,
    AgreementKeyPair, KEY_LENGTH,
};
pub use encryption::{
    decrypt, decrypt_from_string, encrypt, encrypt_to_string, EncryptedData, IV_LENGTH,
    TAG_LENGTH,
};
pub use hashing::{generate_random_bytes32, hash_key, hash_message};
pub use key_derivation::{derive_key, derive_sym_key, generate_salt, KeyDerivationParams};
pub use secure_memory::SymKey;
