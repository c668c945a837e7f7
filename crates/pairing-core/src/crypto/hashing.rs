//! SHA-256 helpers for topics and message ids

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Hex SHA-256 of raw key bytes; this is the topic of a symmetric key
pub fn hash_key(key: &[u8]) -> String {
    hex::encode(Sha256::digest(key))
}

/// Hex SHA-256 of a UTF-8 message
pub fn hash_message(message: &str) -> String {
    hex::encode(Sha256::digest(message.as_bytes()))
}

/// 32 random bytes, hex encoded
pub fn generate_random_bytes32() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_key_known_vector() {
        // sha256 of the empty input
        assert_eq!(
            hash_key(&[]),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_hash_message_matches_hash_key_of_bytes() {
        assert_eq!(hash_message("abc"), hash_key(b"abc"));
        assert_eq!(
            hash_message("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_random_bytes32() {
        let a = generate_random_bytes32();
        assert_eq!(a.len(), 64);
        assert_ne!(a, generate_random_bytes32());
    }
}
