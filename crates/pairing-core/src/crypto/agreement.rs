//! X25519 key agreement

use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::error::{CoreError, Result};

/// Size of an X25519 public or private key in bytes
pub const KEY_LENGTH: usize = 32;

/// Freshly generated X25519 key pair, private half zeroized on drop
pub struct AgreementKeyPair {
    pub public_key: [u8; KEY_LENGTH],
    pub private_key: Zeroizing<[u8; KEY_LENGTH]>,
}

impl std::fmt::Debug for AgreementKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgreementKeyPair")
            .field("public_key", &hex::encode(self.public_key))
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Generate a new X25519 key pair
pub fn generate_key_pair() -> AgreementKeyPair {
    let secret = StaticSecret::random_from_rng(OsRng);
    let public = PublicKey::from(&secret);

    AgreementKeyPair {
        public_key: public.to_bytes(),
        private_key: Zeroizing::new(secret.to_bytes()),
    }
}

/// Raw Diffie-Hellman shared secret between a local private key and a peer public key
pub fn shared_secret(private_key: &[u8], peer_public_key: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
    let private: [u8; KEY_LENGTH] = private_key.try_into().map_err(|_| {
        CoreError::InvalidKey(format!(
            "Invalid private key length: expected {}, got {}",
            KEY_LENGTH,
            private_key.len()
        ))
    })?;
    let peer: [u8; KEY_LENGTH] = peer_public_key.try_into().map_err(|_| {
        CoreError::InvalidKey(format!(
            "Invalid public key length: expected {}, got {}",
            KEY_LENGTH,
            peer_public_key.len()
        ))
    })?;

    let secret = StaticSecret::from(private);
    let shared = secret.diffie_hellman(&PublicKey::from(peer));
    Ok(Zeroizing::new(shared.to_bytes()))
}

/// Decode a hex public key, checking its length
pub fn decode_public_key(hex_key: &str) -> Result<[u8; KEY_LENGTH]> {
    let mut out = [0u8; KEY_LENGTH];
    hex::decode_to_slice(hex_key, &mut out)
        .map_err(|e| CoreError::InvalidKey(format!("Invalid public key hex: {}", e)))?;
    Ok(out)
}

/// Whether `public_key` is the canonical encoding of a curve coordinate
///
/// X25519 ignores the top bit and reduces values above the field prime, so a
/// non-canonical key agrees on the same secret as some canonical one.
/// Generated keys are always canonical.
pub fn is_canonical_public_key(public_key: &[u8; KEY_LENGTH]) -> bool {
    if public_key[KEY_LENGTH - 1] & 0x80 != 0 {
        return false;
    }
    // reject p = 2^255 - 19 and above: ed ff .. ff 7f little-endian
    let at_least_prime = public_key[0] >= 0xed
        && public_key[1..KEY_LENGTH - 1].iter().all(|&b| b == 0xff)
        && public_key[KEY_LENGTH - 1] == 0x7f;
    !at_least_prime
}
