//! Key management
//!
//! Key pairs, shared-key derivation, topic registration and client identity.

mod identity;
mod manager;
mod types;

pub use identity::{decode_did_key, decode_jwt, encode_did_key, sign_jwt};
pub use manager::{KeyManager, CLIENT_SEED_TAG};
pub use types::{TokenClaims, Topic};
