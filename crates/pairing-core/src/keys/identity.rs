//! Client identity: `did:key` encoding and signed relay tokens
//!
//! The identity key is Ed25519. Its public half is published as a `did:key`
//! (multicodec `0xed01` header, base58btc with the `z` multibase prefix).
//! Tokens are compact JWS strings signed with `EdDSA`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use super::types::TokenClaims;
use crate::error::{CoreError, Result};

const DID_KEY_PREFIX: &str = "did:key:";
const MULTIBASE_BASE58BTC: char = 'z';
const MULTICODEC_ED25519_HEADER: [u8; 2] = [0xed, 0x01];

const JWT_ALG: &str = "EdDSA";
const JWT_TYP: &str = "JWT";

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// Encode an Ed25519 public key as a `did:key`
pub fn encode_did_key(public_key: &VerifyingKey) -> String {
    let mut bytes = Vec::with_capacity(MULTICODEC_ED25519_HEADER.len() + 32);
    bytes.extend_from_slice(&MULTICODEC_ED25519_HEADER);
    bytes.extend_from_slice(public_key.as_bytes());

    format!(
        "{}{}{}",
        DID_KEY_PREFIX,
        MULTIBASE_BASE58BTC,
        bs58::encode(bytes).into_string()
    )
}

/// Decode a `did:key` back into an Ed25519 public key
pub fn decode_did_key(did: &str) -> Result<VerifyingKey> {
    let encoded = did
        .strip_prefix(DID_KEY_PREFIX)
        .and_then(|rest| rest.strip_prefix(MULTIBASE_BASE58BTC))
        .ok_or_else(|| CoreError::InvalidKey(format!("Not a base58btc did:key: {}", did)))?;

    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| CoreError::InvalidKey(format!("Invalid base58: {}", e)))?;

    let key_bytes = bytes
        .strip_prefix(&MULTICODEC_ED25519_HEADER[..])
        .ok_or_else(|| CoreError::InvalidKey("did:key is not an Ed25519 key".to_string()))?;

    let key: [u8; 32] = key_bytes
        .try_into()
        .map_err(|_| CoreError::InvalidKey("Invalid Ed25519 key length".to_string()))?;

    VerifyingKey::from_bytes(&key).map_err(|e| CoreError::InvalidKey(e.to_string()))
}

/// Sign `claims` into a compact JWS
pub fn sign_jwt(signing_key: &SigningKey, claims: &TokenClaims) -> Result<String> {
    let header = TokenHeader {
        alg: JWT_ALG.to_string(),
        typ: JWT_TYP.to_string(),
    };

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?)
    );
    let signature = signing_key.sign(signing_input.as_bytes());

    Ok(format!(
        "{}.{}",
        signing_input,
        URL_SAFE_NO_PAD.encode(signature.to_bytes())
    ))
}

/// Verify a token against its issuer's `did:key` and return the claims
///
/// Expiry is not checked here; that policy belongs to the relying party.
pub fn decode_jwt(token: &str) -> Result<TokenClaims> {
    let malformed = || CoreError::InvalidKey("Token must have three segments".to_string());
    let (signing_input, signature) = token.rsplit_once('.').ok_or_else(malformed)?;
    let (header, payload) = signing_input.split_once('.').ok_or_else(malformed)?;
    if payload.contains('.') {
        return Err(malformed());
    }

    let decode = |segment: &str| {
        URL_SAFE_NO_PAD
            .decode(segment)
            .map_err(|e| CoreError::InvalidKey(format!("Invalid token encoding: {}", e)))
    };

    let header: TokenHeader = serde_json::from_slice(&decode(header)?)?;
    if header.alg != JWT_ALG {
        return Err(CoreError::InvalidKey(format!(
            "Unsupported token algorithm: {}",
            header.alg
        )));
    }

    let claims: TokenClaims = serde_json::from_slice(&decode(payload)?)?;
    let signature = Signature::from_slice(&decode(signature)?)
        .map_err(|e| CoreError::InvalidKey(format!("Invalid signature: {}", e)))?;

    let issuer = decode_did_key(&claims.iss)?;
    issuer
        .verify(signing_input.as_bytes(), &signature)
        .map_err(|_| CoreError::InvalidKey("Token signature does not verify".to_string()))?;

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> SigningKey {
        SigningKey::from_bytes(&[3u8; 32])
    }

    fn claims(iss: String) -> TokenClaims {
        TokenClaims {
            iss,
            sub: "session".to_string(),
            aud: "wss://relay.example.com".to_string(),
            iat: 1_700_000_000,
            exp: 1_700_086_400,
        }
    }

    #[test]
    fn test_did_key_roundtrip() {
        let key = test_key();
        let did = encode_did_key(&key.verifying_key());

        assert!(did.starts_with("did:key:z6Mk"));
        assert_eq!(decode_did_key(&did).unwrap(), key.verifying_key());
    }

    #[test]
    fn test_decode_did_key_rejects_other_methods() {
        assert!(decode_did_key("did:web:example.com").is_err());
        assert!(decode_did_key("did:key:m123").is_err());
    }

    #[test]
    fn test_sign_and_decode_jwt() {
        let key = test_key();
        let claims = claims(encode_did_key(&key.verifying_key()));

        let token = sign_jwt(&key, &claims).unwrap();
        assert_eq!(token.split('.').count(), 3);

        assert_eq!(decode_jwt(&token).unwrap(), claims);
    }

    #[test]
    fn test_tampered_jwt_fails() {
        let key = test_key();
        let token = sign_jwt(&key, &claims(encode_did_key(&key.verifying_key()))).unwrap();

        let mut parts: Vec<String> = token.split('.').map(String::from).collect();
        let mut forged = claims(encode_did_key(&key.verifying_key()));
        forged.aud = "wss://evil.example.com".to_string();
        parts[1] = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());

        assert!(decode_jwt(&parts.join(".")).is_err());
    }

    #[test]
    fn test_jwt_from_other_issuer_fails() {
        let key = test_key();
        let other = SigningKey::from_bytes(&[4u8; 32]);
        // claims name `other` as issuer but are signed by `key`
        let token = sign_jwt(&key, &claims(encode_did_key(&other.verifying_key()))).unwrap();

        assert!(decode_jwt(&token).is_err());
    }
}
