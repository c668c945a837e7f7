//! Error types for pairing-core

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Coarse error category, independent of the payload carried by the variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotInitialized,
    NoMatchingKey,
    RecentlyDeleted,
    RestoreWillOverride,
    DecryptionFailed,
    SubmissionFailed,
    Crypto,
    Envelope,
    Storage,
    Vault,
    Http,
}

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{0} is not initialized - call init() first")]
    NotInitialized(&'static str),

    #[error("No matching key: {0}")]
    NoMatchingKey(String),

    #[error("Record was recently deleted: {0}")]
    RecentlyDeleted(String),

    #[error("Restore will override existing entries in store {0}")]
    RestoreWillOverride(String),

    #[error("Decryption failed on topic {topic}: {reason}")]
    DecryptionFailed { topic: String, reason: String },

    #[error("Telemetry submission failed: {0}")]
    SubmissionFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionError(String),

    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Keychain error: {0}")]
    KeychainError(String),

    #[error("Vault is locked - unlock with password first")]
    VaultLocked,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotInitialized(_) => ErrorKind::NotInitialized,
            Self::NoMatchingKey(_) => ErrorKind::NoMatchingKey,
            Self::RecentlyDeleted(_) => ErrorKind::RecentlyDeleted,
            Self::RestoreWillOverride(_) => ErrorKind::RestoreWillOverride,
            Self::DecryptionFailed { .. } => ErrorKind::DecryptionFailed,
            Self::SubmissionFailed(_) => ErrorKind::SubmissionFailed,
            Self::EncryptionError(_) | Self::InvalidKey(_) | Self::KeyDerivationError(_) => {
                ErrorKind::Crypto
            }
            Self::InvalidEnvelope(_) => ErrorKind::Envelope,
            Self::StorageError(_) | Self::IoError(_) | Self::SerializationError(_) => {
                ErrorKind::Storage
            }
            Self::KeychainError(_) | Self::VaultLocked | Self::InvalidPassword => ErrorKind::Vault,
            Self::HttpError(_) => ErrorKind::Http,
        }
    }

    /// Build a decryption failure for `topic`
    pub(crate) fn decryption(topic: &str, reason: impl Into<String>) -> Self {
        Self::DecryptionFailed {
            topic: topic.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            CoreError::NotInitialized("KeyManager").kind(),
            ErrorKind::NotInitialized
        );
        assert_eq!(
            CoreError::decryption("abc", "bad tag").kind(),
            ErrorKind::DecryptionFailed
        );
        assert_eq!(CoreError::VaultLocked.kind(), ErrorKind::Vault);
    }

    #[test]
    fn test_decryption_message_names_topic() {
        let err = CoreError::decryption("topic-1", "bad tag");
        assert_eq!(err.to_string(), "Decryption failed on topic topic-1: bad tag");
    }
}
