//! Key management type definitions

use serde::{Deserialize, Serialize};

/// Opaque identifier addressing one symmetric key / conversation channel
///
/// Unless the caller overrides it, a topic is the hex SHA-256 of its key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    pub fn new(topic: impl Into<String>) -> Self {
        Self(topic.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Topic {
    fn from(topic: String) -> Self {
        Self(topic)
    }
}

impl From<&str> for Topic {
    fn from(topic: &str) -> Self {
        Self(topic.to_string())
    }
}

/// Claims carried by a relay authentication token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issuer: the client id (`did:key:...`)
    pub iss: String,
    /// Subject: random per-process session identifier
    pub sub: String,
    /// Audience (relay URL)
    pub aud: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_serializes_as_plain_string() {
        let topic = Topic::new("abc");
        assert_eq!(serde_json::to_string(&topic).unwrap(), "\"abc\"");
        assert_eq!(topic.to_string(), "abc");
    }
}
