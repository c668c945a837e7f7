//! Protocol records persisted through keyed stores

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A record that knows its own store key
pub trait StoreRecord {
    type Key;

    fn record_key(&self) -> Self::Key;
}

/// Relay protocol a topic is reachable over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayProtocol {
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl Default for RelayProtocol {
    fn default() -> Self {
        Self {
            protocol: "irn".to_string(),
            data: None,
        }
    }
}

/// Pairing between this client and a peer, keyed by its topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingRecord {
    pub topic: String,
    /// Expiry, seconds since the epoch
    pub expiry: i64,
    #[serde(default)]
    pub relay: RelayProtocol,
    #[serde(default)]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
}

impl StoreRecord for PairingRecord {
    type Key = String;

    fn record_key(&self) -> String {
        self.topic.clone()
    }
}

/// Participant of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionParticipant {
    pub public_key: String,
    #[serde(default)]
    pub metadata: Value,
}

/// Settled session, keyed by its topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairing_topic: Option<String>,
    /// Expiry, seconds since the epoch
    pub expiry: i64,
    #[serde(default)]
    pub relay: RelayProtocol,
    #[serde(default)]
    pub acknowledged: bool,
    /// Public key of the controlling party
    #[serde(default)]
    pub controller: String,
    #[serde(default)]
    pub namespaces: Value,
    #[serde(default, rename = "self", skip_serializing_if = "Option::is_none")]
    pub self_participant: Option<SessionParticipant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<SessionParticipant>,
}

impl StoreRecord for SessionRecord {
    type Key = String;

    fn record_key(&self) -> String {
        self.topic.clone()
    }
}

/// Pending session proposal, keyed by its request id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalRecord {
    pub id: u64,
    /// Expiry, seconds since the epoch
    pub expiry: i64,
    #[serde(default)]
    pub relays: Vec<RelayProtocol>,
    pub proposer: SessionParticipant,
    #[serde(default)]
    pub required_namespaces: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pairing_topic: Option<String>,
}

impl StoreRecord for ProposalRecord {
    type Key = u64;

    fn record_key(&self) -> u64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_record_wire_shape() {
        let record: SessionRecord = serde_json::from_value(json!({
            "topic": "abc",
            "pairingTopic": "def",
            "expiry": 100,
            "acknowledged": true,
            "self": { "publicKey": "00", "metadata": { "name": "wallet" } }
        }))
        .unwrap();

        assert_eq!(record.record_key(), "abc");
        assert_eq!(record.relay.protocol, "irn");
        assert_eq!(record.self_participant.unwrap().metadata["name"], "wallet");
    }

    #[test]
    fn test_proposal_keyed_by_id() {
        let record: ProposalRecord = serde_json::from_value(json!({
            "id": 1700000000000u64,
            "expiry": 100,
            "proposer": { "publicKey": "ff" }
        }))
        .unwrap();

        assert_eq!(record.record_key(), 1700000000000);
    }
}
