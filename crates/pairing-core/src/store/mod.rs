//! Keyed record stores
//!
//! Generic persisted maps used for pairings, sessions and proposals.

mod keyed_store;
mod recently_deleted;
mod records;

pub use keyed_store::{KeyFn, KeyedStore, StoreKey, StoreValue};
pub use recently_deleted::{RecentlyDeleted, RECENTLY_DELETED_LIMIT};
pub use records::{
    PairingRecord, ProposalRecord, RelayProtocol, SessionParticipant, SessionRecord, StoreRecord,
};

/// Store name for pairings
pub const PAIRING_STORE_NAME: &str = "pairing";
/// Store name for settled sessions
pub const SESSION_STORE_NAME: &str = "session";
/// Store name for pending proposals
pub const PROPOSAL_STORE_NAME: &str = "proposal";
