//! Versioned binary envelopes around protocol payloads

mod codec;
mod types;

pub use codec::EnvelopeCodec;
pub use types::{DecodeOptions, EncodeOptions, Encoding, Envelope, EnvelopeType};
