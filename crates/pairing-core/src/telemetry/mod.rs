//! Telemetry ledger with batched delivery

mod buffer;
mod sender;
mod types;

pub use buffer::TelemetryBuffer;
pub use sender::{ReqwestSender, SendResponse, TelemetrySender, DEFAULT_SEND_TIMEOUT};
pub use types::{EventHandle, EventLookup, EventProperties, EventProps, TelemetryEvent};
