//! Telemetry event types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event ledger entry, in the shape the telemetry endpoint accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    pub event_id: String,
    /// Milliseconds since the epoch; refreshed when the event resolves
    pub timestamp: i64,
    pub bundle_id: String,
    pub domain: String,
    pub props: EventProps,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventProps {
    pub event: String,
    /// Empty while the event is in progress
    #[serde(rename = "type", default)]
    pub event_type: String,
    pub properties: EventProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default)]
    pub trace: Vec<String>,
}

impl EventProperties {
    pub fn for_topic(topic: impl Into<String>) -> Self {
        Self {
            topic: Some(topic.into()),
            trace: Vec::new(),
        }
    }
}

impl TelemetryEvent {
    pub(crate) fn new(
        event: &str,
        event_type: &str,
        properties: EventProperties,
        bundle_id: &str,
        domain: &str,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            bundle_id: bundle_id.to_string(),
            domain: domain.to_string(),
            props: EventProps {
                event: event.to_string(),
                event_type: event_type.to_string(),
                properties,
            },
        }
    }

    /// Resolved events carry a type and are eligible for submission
    pub fn is_resolved(&self) -> bool {
        !self.props.event_type.is_empty()
    }

    pub fn topic(&self) -> Option<&str> {
        self.props.properties.topic.as_deref()
    }
}

/// Token addressing one event in a [`super::TelemetryBuffer`]
///
/// Outlives the event it names; operations on a removed event are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventHandle {
    event_id: String,
}

impl EventHandle {
    pub(crate) fn new(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
        }
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }
}

/// Selector for [`super::TelemetryBuffer::get_event`]
#[derive(Debug, Clone, Copy)]
pub enum EventLookup<'a> {
    Id(&'a str),
    Topic(&'a str),
}
