//! Telemetry event buffer
//!
//! Events live in memory and are mirrored to [`DurableStorage`] on heartbeat
//! ticks rather than on every change. Only resolved events are submitted, and
//! an event leaves the buffer only after the sender confirms delivery or the
//! cleanup window has passed. Failures never leave this module.

use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

use super::sender::TelemetrySender;
use super::types::{EventHandle, EventLookup, EventProperties, TelemetryEvent};
use crate::error::CoreError;
use crate::heartbeat::{Heartbeat, HeartbeatHandle};
use crate::settings::TelemetrySettings;
use crate::storage::DurableStorage;

#[derive(Default)]
struct Ledger {
    events: IndexMap<String, TelemetryEvent>,
    /// Ids of events in a batch that has not been answered yet
    in_flight: HashSet<String>,
    dirty: bool,
}

/// Releases a batch's events for later submissions when dropped
struct InFlight<'a> {
    ledger: &'a Mutex<Ledger>,
    ids: Vec<String>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut ledger = self.ledger.lock();
        for id in &self.ids {
            ledger.in_flight.remove(id);
        }
    }
}

/// Telemetry buffer
pub struct TelemetryBuffer {
    settings: TelemetrySettings,
    storage_key: String,
    storage: Arc<dyn DurableStorage>,
    sender: Arc<dyn TelemetrySender>,
    ledger: Mutex<Ledger>,
    heartbeat: Mutex<Option<HeartbeatHandle>>,
}

impl TelemetryBuffer {
    pub fn new(
        settings: TelemetrySettings,
        storage_key: impl Into<String>,
        storage: Arc<dyn DurableStorage>,
        sender: Arc<dyn TelemetrySender>,
    ) -> Self {
        Self {
            settings,
            storage_key: storage_key.into(),
            storage,
            sender,
            ledger: Mutex::new(Ledger::default()),
            heartbeat: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Record a new event; an empty `event_type` leaves it in progress
    ///
    /// When telemetry is disabled the returned handle names no event.
    pub fn create_event(
        &self,
        event: &str,
        event_type: &str,
        properties: EventProperties,
    ) -> EventHandle {
        let record = TelemetryEvent::new(
            event,
            event_type,
            properties,
            &self.settings.bundle_id,
            &self.settings.domain,
        );
        let handle = EventHandle::new(record.event_id.clone());

        if self.settings.enabled {
            let mut ledger = self.ledger.lock();
            ledger.events.insert(record.event_id.clone(), record);
            ledger.dirty = true;
        }

        handle
    }

    /// Append a diagnostic note; ignored once the event is gone
    pub fn add_trace(&self, handle: &EventHandle, note: &str) {
        let mut ledger = self.ledger.lock();
        if let Some(event) = ledger.events.get_mut(handle.event_id()) {
            event.props.properties.trace.push(note.to_string());
            ledger.dirty = true;
        }
    }

    /// Resolve the event with `kind`, making it eligible for submission
    pub fn set_error(&self, handle: &EventHandle, kind: &str) {
        let mut ledger = self.ledger.lock();
        if let Some(event) = ledger.events.get_mut(handle.event_id()) {
            event.props.event_type = kind.to_string();
            event.timestamp = chrono::Utc::now().timestamp_millis();
            ledger.dirty = true;
        }
    }

    pub fn get_event(&self, lookup: EventLookup<'_>) -> Option<TelemetryEvent> {
        let ledger = self.ledger.lock();
        match lookup {
            EventLookup::Id(id) => ledger.events.get(id).cloned(),
            EventLookup::Topic(topic) => ledger
                .events
                .values()
                .find(|event| event.topic() == Some(topic))
                .cloned(),
        }
    }

    pub fn len(&self) -> usize {
        self.ledger.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load the persisted ledger; in-memory events win on id collisions
    pub async fn restore(&self) {
        if !self.settings.enabled {
            return;
        }

        let persisted = match self.storage.get_item(&self.storage_key).await {
            Ok(Some(value)) => value,
            Ok(None) => return,
            Err(e) => {
                warn!("Failed to read telemetry ledger: {}", e);
                return;
            }
        };

        let events: Vec<TelemetryEvent> = match serde_json::from_value(persisted) {
            Ok(events) => events,
            Err(e) => {
                warn!("Discarding unreadable telemetry ledger: {}", e);
                return;
            }
        };

        let mut ledger = self.ledger.lock();
        let before = ledger.events.len();
        for event in events {
            ledger.events.entry(event.event_id.clone()).or_insert(event);
        }
        debug!("Restored {} telemetry events", ledger.events.len() - before);
    }

    /// Send every resolved event in one batch; returns how many were delivered
    ///
    /// Events already in a batch awaiting an answer are left out, so
    /// overlapping calls never send the same event twice.
    pub async fn submit(&self) -> usize {
        if !self.settings.enabled {
            return 0;
        }
        let url = match self.settings.submit_url() {
            Some(url) => url,
            None => {
                debug!("No telemetry project id or valid endpoint configured, skipping submission");
                return 0;
            }
        };

        let batch: Vec<TelemetryEvent> = {
            let mut ledger = self.ledger.lock();
            let batch: Vec<TelemetryEvent> = ledger
                .events
                .values()
                .filter(|event| event.is_resolved() && !ledger.in_flight.contains(&event.event_id))
                .cloned()
                .collect();
            for event in &batch {
                ledger.in_flight.insert(event.event_id.clone());
            }
            batch
        };
        if batch.is_empty() {
            return 0;
        }
        let _in_flight = InFlight {
            ledger: &self.ledger,
            ids: batch.iter().map(|event| event.event_id.clone()).collect(),
        };

        let body = match serde_json::to_value(&batch) {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to serialize telemetry batch: {}", e);
                return 0;
            }
        };

        let failure = match self.sender.send(&url, &body).await {
            Ok(response) if response.ok => None,
            Ok(response) => Some(CoreError::SubmissionFailed(format!(
                "endpoint responded with status {}",
                response.status
            ))),
            Err(e) => Some(CoreError::SubmissionFailed(e.to_string())),
        };
        if let Some(e) = failure {
            warn!("{}; {} events kept for retry", e, batch.len());
            return 0;
        }

        let mut ledger = self.ledger.lock();
        for event in &batch {
            ledger.events.shift_remove(&event.event_id);
        }
        ledger.dirty = true;

        debug!("Submitted {} telemetry events", batch.len());
        batch.len()
    }

    /// Mirror the ledger to storage if it changed since the last write
    pub async fn persist(&self) {
        let snapshot = {
            let mut ledger = self.ledger.lock();
            if !ledger.dirty {
                return;
            }
            ledger.dirty = false;
            ledger.events.values().cloned().collect::<Vec<_>>()
        };

        let result = match serde_json::to_value(&snapshot) {
            Ok(value) => self.storage.set_item(&self.storage_key, value).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            warn!("Failed to persist telemetry ledger: {}", e);
            self.ledger.lock().dirty = true;
        }
    }

    /// Drop events older than the cleanup window; returns how many were dropped
    pub fn prune(&self) -> usize {
        let window = i64::try_from(self.settings.cleanup_window().as_millis()).unwrap_or(i64::MAX);
        let cutoff = chrono::Utc::now().timestamp_millis().saturating_sub(window);

        let mut ledger = self.ledger.lock();
        let before = ledger.events.len();
        ledger.events.retain(|_, event| event.timestamp >= cutoff);

        let pruned = before - ledger.events.len();
        if pruned > 0 {
            ledger.dirty = true;
            debug!("Pruned {} expired telemetry events", pruned);
        }
        pruned
    }

    /// One heartbeat pass: persist, prune, then retry submission
    pub async fn on_heartbeat(&self) {
        self.persist().await;
        self.prune();
        self.submit().await;
    }

    /// Restore, flush what a previous process resolved, then attach to
    /// `heartbeat`
    pub async fn start(self: &Arc<Self>, heartbeat: &Heartbeat) {
        if !self.settings.enabled {
            debug!("Telemetry disabled");
            return;
        }

        self.restore().await;
        self.submit().await;

        let buffer: Weak<Self> = Arc::downgrade(self);
        let handle = heartbeat.register(move || {
            let buffer = buffer.clone();
            async move {
                if let Some(buffer) = buffer.upgrade() {
                    buffer.on_heartbeat().await;
                }
            }
        });
        *self.heartbeat.lock() = Some(handle);
    }

    /// Detach from the heartbeat
    pub fn stop(&self) {
        if let Some(handle) = self.heartbeat.lock().take() {
            handle.cancel();
        }
    }
}
