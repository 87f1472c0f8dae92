//! Structured notifications emitted by the worker
//!
//! Events carry a name, a message template with `{field}` placeholders, and
//! the field map used to render it. Sinks are fire-and-forget: emitting never
//! fails the caller.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::candidate::Candidate;
use crate::utils::{format_dist, format_time, DistanceUnit};

/// Event names
pub mod names {
    /// Generic debug log line
    pub const LOG: &str = "move_to_map_pokemon";
    pub const FAIL: &str = "move_to_map_pokemon_fail";
    pub const TELEPORT_TO: &str = "move_to_map_pokemon_teleport_to";
    pub const ENCOUNTER: &str = "move_to_map_pokemon_encounter";
    pub const MOVE_TOWARDS: &str = "move_to_map_pokemon_move_towards";
    pub const TELEPORT_BACK: &str = "move_to_map_pokemon_teleport_back";
    pub const THROUGH_FORT: &str = "moving_to_pokemon_through_fort";
    pub const ARRIVED_AT_FORT: &str = "arrived_at_fort";
}

/// A single notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub name: &'static str,
    pub formatted: String,
    pub data: BTreeMap<String, Value>,
}

impl Event {
    pub fn new(name: &'static str, formatted: impl Into<String>) -> Self {
        Self {
            name,
            formatted: formatted.into(),
            data: BTreeMap::new(),
        }
    }

    /// Add a field
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// `{message}`-style log event
    pub fn log(message: impl Into<String>) -> Self {
        Self::new(names::LOG, "{message}").with("message", message.into())
    }

    /// `Failure! {message}` event
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(names::FAIL, "Failure! {message}").with("message", message.into())
    }

    /// Event carrying the standard candidate fields
    /// (`poke_name`, `poke_dist`, `poke_lat`, `poke_lon`, `disappears_in`)
    pub fn for_candidate(
        name: &'static str,
        formatted: impl Into<String>,
        candidate: &Candidate,
        unit: DistanceUnit,
        now: i64,
    ) -> Self {
        Self::new(name, formatted)
            .with("poke_name", candidate.name.clone())
            .with("poke_dist", format_dist(candidate.distance, unit))
            .with("poke_lat", candidate.latitude)
            .with("poke_lon", candidate.longitude)
            .with("disappears_in", format_time(candidate.seconds_left(now)))
    }

    /// Render the template with the event's fields.
    ///
    /// Unknown placeholders are left as-is.
    pub fn message(&self) -> String {
        let mut out = String::with_capacity(self.formatted.len());
        let mut rest = self.formatted.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    let key = &after[..close];
                    match self.data.get(key) {
                        Some(Value::String(s)) => out.push_str(s),
                        Some(other) => out.push_str(&other.to_string()),
                        None => {
                            out.push('{');
                            out.push_str(key);
                            out.push('}');
                        }
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    out.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Receiver of worker notifications
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Sink forwarding events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: Event) {
        let message = event.message();
        match event.name {
            names::FAIL => tracing::warn!(event = event.name, "{}", message),
            names::LOG => tracing::debug!(event = event.name, "{}", message),
            _ => tracing::info!(event = event.name, "{}", message),
        }
    }
}

/// Sink keeping every event in memory
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Names of the emitted events, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| e.name == name).count()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
