use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller data attached to an event.
pub type Payload = Map<String, Value>;

/// Event creation time in the unit of the wire shape that produced it.
///
/// The two shapes disagree on units and consumers depend on both, so the
/// value is kept as produced rather than normalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventTs {
    /// Whole milliseconds since the Unix epoch (authenticated shape).
    Millis(u64),
    /// Fractional seconds since the Unix epoch (unsigned shape).
    Seconds(f64),
}

impl EventTs {
    /// Milliseconds since the Unix epoch, whatever the original unit.
    pub fn as_millis(&self) -> u64 {
        match *self {
            EventTs::Millis(ms) => ms,
            EventTs::Seconds(s) => (s * 1000.0) as u64,
        }
    }
}

/// A fully built event record, ready for batching.
///
/// Fields serialize in declaration order. `extra` holds top-level
/// enrichment (client context, user id) and is flattened into the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    event_topic: String,
    event_type: String,
    event_ts: EventTs,
    uuid: String,
    payload: Payload,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Envelope {
    pub(crate) fn new(
        event_topic: String,
        event_type: String,
        event_ts: EventTs,
        uuid: String,
        payload: Payload,
        extra: Map<String, Value>,
    ) -> Self {
        Self {
            event_topic,
            event_type,
            event_ts,
            uuid,
            payload,
            extra,
        }
    }

    pub fn topic(&self) -> &str {
        &self.event_topic
    }

    /// Event type as sent, including any client namespace prefix.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn timestamp(&self) -> EventTs {
        self.event_ts
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Top-level enrichment fields merged next to the standard ones.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}
