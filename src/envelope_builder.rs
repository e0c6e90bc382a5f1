use std::{
    sync::{Arc, OnceLock},
    time::{SystemTime, UNIX_EPOCH},
};

use chrono::{FixedOffset, Local, Offset};
use serde_json::{Map, Number, Value};

use crate::{ClientContext, ContextProvider, Envelope, EventTs, Payload, id};

/// Field names owned by the envelope itself; top-level context may not shadow them.
const RESERVED_FIELDS: [&str; 5] = ["event_topic", "event_type", "event_ts", "uuid", "payload"];

/// The record layout a tracker variant puts on the wire.
#[derive(Debug, Clone)]
pub enum WireShape {
    /// `event_type` is prefixed with `<client_name>.`, timestamps are fractional
    /// seconds, and context (plus `user_id`, if any) sits at the top level.
    Unsigned {
        client_name: Arc<str>,
        user_id: Option<String>,
    },
    /// Timestamps are milliseconds and the payload receives `app_name`,
    /// `utc_offset` and, when enabled, the client context.
    Authenticated { app_name: Arc<str> },
}

/// Turns a `(topic, type, payload)` triple into an [`Envelope`].
///
/// - Timestamp is taken from the wall clock at build time.
/// - A non-empty string `uuid` in the payload is reused as the envelope id,
///   otherwise a fresh one is generated.
/// - Enrichment never replaces a key the caller already set.
///
/// Building never fails: the payload is treated as an open mapping.
pub struct EnvelopeBuilder {
    shape: WireShape,
    append_client_context: bool,
    provider: Option<Arc<dyn ContextProvider>>,
    context: OnceLock<ClientContext>,
}

impl EnvelopeBuilder {
    pub fn new(shape: WireShape) -> Self {
        Self {
            shape,
            append_client_context: false,
            provider: None,
            context: OnceLock::new(),
        }
    }

    /// Merge context from `provider` into every envelope.
    pub fn with_client_context(mut self, provider: Arc<dyn ContextProvider>) -> Self {
        self.append_client_context = true;
        self.provider = Some(provider);
        self
    }

    pub fn shape(&self) -> &WireShape {
        &self.shape
    }

    pub fn build(&self, topic: &str, event_type: &str, payload: Option<Payload>) -> Envelope {
        let mut payload = payload.unwrap_or_default();
        let uuid = match payload.get("uuid") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            _ => id::generate(),
        };
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        match &self.shape {
            WireShape::Unsigned {
                client_name,
                user_id,
            } => {
                let mut extra = Map::new();
                if let Some(user_id) = user_id {
                    extra.insert("user_id".into(), Value::String(user_id.clone()));
                }
                for (key, value) in self.client_context() {
                    if !RESERVED_FIELDS.contains(&key.as_str()) {
                        extra.entry(key.clone()).or_insert_with(|| value.clone());
                    }
                }
                Envelope::new(
                    topic.to_owned(),
                    format!("{client_name}.{event_type}"),
                    EventTs::Seconds(since_epoch.as_secs_f64()),
                    uuid,
                    payload,
                    extra,
                )
            }
            WireShape::Authenticated { app_name } => {
                payload
                    .entry("app_name")
                    .or_insert_with(|| Value::String(app_name.to_string()));
                let utc_offset = offset_hours(Local::now().offset().fix());
                payload
                    .entry("utc_offset")
                    .or_insert(Value::Number(utc_offset));
                for (key, value) in self.client_context() {
                    payload.entry(key.clone()).or_insert_with(|| value.clone());
                }
                Envelope::new(
                    topic.to_owned(),
                    event_type.to_owned(),
                    EventTs::Millis(since_epoch.as_millis() as u64),
                    uuid,
                    payload,
                    Map::new(),
                )
            }
        }
    }

    /// Context to merge, resolved from the provider on first use.
    fn client_context(&self) -> impl Iterator<Item = (&String, &Value)> {
        let context = match (&self.provider, self.append_client_context) {
            (Some(provider), true) => Some(self.context.get_or_init(|| provider.client_context())),
            _ => None,
        };
        context.into_iter().flat_map(|ctx| ctx.iter())
    }
}

/// Offset from UTC in hours, east positive. Whole hours stay integral.
fn offset_hours(offset: FixedOffset) -> Number {
    let seconds = offset.local_minus_utc();
    if seconds % 3600 == 0 {
        Number::from(seconds / 3600)
    } else {
        Number::from_f64(f64::from(seconds) / 3600.0).unwrap_or_else(|| Number::from(0))
    }
}
