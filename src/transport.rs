use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::Envelope;

/// Completion callback handed through to the transport.
///
/// The tracker never calls it after a flush: reporting completion (or not)
/// is up to the transport.
pub type Done = Box<dyn FnOnce() + Send + 'static>;

/// A batch delivered by the unsigned variant. `events` is the buffered
/// snapshot as-is, in tracking order; no serialization is imposed.
pub struct Batch {
    pub url: Arc<str>,
    pub key: Arc<str>,
    pub events: Vec<Envelope>,
    pub done: Option<Done>,
}

impl fmt::Debug for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("url", &self.url)
            .field("key", &self.key)
            .field("events", &self.events)
            .field("done", &self.done.is_some())
            .finish()
    }
}

/// A pre-serialized, authenticated request built by the signed variant.
///
/// - `data`: JSON array of envelopes, exactly the bytes that were signed.
/// - `headers`: `Content-Type: text/plain`.
/// - `query`: `key` (client key) and `mac` (authentication tag).
pub struct PostRequest {
    pub url: Arc<str>,
    pub data: String,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub done: Option<Done>,
}

impl fmt::Debug for PostRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostRequest")
            .field("url", &self.url)
            .field("data", &self.data)
            .field("headers", &self.headers)
            .field("query", &self.query)
            .field("done", &self.done.is_some())
            .finish()
    }
}

/// Receives unsigned batches.
///
/// Called without the tracker's buffer locked, so the transport (or the
/// `done` callback) may track or send again; such batches are queued and
/// delivered right after the current one. Implementations should hand the
/// batch off (spawn a task, push to a channel) rather than block. Failures
/// are the transport's own business: batches are never re-queued.
pub trait BatchTransport: Send + Sync + 'static {
    fn post(&self, batch: Batch);
}

impl<F> BatchTransport for F
where
    F: Fn(Batch) + Send + Sync + 'static,
{
    fn post(&self, batch: Batch) {
        self(batch)
    }
}

/// Receives authenticated requests. Same calling rules as [`BatchTransport`].
pub trait DataTransport: Send + Sync + 'static {
    fn post_data(&self, request: PostRequest);
}

impl<F> DataTransport for F
where
    F: Fn(PostRequest) + Send + Sync + 'static,
{
    fn post_data(&self, request: PostRequest) {
        self(request)
    }
}
