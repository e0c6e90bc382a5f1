//! Beaconry - client-side event buffering
//!
//! Applications report discrete events with [`EventTracker::track`]. The
//! tracker turns each one into an [`Envelope`] (timestamp, unique id,
//! optional client context), buffers it, and flushes batches to a
//! caller-supplied transport when the buffer fills up or its window expires.
//!
//! Two wire shapes are available:
//! - [`EventTracker::unsigned`]: the transport receives the envelope batch as-is.
//! - [`EventTracker::signed`]: the batch is serialized to JSON, tagged with a
//!   [`Signer`] (e.g. [`HmacSha256`]) and handed over as a [`PostRequest`].
//!
//! The buffer lives in memory only; events still buffered when the process
//! dies are lost.
//!
//! See `demos/hello-tracker.rs`.

mod config;
mod context;
mod envelope;
mod envelope_builder;
mod error;
mod rearm_policy;
mod signature;
mod tracker;
mod tracker_builder;
mod transport;
mod validation;

pub mod id;

mod internal;

pub use config::Config;
pub use context::{ClientContext, ContextProvider, StaticContext};
pub use envelope::{Envelope, EventTs, Payload};
pub use envelope_builder::{EnvelopeBuilder, WireShape};
pub use error::Error;
pub use rearm_policy::RearmPolicy;
#[cfg(feature = "hmac")]
pub use signature::HmacSha256;
pub use signature::Signer;
pub use tracker::EventTracker;
pub use tracker_builder::{SignedBuilder, UnsignedBuilder};
pub use transport::{Batch, BatchTransport, DataTransport, Done, PostRequest};
pub use validation::validate_name;

pub type Result<T = ()> = std::result::Result<T, Error>;
