use std::{collections::VecDeque, fmt};

use crate::{Done, Envelope, internal::FlushTimer};

/// A flushed batch waiting for its turn at the transport.
pub(crate) struct Outbound {
    pub events: Vec<Envelope>,
    pub done: Option<Done>,
}

impl fmt::Debug for Outbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Outbound")
            .field("events", &self.events.len())
            .field("done", &self.done.is_some())
            .finish()
    }
}

/// Pending envelopes, the single timer that owns the next flush, and the
/// flushed batches not yet handed to the transport.
///
/// `dispatching` is set while some caller is draining `outbound`; everyone
/// else only enqueues, so batches leave in flush order.
#[derive(Debug, Default)]
pub(crate) struct BufferState {
    pub entries: Vec<Envelope>,
    pub timer: Option<FlushTimer>,
    pub outbound: VecDeque<Outbound>,
    pub dispatching: bool,
    last_timer_id: u64,
}

impl BufferState {
    /// Move the buffered entries to the back of the outbound queue.
    /// Any pending timer is cancelled.
    pub fn seal(&mut self, done: Option<Done>) -> usize {
        self.timer = None;
        let events = std::mem::take(&mut self.entries);
        let size = events.len();
        self.outbound.push_back(Outbound { events, done });
        size
    }

    pub fn next_timer_id(&mut self) -> u64 {
        self.last_timer_id += 1;
        self.last_timer_id
    }

    /// Whether `id` belongs to the live timer (a cancelled one may still
    /// have been waiting for the lock when it lost the race).
    pub fn is_current_timer(&self, id: u64) -> bool {
        self.timer.as_ref().is_some_and(|t| t.id() == id)
    }
}
