use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;

use crate::{
    Config, Done, EnvelopeBuilder, Error, Payload, Result, SignedBuilder, UnsignedBuilder,
    internal::{BufferState, Dispatcher, FlushTimer, Outbound},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushTrigger {
    Size,
    Unbuffered,
    Timeout,
    Send,
    Drain,
}

/// Buffers tracked events and flushes them in batches to a transport.
///
/// - `track(topic, type, payload)`: build an envelope and buffer it.
/// - `send()` / `send_then(done)`: flush now if anything is buffered.
/// - `drain()`: flush and leave the tracker idle, with no timer pending.
///
/// A buffer window is flushed when it reaches `buffer_length` entries or
/// when its timer (started by the window's first entry, never pushed back)
/// expires after `buffer_timeout`. With a zero timeout each event is sent
/// on its own. Batches reach the transport in tracking order and the buffer
/// is cleared at hand-off; nothing is retried or re-queued.
///
/// Handles are cheap to clone and share one buffer. When the last handle is
/// dropped, a pending timer is cancelled and unsent events are discarded;
/// call [`drain`](EventTracker::drain) first to keep them.
///
/// Build one with [`EventTracker::unsigned`] or [`EventTracker::signed`].
#[derive(Clone)]
pub struct EventTracker {
    inner: Arc<Inner>,
}

struct Inner {
    config: Config,
    builder: EnvelopeBuilder,
    dispatcher: Box<dyn Dispatcher>,
    runtime: Option<Handle>,
    state: Mutex<BufferState>,
}

impl EventTracker {
    /// Start building a tracker that hands raw envelope batches to its transport.
    pub fn unsigned() -> UnsignedBuilder {
        UnsignedBuilder::default()
    }

    /// Start building a tracker that serializes and signs every batch.
    pub fn signed() -> SignedBuilder {
        SignedBuilder::default()
    }

    pub(crate) fn new(
        config: Config,
        builder: EnvelopeBuilder,
        dispatcher: Box<dyn Dispatcher>,
    ) -> Result<Self> {
        let runtime = if config.is_buffering() {
            Some(Handle::try_current().map_err(|_| Error::NoRuntime)?)
        } else {
            None
        };
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                builder,
                dispatcher,
                runtime,
                state: Mutex::new(BufferState::default()),
            }),
        })
    }

    /// Record an event. Flushes before returning if the buffer is full
    /// or buffering is disabled.
    pub fn track(&self, topic: &str, event_type: &str, payload: Option<Payload>) {
        let envelope = self.inner.builder.build(topic, event_type, payload);
        tracing::trace!(
            topic,
            event_type = envelope.event_type(),
            uuid = envelope.uuid(),
            "Event tracked"
        );

        let mut state = self.inner.lock();
        state.entries.push(envelope);
        let flushed = if state.entries.len() >= self.inner.config.flush_threshold() {
            self.inner.flush(&mut state, None, FlushTrigger::Size)
        } else if !self.inner.config.is_buffering() {
            self.inner.flush(&mut state, None, FlushTrigger::Unbuffered)
        } else {
            if state.timer.is_none() {
                self.inner.schedule(&mut state);
            }
            false
        };
        drop(state);
        if flushed {
            self.inner.deliver();
        }
    }

    /// Flush buffered events now, cancelling the pending timer.
    ///
    /// Returns `false`, without touching the transport or the timer,
    /// when there is nothing to send.
    pub fn send(&self) -> bool {
        let flushed = self.inner.flush(&mut self.inner.lock(), None, FlushTrigger::Send);
        if flushed {
            self.inner.deliver();
        }
        flushed
    }

    /// Like [`send`](EventTracker::send), passing `done` to the transport.
    ///
    /// With an empty buffer `done` is called right away instead, so a
    /// caller waiting on it is never left hanging.
    pub fn send_then<F>(&self, done: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.inner.lock();
        if state.entries.is_empty() {
            drop(state);
            done();
            return false;
        }
        self.inner
            .flush(&mut state, Some(Box::new(done)), FlushTrigger::Send);
        drop(state);
        self.inner.deliver();
        true
    }

    /// Flush whatever is buffered and cancel any pending timer, regardless
    /// of the rearm policy. The tracker stays usable afterwards.
    pub fn drain(&self) -> bool {
        let mut state = self.inner.lock();
        let flushed = self.inner.flush(&mut state, None, FlushTrigger::Drain);
        state.timer = None;
        drop(state);
        if flushed {
            self.inner.deliver();
        }
        flushed
    }

    /// Number of envelopes waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether a scheduled flush is currently live.
    pub fn has_pending_timer(&self) -> bool {
        self.inner.lock().timer.is_some()
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seal the buffer into an outbound batch. The caller must release the
    /// lock and call [`deliver`](Inner::deliver) afterwards.
    fn flush(
        self: &Arc<Self>,
        state: &mut BufferState,
        done: Option<Done>,
        trigger: FlushTrigger,
    ) -> bool {
        if state.entries.is_empty() {
            return false;
        }
        let size = state.seal(done);
        tracing::debug!(?trigger, size, "Flushing batch");

        if self.config.rearm.is_rearm() && trigger != FlushTrigger::Drain {
            self.schedule(state);
        }
        true
    }

    /// Hand queued batches to the transport, without holding the lock.
    ///
    /// Only one caller drains the queue at a time. A call made while another
    /// is draining (including one from inside the transport or its `done`
    /// callback) returns at once and its batch is picked up by the drainer.
    fn deliver(&self) {
        let mut state = self.lock();
        if state.dispatching {
            return;
        }
        state.dispatching = true;
        let unwind = ResetOnUnwind(self);
        loop {
            let Some(Outbound { events, done }) = state.outbound.pop_front() else {
                break;
            };
            drop(state);
            self.dispatcher.dispatch(events, done);
            state = self.lock();
        }
        state.dispatching = false;
        std::mem::forget(unwind);
    }

    fn schedule(self: &Arc<Self>, state: &mut BufferState) {
        let Some(runtime) = &self.runtime else {
            return;
        };
        let id = state.next_timer_id();
        let delay = self.config.buffer_timeout;
        let inner = Arc::downgrade(self);
        state.timer = Some(FlushTimer::spawn(runtime, id, delay, move || {
            if let Some(inner) = inner.upgrade() {
                inner.on_timer(id);
            }
        }));
        tracing::debug!(
            timer_id = id,
            delay_ms = delay.as_millis() as u64,
            "Flush timer scheduled"
        );
    }

    fn on_timer(self: &Arc<Self>, id: u64) {
        let mut state = self.lock();
        if !state.is_current_timer(id) {
            return;
        }
        state.timer = None;
        let flushed = self.flush(&mut state, None, FlushTrigger::Timeout);
        drop(state);
        if flushed {
            self.deliver();
        } else {
            tracing::debug!(timer_id = id, "Flush timer expired on an empty buffer");
        }
    }
}

/// Clears the `dispatching` flag if a transport panics mid-delivery, so
/// later flushes are not stranded in the queue.
struct ResetOnUnwind<'a>(&'a Inner);

impl Drop for ResetOnUnwind<'_> {
    fn drop(&mut self) {
        self.0.lock().dispatching = false;
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use serde_json::json;

    use crate::{Batch, Config, EventTracker, RearmPolicy};

    type Sent = Arc<Mutex<Vec<Vec<String>>>>;

    fn tracker(config: Config) -> (EventTracker, Sent) {
        let sent: Sent = Arc::default();
        let sink = sent.clone();
        let tracker = EventTracker::unsigned()
            .key("k")
            .url("https://events.test")
            .client_name("web")
            .transport(move |batch: Batch| {
                let types = batch
                    .events
                    .iter()
                    .map(|e| e.event_type().to_owned())
                    .collect();
                sink.lock().unwrap().push(types);
                if let Some(done) = batch.done {
                    done();
                }
            })
            .config(config)
            .build()
            .unwrap();
        (tracker, sent)
    }

    fn batches(sent: &Sent) -> Vec<Vec<String>> {
        sent.lock().unwrap().clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_size_trigger_flushes_synchronously() {
        let config = Config::default()
            .with_buffer_length(2)
            .with_buffer_timeout(Duration::from_millis(1000));
        let (tracker, sent) = tracker(config);

        tracker.track("t", "a", None);
        assert!(batches(&sent).is_empty());
        assert!(tracker.has_pending_timer());

        tracker.track("t", "b", None);
        assert_eq!(batches(&sent), vec![vec!["web.a", "web.b"]]);
        assert_eq!(tracker.pending(), 0);
        assert!(!tracker.has_pending_timer());

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(batches(&sent).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_trigger_uses_a_single_window() {
        let config = Config::default().with_buffer_timeout(Duration::from_millis(1000));
        let (tracker, sent) = tracker(config);

        tracker.track("t", "a", None);
        tokio::time::sleep(Duration::from_millis(600)).await;
        tracker.track("t", "b", None);
        tokio::time::sleep(Duration::from_millis(399)).await;
        assert!(batches(&sent).is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(batches(&sent), vec![vec!["web.a", "web.b"]]);
        assert!(!tracker.has_pending_timer());
    }

    #[tokio::test]
    async fn test_zero_timeout_sends_every_event_alone() {
        let config = Config::default().with_buffer_timeout(Duration::ZERO);
        let (tracker, sent) = tracker(config);
        tracker.track("t", "a", None);
        tracker.track("t", "b", None);
        assert_eq!(batches(&sent), vec![vec!["web.a"], vec!["web.b"]]);
        assert!(!tracker.has_pending_timer());
    }

    #[test]
    fn test_zero_timeout_needs_no_runtime() {
        let config = Config::default().with_buffer_timeout(Duration::ZERO);
        let (tracker, sent) = tracker(config);
        tracker.track("t", "a", Some(json!({"n": 1}).as_object().cloned().unwrap()));
        assert_eq!(batches(&sent).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_on_empty_buffer_is_a_no_op() {
        let (tracker, sent) = tracker(Config::default());
        assert!(!tracker.send());
        assert!(batches(&sent).is_empty());
        assert!(!tracker.has_pending_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_cancels_pending_timer() {
        let config = Config::default().with_buffer_timeout(Duration::from_millis(100));
        let (tracker, sent) = tracker(config);
        tracker.track("t", "a", None);
        assert!(tracker.send());
        assert!(!tracker.has_pending_timer());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(batches(&sent), vec![vec!["web.a"]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_schedules_heartbeat_after_flush() {
        let config = Config::default()
            .with_buffer_timeout(Duration::from_millis(100))
            .with_rearm(RearmPolicy::Rearm);
        let (tracker, sent) = tracker(config);

        tracker.track("t", "a", None);
        assert!(tracker.send());
        assert!(tracker.has_pending_timer());

        tracker.track("t", "b", None);
        tokio::time::sleep(Duration::from_millis(101)).await;
        assert_eq!(batches(&sent), vec![vec!["web.a"], vec!["web.b"]]);
        assert!(tracker.has_pending_timer());

        // Heartbeat on an empty buffer goes idle.
        tokio::time::sleep(Duration::from_millis(101)).await;
        assert_eq!(batches(&sent).len(), 2);
        assert!(!tracker.has_pending_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_flushes_and_goes_idle() {
        let config = Config::default()
            .with_buffer_timeout(Duration::from_millis(100))
            .with_rearm(RearmPolicy::Rearm);
        let (tracker, sent) = tracker(config);
        tracker.track("t", "a", None);
        assert!(tracker.drain());
        assert!(!tracker.has_pending_timer());
        assert!(!tracker.drain());
        assert_eq!(batches(&sent).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_then_on_empty_buffer_calls_done() {
        let (tracker, sent) = tracker(Config::default());
        let (tx, rx) = tokio::sync::oneshot::channel();
        assert!(!tracker.send_then(move || {
            let _ = tx.send(());
        }));
        assert!(rx.await.is_ok());
        assert!(batches(&sent).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_callback_may_track_again() {
        let (tracker, sent) = tracker(Config::default());
        let again = tracker.clone();
        tracker.track("t", "a", None);
        assert!(tracker.send_then(move || again.track("t", "sent", None)));

        assert_eq!(batches(&sent), vec![vec!["web.a"]]);
        assert_eq!(tracker.pending(), 1);
        assert!(tracker.has_pending_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_from_done_callback_follows_current_batch() {
        let (tracker, sent) = tracker(Config::default());
        let again = tracker.clone();
        let (tx, rx) = std::sync::mpsc::channel();
        tracker.track("t", "a", None);
        tracker.track("t", "b", None);
        assert!(tracker.send_then(move || {
            again.track("t", "c", None);
            let _ = tx.send(again.send());
        }));

        assert_eq!(rx.try_recv(), Ok(true));
        assert_eq!(batches(&sent), vec![vec!["web.a", "web.b"], vec!["web.c"]]);
        assert_eq!(tracker.pending(), 0);
        assert!(!tracker.has_pending_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_tracker_cancels_timer() {
        let config = Config::default().with_buffer_timeout(Duration::from_millis(100));
        let (tracker, sent) = tracker(config);
        tracker.track("t", "a", None);
        drop(tracker);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(batches(&sent).is_empty());
    }
}
