use std::time::Duration;

use crate::RearmPolicy;

/// Buffering configuration shared by both tracker variants.
///
/// Use the builder methods to customize, or [`Default`] for sensible defaults.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use beaconry::{Config, RearmPolicy};
///
/// let config = Config::default()
///     .with_buffer_length(50)                          // Larger batches
///     .with_buffer_timeout(Duration::from_secs(2))     // Flush at least every 2s
///     .with_rearm(RearmPolicy::Rearm);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of buffered envelopes that forces a flush.
    /// A value of 0 behaves like 1.
    /// Default: 25
    pub buffer_length: usize,

    /// Maximum age of a buffer window before it is flushed.
    /// `Duration::ZERO` disables buffering: every `track` is its own batch.
    /// Default: 5 s
    pub buffer_timeout: Duration,

    /// Merge the injected client context into every envelope.
    /// Default: false
    pub append_client_context: bool,

    /// Identity of the current user, written as a top-level `user_id`
    /// field of unsigned envelopes. Ignored by the authenticated variant.
    /// Default: None
    pub user_id: Option<String>,

    /// Timer behavior after a flush.
    /// Default: [`RearmPolicy::Idle`]
    pub rearm: RearmPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            buffer_length: 25,
            buffer_timeout: Duration::from_secs(5),
            append_client_context: false,
            user_id: None,
            rearm: RearmPolicy::default(),
        }
    }
}

impl Config {
    /// Set how many envelopes may accumulate before a flush is forced.
    pub fn with_buffer_length(mut self, length: usize) -> Self {
        self.buffer_length = length;
        self
    }

    /// Set the maximum age of a buffer window.
    ///
    /// The timer starts with the first envelope of a window and is never
    /// pushed back by later appends, so no envelope waits longer than this.
    pub fn with_buffer_timeout(mut self, timeout: Duration) -> Self {
        self.buffer_timeout = timeout;
        self
    }

    pub fn with_client_context(mut self, append: bool) -> Self {
        self.append_client_context = append;
        self
    }

    pub fn with_user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_rearm(mut self, rearm: RearmPolicy) -> Self {
        self.rearm = rearm;
        self
    }

    /// Whether envelopes are buffered at all.
    #[inline]
    pub fn is_buffering(&self) -> bool {
        !self.buffer_timeout.is_zero()
    }

    /// Effective size threshold.
    #[inline]
    pub(crate) fn flush_threshold(&self) -> usize {
        self.buffer_length.max(1)
    }
}
