use std::fmt;

/// What the flush timer does once a batch has been handed to the transport.
///
/// - `Idle`: no timer until the next `track` call starts a new buffer window.
/// - `Rearm`: a fresh timer is scheduled right after every non-empty flush,
///   acting as a heartbeat. A heartbeat that fires on an empty buffer goes idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum RearmPolicy {
    #[default]
    Idle,
    Rearm,
}

impl RearmPolicy {
    pub fn is_rearm(&self) -> bool {
        matches!(self, RearmPolicy::Rearm)
    }
}

impl fmt::Display for RearmPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RearmPolicy::Idle => write!(f, "Idle"),
            RearmPolicy::Rearm => write!(f, "Rearm"),
        }
    }
}
