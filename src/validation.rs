use crate::{Error, Result};

/// Reject names that are unsafe to use as identifiers downstream.
///
/// Only ASCII letters and digits are accepted. An empty name passes here;
/// presence is checked separately when a tracker is built.
pub fn validate_name(name: &str) -> Result {
    if name.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier(name.to_owned()))
    }
}
