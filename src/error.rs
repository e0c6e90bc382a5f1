#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Required argument '{0}' is missing")]
    MissingArgument(&'static str),

    #[error("Identifier '{0}' may only contain ASCII letters and digits")]
    InvalidIdentifier(String),

    #[error("A buffer timeout requires a Tokio runtime, but none is running")]
    NoRuntime,

    #[error("Couldn't serialize the batch: {0}")]
    Serialization(#[from] serde_json::Error),
}
