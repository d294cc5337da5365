use thiserror::Error;

/// Convenient result alias for the movetrack library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Raised when a decoded ping is missing fields or carries out-of-range
    /// coordinates. Recovered per record: the batch skips it and continues.
    #[error("invalid ping: {reason}")]
    InvalidPing { reason: String },

    /// Raised when a required configuration variable is absent.
    #[error("missing required environment variable {name}")]
    MissingConfig { name: String },

    /// Raised when a configuration variable cannot be parsed.
    #[error("invalid value {value:?} for {name}")]
    InvalidConfig { name: String, value: String },

    /// Raised when appending an event to the durable sink fails. Whether this
    /// aborts the batch depends on the configured delivery policy.
    #[error("sink append failed: {message}")]
    Forward { message: String },

    /// Wrapper for cache (Redis) errors. Fatal for the batch: a failed get or
    /// set leaves cache and emitted-event state inconsistent.
    #[error("cache operation failed: {0}")]
    Cache(#[from] redis::RedisError),

    /// Wrapper for base64 decode errors on the raw record payload.
    #[error("record payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Wrapper for JSON errors on payloads and cache values.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Helper for constructing validation errors.
    pub(crate) fn invalid_ping(reason: impl Into<String>) -> Self {
        Error::InvalidPing {
            reason: reason.into(),
        }
    }
}
