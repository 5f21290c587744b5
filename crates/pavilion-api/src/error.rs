use thiserror::Error;

/// Errors produced by the transport layer.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Network-level failure (DNS, TLS, connection reset). Retryable by
    /// the caller's own policy.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status that is not an auth rejection.
    #[error("Server returned HTTP {status}")]
    Http { status: u16 },

    /// The bearer token was rejected and the one allowed refresh failed
    /// (or the retried request was rejected again). The session is over;
    /// the caller must redirect to login.
    #[error("Session expired")]
    AuthExpired,

    /// The server answered with a payload we could not decode.
    #[error("Malformed server payload: {0}")]
    Validation(String),

    /// The requested record does not exist.
    #[error("Record not found")]
    NotFound,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ApiError>;
