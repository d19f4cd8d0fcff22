//! Error types for the environment abstraction.

use thiserror::Error;

/// Errors surfaced by transport implementations.
///
/// None of these are fatal to the core: a failed submission is returned to
/// the caller for retry, and a closed stream triggers the reconnect
/// contract.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server answered with a non-2xx status
    #[error("HTTP {0}")]
    Http(u16),

    /// The request never completed (DNS, connect, reset, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// Payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The stream was closed and will not deliver further messages
    #[error("Stream closed")]
    Closed,
}

impl TransportError {
    /// Creates a network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Creates a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}
