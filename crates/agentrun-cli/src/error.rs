//! Error types for the CLI client.

use thiserror::Error;

/// Errors that can occur when talking to the server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with an error status.
    #[error("server returned {status}: {detail}")]
    Api { status: u16, detail: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Event stream could not be opened or broke mid-way.
    #[error("event stream error: {0}")]
    Stream(String),

    /// Event stream closed before the terminal status event.
    #[error("event stream closed before the run finished")]
    StreamClosed,
}
