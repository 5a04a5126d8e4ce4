//! Server errors.

use thiserror::Error;

/// Failures starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not bind.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested `host:port`.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Other socket-level I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The global metrics recorder could not be installed.
    #[error("failed to install metrics recorder: {0}")]
    MetricsRecorder(String),
}
