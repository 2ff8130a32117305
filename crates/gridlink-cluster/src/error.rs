//! Error types for cluster sessions.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur while starting or stopping a cluster session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The external cluster was unreachable or rejected the connection
    /// config. Never retried here; retry policy belongs to the caller.
    #[error("failed to connect to cluster: {0}")]
    Connect(String),

    /// The remote side did not acknowledge a graceful close in time.
    /// The connection is abandoned best-effort after this.
    #[error("cluster did not acknowledge close within {0:?}")]
    ShutdownTimeout(Duration),
}
