//! Error types for session lifecycle management.

use thiserror::Error;

use gridlink_cluster::SessionError;
use gridlink_core::ResourceId;

/// Result type alias for lifecycle operations.
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Errors surfaced by the session lifecycle manager.
///
/// Stop-side failures (shutdown timeouts) are deliberately absent: they
/// are logged and absorbed so that one stuck connection can never fail
/// the reconcile loop for unrelated resources.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// A session could not be started for a resource. The caller owns
    /// retry/backoff policy.
    #[error("failed to start session for {resource}: {source}")]
    Start {
        resource: ResourceId,
        source: SessionError,
    },
}
