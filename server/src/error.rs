use thiserror::Error;

use railsync_shared::TransportError;

/// Errors a server dispatch pass can surface. Replication anomalies (stale
/// updates, unknown ids, partial relations) are not errors; they degrade to
/// skip-and-log by design.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServerError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}
