use thiserror::Error;

use crate::types::ClientId;

/// Errors surfaced by a transport adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Send addressed to a client the transport has no connection for.
    #[error("no connection for {client}")]
    UnknownClient { client: ClientId },

    /// The underlying connection dropped mid-send.
    #[error("connection to {client} closed")]
    ConnectionClosed { client: ClientId },
}
