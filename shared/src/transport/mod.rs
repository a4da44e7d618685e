pub mod error;
pub mod memory;

use std::time::Duration;

use crate::{
    messages::{message::Message, reliability::Reliability},
    types::ClientId,
};

use error::TransportError;

/// Boundary to the external connection layer. The replication core only sends
/// tagged messages with a per-tag delivery guarantee and reads the smoothed
/// round-trip estimate; connection lifecycle, framing and retransmission live
/// on the other side.
pub trait Transport {
    fn send(
        &mut self,
        to: ClientId,
        message: &Message,
        reliability: Reliability,
    ) -> Result<(), TransportError>;

    /// Smoothed round-trip time to the given client, if connected.
    fn rtt(&self, client: ClientId) -> Option<Duration>;
}

/// Events delivered by the connection layer into the dispatch context.
#[derive(Clone, PartialEq, Debug)]
pub enum TransportEvent {
    Connected(ClientId),
    Disconnected(ClientId),
    Message { from: ClientId, message: Message },
}
