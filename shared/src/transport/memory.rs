use std::collections::HashMap;
use std::time::Duration;

use crate::{
    messages::{message::Message, reliability::Reliability},
    transport::{error::TransportError, Transport},
    types::ClientId,
};

/// One message handed to the transport, kept for inspection.
#[derive(Clone, PartialEq, Debug)]
pub struct SentMessage {
    pub to: ClientId,
    pub message: Message,
    pub reliability: Reliability,
}

/// In-memory transport with scripted round-trip times. Records everything it
/// is asked to send; used to drive the dispatchers in tests and local loops.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    rtts: HashMap<ClientId, Duration>,
    sent: Vec<SentMessage>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection with the given measured round-trip time.
    pub fn connect(&mut self, client: ClientId, rtt: Duration) {
        self.rtts.insert(client, rtt);
    }

    pub fn disconnect(&mut self, client: ClientId) {
        self.rtts.remove(&client);
    }

    pub fn set_rtt(&mut self, client: ClientId, rtt: Duration) {
        self.rtts.insert(client, rtt);
    }

    /// Drains the record of sent messages.
    pub fn take_sent(&mut self) -> Vec<SentMessage> {
        std::mem::take(&mut self.sent)
    }

    pub fn sent(&self) -> &[SentMessage] {
        &self.sent
    }

    pub fn sent_to(&self, client: ClientId) -> Vec<&SentMessage> {
        self.sent.iter().filter(|s| s.to == client).collect()
    }
}

impl Transport for MemoryTransport {
    fn send(
        &mut self,
        to: ClientId,
        message: &Message,
        reliability: Reliability,
    ) -> Result<(), TransportError> {
        if !self.rtts.contains_key(&to) {
            return Err(TransportError::UnknownClient { client: to });
        }
        self.sent.push(SentMessage {
            to,
            message: message.clone(),
            reliability,
        });
        Ok(())
    }

    fn rtt(&self, client: ClientId) -> Option<Duration> {
        self.rtts.get(&client).copied()
    }
}
