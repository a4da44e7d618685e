use std::time::Duration;

use railsync_shared::{ClientId, Transport};

/// The set of currently connected clients, in join order.
#[derive(Debug, Default)]
pub struct UserRegistry {
    users: Vec<ClientId>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, client: ClientId) {
        if !self.users.contains(&client) {
            self.users.push(client);
        }
    }

    pub fn remove(&mut self, client: ClientId) {
        self.users.retain(|c| *c != client);
    }

    pub fn contains(&self, client: ClientId) -> bool {
        self.users.contains(&client)
    }

    pub fn count(&self) -> usize {
        self.users.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.users.iter().copied()
    }

    /// Every connected client except `excluding`.
    pub fn others(&self, excluding: ClientId) -> Vec<ClientId> {
        self.users.iter().copied().filter(|c| *c != excluding).collect()
    }
}

/// One-way latency estimate used by the handoff and barrier sequencing.
/// A client the transport has no measurement for counts as zero.
pub(crate) fn half_rtt(io: &dyn Transport, client: ClientId) -> Duration {
    io.rtt(client).unwrap_or(Duration::ZERO) / 2
}
