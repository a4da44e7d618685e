use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical timestamp carried by positional updates, used for staleness rejection.
/// Monotonically increasing per sender; never compared across entities.
pub type Timestamp = u64;

/// Identifies one connected participant of the shared session.
///
/// The hosting player always occupies id `0`; an entity whose authority owner
/// is [`ClientId::HOST`] is considered unowned (host-simulated).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct ClientId(u64);

impl ClientId {
    pub const HOST: ClientId = ClientId(0);

    pub fn new(value: u64) -> Self {
        ClientId(value)
    }

    pub fn is_host(&self) -> bool {
        *self == Self::HOST
    }

    pub fn to_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client#{}", self.0)
    }
}
