use serde::{Deserialize, Serialize};

/// Delivery guarantee requested from the transport adapter. Fixed per message
/// tag; both ends agree out of band.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Reliability {
    /// Delivered and processed in send order.
    Reliable,
    /// Best effort, no ordering guarantee; reconciled by timestamp.
    Unreliable,
}
