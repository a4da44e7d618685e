use std::time::Duration;

/// Contains server tunables.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// How long an initialization barrier may wait for acknowledgments before
    /// it is force-completed and the non-responding clients are logged.
    /// `None` means a barrier only releases when the straggler disconnects.
    pub barrier_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            barrier_timeout: None,
        }
    }
}
