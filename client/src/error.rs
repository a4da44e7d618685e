use railsync_shared::TransportError;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
}
