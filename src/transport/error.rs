use thiserror::Error;

/// Failure of the underlying stream or call.
///
/// Fatal to the stream it occurs on: the subscriber closes and does not
/// reconnect.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("stream closed")]
    Closed,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("stream failed: {0}")]
    Stream(String),

    #[error("unknown subscription: {0}")]
    UnknownSubscription(String),

    #[cfg(feature = "grpc")]
    #[error("rpc failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
