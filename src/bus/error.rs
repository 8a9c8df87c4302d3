use thiserror::Error;

use super::options::Protocol;
use crate::codec::EncodeError;
use crate::error::ConfigError;
use crate::transport::TransportError;

/// Error returned by [`Publisher`](super::Publisher).
#[derive(Debug, Error)]
pub enum PublishError {
    /// Nothing was sent.
    #[error("encode failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),
}

/// Error returned by [`Subscriber::listen`](super::Subscriber::listen).
#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("subscriber is already listening")]
    AlreadyListening,

    #[error("subscriber is closed")]
    Closed,

    #[error("protocol {0:?} is not enabled in this build")]
    ProtocolUnavailable(Protocol),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Error a [`Handler`](super::Handler) reports for a batch.
///
/// Logged and counted by the dispatcher. It does not acknowledge anything:
/// messages the handler left unacknowledged keep their batch pending.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("handler error: {0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        HandlerError::Rejected(reason.into())
    }
}
