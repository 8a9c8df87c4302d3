//! Transport seam between the subscriber pipeline and the event bus.
//!
//! ```text
//!   Subscriber (pull)                       Publisher
//!        │ open(subscription)                   │ publish(eventbus, batch)
//!        ▼                                      ▼
//! ┌──────────────────────┐            ┌──────────────────────┐
//! │  SubscribeTransport  │            │   PublishTransport   │
//! │  EventStream  ──▶ frames          └──────────────────────┘
//! │  AckSink     ◀── acks│
//! └──────────────────────┘
//!          │                    │                     │
//!          ▼                    ▼                     ▼
//!  ┌──────────────┐    ┌─────────────────┐    ┌──────────────┐
//!  │InMemoryBroker│    │ GrpcTransport   │    │ push servers │
//!  │  (tests)     │    │ (StoreProxy)    │    │ gRPC / HTTP  │
//!  └──────────────┘    └─────────────────┘    └──────────────┘
//! ```
//!
//! A transport only moves envelopes; decoding, dispatch and acknowledgment
//! policy live in [`crate::bus`].

mod error;
pub mod memory;

#[cfg(feature = "grpc")]
pub mod grpc;

#[cfg(feature = "http")]
pub mod http;

use std::sync::Arc;

use async_trait::async_trait;

use crate::codec::CloudEvent;

pub use error::TransportError;
pub use memory::InMemoryBroker;

/// Stream-assigned identifier of one delivery frame.
///
/// Opaque to the client; returned unchanged when the frame is acknowledged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationToken(pub u64);

/// One delivery from the bus: a token plus an ordered batch of envelopes.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub token: CorrelationToken,
    pub events: Vec<CloudEvent>,
}

/// Acknowledgment written back for a delivered frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AckFrame {
    pub token: CorrelationToken,
    pub success: bool,
}

/// Inbound half of an open subscription stream.
#[async_trait]
pub trait EventStream: Send {
    /// Wait for the next frame. `Ok(None)` means the server ended the stream.
    async fn recv(&mut self) -> Result<Option<Frame>, TransportError>;
}

/// Outbound acknowledgment half of an open subscription stream.
///
/// Shared between the receive loop and every pending batch, so sends take
/// `&self` and must be safe to call concurrently.
pub trait AckSink: Send + Sync {
    fn send(&self, ack: AckFrame) -> Result<(), TransportError>;

    /// Half-close the ack stream. Later sends fail with [`TransportError::Closed`].
    fn close(&self);
}

/// The two halves of an open subscription stream.
pub struct StreamPair {
    pub events: Box<dyn EventStream>,
    pub acks: Arc<dyn AckSink>,
}

/// Opens pull-mode subscription streams.
#[async_trait]
pub trait SubscribeTransport: Send + Sync {
    async fn open(&self, subscription_id: &str) -> Result<StreamPair, TransportError>;
}

/// Sends encoded batches to an event bus.
#[async_trait]
pub trait PublishTransport: Send + Sync {
    async fn publish(&self, eventbus: &str, events: Vec<CloudEvent>) -> Result<(), TransportError>;
}

/// A transport usable for both publishing and subscribing.
///
/// Blanket-implemented, so any type implementing both traits qualifies.
pub trait EventBusTransport: PublishTransport + SubscribeTransport {}

impl<T: PublishTransport + SubscribeTransport> EventBusTransport for T {}
