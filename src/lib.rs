//! Event bus client.
//!
//! Publishes [`Event`]s to named event buses and consumes them through
//! subscriptions, either by pulling a gRPC stream from the store proxy or by
//! serving a push receiver the bus calls into. Received events are delivered
//! to a [`Handler`] in bounded batches with bounded concurrency, and every
//! message is acknowledged exactly once.
//!
//! ```no_run
//! use eventbus_client::{Client, ClientOptions, Event, PublishOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::connect(&ClientOptions::new("http://127.0.0.1:8081"))?;
//! let publisher = client.publisher(PublishOptions::new("orders"))?;
//! let event = Event::new("evt-1", "order-service", "OrderCreated").with_text("text/plain", "42");
//! publisher.publish(&event).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod bus;
mod client;
pub mod codec;
mod error;
mod event;
pub mod transport;

pub use bus::{
    AckHandle, DispatchStats, Handler, HandlerError, Message, Outcome, Protocol, PublishError,
    PublishOptions, Publisher, StreamState, SubscribeError, SubscribeOptions, Subscriber,
};
pub use client::{Client, ClientOptions};
pub use codec::{decode, encode, CloudEvent, DecodeError, EncodeError};
pub use error::ConfigError;
pub use event::{
    AttributeValue, Data, Event, UriRef, CONTENT_TYPE_BITCODE, CONTENT_TYPE_JSON,
    CONTENT_TYPE_PROTOBUF, SPEC_VERSION,
};
pub use transport::{CorrelationToken, TransportError};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
