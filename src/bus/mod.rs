//! Event bus client: publishing, subscribing and acknowledgment.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Transport (pull or push)                    │
//! │  frames of envelopes  ──▶        ◀── one ack per frame       │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │          ReceiveLoop / PushIngress (per subscriber)          │
//! │  decode, skip malformed, bind messages to a BatchAck         │
//! └─────────────────────────────────────────────────────────────┘
//!                            │ bounded queue (backpressure)
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Dispatcher                           │
//! │  ≤ parallelism handler calls, ≤ batch_size messages each     │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//!                Handler: message.success() / failed()
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use eventbus_client::bus::{HandlerError, Message, SubscribeOptions, Subscriber};
//! use eventbus_client::transport::InMemoryBroker;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let broker = InMemoryBroker::new();
//! broker.bind("audit", "orders");
//!
//! let subscriber = Subscriber::new(Arc::new(broker), SubscribeOptions::new("audit"))?;
//! subscriber
//!     .listen(|batch: Vec<Message>| async move {
//!         for message in &batch {
//!             println!("{}", message.event().event_type);
//!             message.success();
//!         }
//!         Ok::<_, HandlerError>(())
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod batch;
mod dispatcher;
mod error;
mod handler;
mod message;
mod options;
mod publisher;
mod receiver;
mod subscriber;

pub use dispatcher::{DispatchStats, Dispatcher};
pub use error::{HandlerError, PublishError, SubscribeError};
pub use handler::Handler;
pub use message::{AckHandle, Message, Outcome};
pub use options::{
    PublishOptions, Protocol, SubscribeOptions, DEFAULT_BATCH_SIZE, DEFAULT_PARALLELISM,
    DEFAULT_PORT, DEFAULT_QUEUE_CAPACITY, MAX_PARALLELISM, MAX_QUEUE_CAPACITY,
};
pub use publisher::Publisher;
pub use receiver::PushIngress;
pub use subscriber::{StreamState, Subscriber};
