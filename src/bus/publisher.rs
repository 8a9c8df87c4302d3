//! Publishing events to an event bus.

use std::sync::Arc;

use tracing::debug;

use super::error::PublishError;
use super::options::PublishOptions;
use crate::codec;
use crate::error::ConfigError;
use crate::event::Event;
use crate::transport::PublishTransport;

/// Publishes events to one named event bus.
///
/// A batch is encoded in full before anything is sent, so an event that
/// fails to encode means none of the batch reaches the bus.
pub struct Publisher {
    eventbus: String,
    transport: Arc<dyn PublishTransport>,
}

impl Publisher {
    pub fn new(
        transport: Arc<dyn PublishTransport>,
        options: PublishOptions,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self {
            eventbus: options.eventbus,
            transport,
        })
    }

    pub fn eventbus(&self) -> &str {
        &self.eventbus
    }

    /// Publish a single event.
    pub async fn publish(&self, event: &Event) -> Result<(), PublishError> {
        self.publish_batch(std::slice::from_ref(event)).await
    }

    /// Publish events as one ordered batch.
    pub async fn publish_batch(&self, events: &[Event]) -> Result<(), PublishError> {
        if events.is_empty() {
            return Ok(());
        }
        let batch = codec::encode_batch(events)?;
        self.transport.publish(&self.eventbus, batch.events).await?;
        debug!(eventbus = %self.eventbus, count = events.len(), "published events");
        Ok(())
    }
}
