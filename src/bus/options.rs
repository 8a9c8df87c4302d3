//! Publisher and subscriber configuration.

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::ConfigError;

pub const DEFAULT_PARALLELISM: usize = 4;
pub const DEFAULT_BATCH_SIZE: usize = 16;
pub const DEFAULT_PORT: u16 = 8080;

/// Capacity of the queue between the receive loop and the dispatcher.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Largest accepted `parallelism`: one semaphore permit per handler slot,
/// all of which the dispatcher reclaims in a single acquire on shutdown.
pub const MAX_PARALLELISM: usize = if Semaphore::MAX_PERMITS < u32::MAX as usize {
    Semaphore::MAX_PERMITS
} else {
    u32::MAX as usize
};

/// Largest accepted `queue_capacity`, the bound of a tokio channel.
pub const MAX_QUEUE_CAPACITY: usize = Semaphore::MAX_PERMITS;

/// Wire protocol of the passive (push) receiver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Grpc,
    Http,
}

/// Subscriber configuration.
///
/// Deserializable with every field but `subscription_id` optional:
///
/// ```
/// use eventbus_client::bus::SubscribeOptions;
///
/// let options: SubscribeOptions =
///     serde_json::from_str(r#"{ "subscription_id": "audit", "batch_size": 8 }"#).unwrap();
/// assert_eq!(options.batch_size, 8);
/// assert_eq!(options.parallelism, 4);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscribeOptions {
    pub subscription_id: String,
    /// Upper bound on concurrently running handler invocations
    pub parallelism: usize,
    /// Upper bound on messages per handler invocation
    pub batch_size: usize,
    /// Pull from the bus (`true`) or serve a push receiver (`false`)
    pub active_mode: bool,
    /// Listen port of the push receiver
    pub port: u16,
    pub protocol: Protocol,
    pub queue_capacity: usize,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            subscription_id: String::new(),
            parallelism: DEFAULT_PARALLELISM,
            batch_size: DEFAULT_BATCH_SIZE,
            active_mode: true,
            port: DEFAULT_PORT,
            protocol: Protocol::Grpc,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl SubscribeOptions {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            ..Self::default()
        }
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_active_mode(mut self, active: bool) -> Self {
        self.active_mode = active;
        self
    }

    /// Switch to push mode on the given port and protocol.
    pub fn with_push(mut self, port: u16, protocol: Protocol) -> Self {
        self.active_mode = false;
        self.port = port;
        self.protocol = protocol;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subscription_id.is_empty() {
            return Err(ConfigError::MissingSubscriptionId);
        }
        if self.parallelism == 0 {
            return Err(ConfigError::Zero("parallelism"));
        }
        if self.parallelism > MAX_PARALLELISM {
            return Err(ConfigError::TooLarge {
                field: "parallelism",
                max: MAX_PARALLELISM,
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Zero("batch_size"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Zero("queue_capacity"));
        }
        if self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(ConfigError::TooLarge {
                field: "queue_capacity",
                max: MAX_QUEUE_CAPACITY,
            });
        }
        Ok(())
    }
}

/// Publisher configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOptions {
    pub eventbus: String,
}

impl PublishOptions {
    pub fn new(eventbus: impl Into<String>) -> Self {
        Self {
            eventbus: eventbus.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.eventbus.is_empty() {
            return Err(ConfigError::MissingEventbus);
        }
        Ok(())
    }
}
