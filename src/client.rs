//! Entry point holding a transport and per-name publisher/subscriber caches.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use crate::bus::{PublishOptions, Publisher, SubscribeOptions, Subscriber};
use crate::error::ConfigError;
use crate::lock;
use crate::transport::{EventBusTransport, PublishTransport, SubscribeTransport};

/// Connection settings for [`Client::connect`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientOptions {
    /// Store proxy address, e.g. `http://127.0.0.1:8081`
    pub endpoint: String,
}

impl ClientOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

/// Event bus client.
///
/// Hands out one shared [`Publisher`] per event bus and one [`Subscriber`]
/// per subscription id. A cached subscriber that has closed is replaced on
/// the next request.
pub struct Client {
    publish: Arc<dyn PublishTransport>,
    subscribe: Arc<dyn SubscribeTransport>,
    publishers: Mutex<HashMap<String, Arc<Publisher>>>,
    subscribers: Mutex<HashMap<String, Arc<Subscriber>>>,
}

impl Client {
    pub fn new<T: EventBusTransport + 'static>(transport: T) -> Self {
        let transport = Arc::new(transport);
        Self {
            publish: transport.clone(),
            subscribe: transport,
            publishers: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Create a gRPC client. The connection is made on first use.
    #[cfg(feature = "grpc")]
    pub fn connect(options: &ClientOptions) -> Result<Self, ConfigError> {
        let transport = crate::transport::grpc::GrpcTransport::connect_lazy(&options.endpoint)?;
        tracing::info!(endpoint = %options.endpoint, "event bus client created");
        Ok(Self::new(transport))
    }

    pub fn publisher(&self, options: PublishOptions) -> Result<Arc<Publisher>, ConfigError> {
        options.validate()?;
        let mut publishers = lock(&self.publishers);
        if let Some(publisher) = publishers.get(&options.eventbus) {
            return Ok(Arc::clone(publisher));
        }
        let eventbus = options.eventbus.clone();
        let publisher = Arc::new(Publisher::new(Arc::clone(&self.publish), options)?);
        publishers.insert(eventbus, Arc::clone(&publisher));
        Ok(publisher)
    }

    pub fn subscriber(&self, options: SubscribeOptions) -> Result<Arc<Subscriber>, ConfigError> {
        options.validate()?;
        let mut subscribers = lock(&self.subscribers);
        if let Some(subscriber) = subscribers.get(&options.subscription_id) {
            if !subscriber.is_closed() {
                return Ok(Arc::clone(subscriber));
            }
        }
        let id = options.subscription_id.clone();
        let subscriber = Arc::new(Subscriber::from_validated(
            Arc::clone(&self.subscribe),
            options,
        ));
        subscribers.insert(id, Arc::clone(&subscriber));
        Ok(subscriber)
    }

    /// Close every cached subscriber and empty both caches.
    pub fn close(&self) {
        let subscribers: Vec<_> = lock(&self.subscribers).drain().map(|(_, s)| s).collect();
        for subscriber in subscribers {
            subscriber.close();
        }
        lock(&self.publishers).clear();
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.close();
    }
}
