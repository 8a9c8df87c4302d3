//! In-memory broker for tests and single-process use.
//!
//! Implements both [`PublishTransport`] and [`SubscribeTransport`]. Each
//! subscription is bound to one event bus; every published batch becomes a
//! frame for each subscription bound to that bus. Frames published while no
//! stream is open are kept and replayed when the subscription opens.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    AckFrame, AckSink, CorrelationToken, EventStream, Frame, PublishTransport, StreamPair,
    SubscribeTransport, TransportError,
};
use crate::codec::CloudEvent;
use crate::lock;

type Delivery = Result<Frame, TransportError>;

/// In-memory event bus.
///
/// Cheap to clone; clones share the same state.
///
/// ## Example
///
/// ```
/// use eventbus_client::transport::InMemoryBroker;
///
/// let broker = InMemoryBroker::new();
/// broker.bind("orders-audit", "orders");
/// assert!(broker.published("orders").is_empty());
/// ```
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

#[derive(Default)]
struct BrokerState {
    buses: HashMap<String, Vec<CloudEvent>>,
    subscriptions: HashMap<String, Subscription>,
    next_token: u64,
}

struct Subscription {
    eventbus: String,
    backlog: Vec<Frame>,
    delivery: Option<mpsc::UnboundedSender<Delivery>>,
    acks: Vec<AckFrame>,
}

impl BrokerState {
    fn next_token(&mut self) -> CorrelationToken {
        self.next_token += 1;
        CorrelationToken(self.next_token)
    }
}

impl Subscription {
    fn push(&mut self, frame: Frame) {
        let undelivered = match &self.delivery {
            Some(tx) => tx.send(Ok(frame)).err().and_then(|e| e.0.ok()),
            None => Some(frame),
        };
        if let Some(frame) = undelivered {
            self.delivery = None;
            self.backlog.push(frame);
        }
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a subscription that receives every batch published to `eventbus`.
    pub fn bind(&self, subscription_id: impl Into<String>, eventbus: impl Into<String>) {
        let mut state = lock(&self.state);
        state
            .subscriptions
            .entry(subscription_id.into())
            .or_insert_with(|| Subscription {
                eventbus: eventbus.into(),
                backlog: Vec::new(),
                delivery: None,
                acks: Vec::new(),
            });
    }

    /// Deliver a raw frame to one subscription, bypassing any event bus.
    ///
    /// Lets tests inject envelopes a publisher would refuse to encode.
    pub fn deliver(
        &self,
        subscription_id: &str,
        events: Vec<CloudEvent>,
    ) -> Result<CorrelationToken, TransportError> {
        let mut state = lock(&self.state);
        let token = state.next_token();
        let subscription = state
            .subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| TransportError::UnknownSubscription(subscription_id.to_string()))?;
        subscription.push(Frame { token, events });
        Ok(token)
    }

    /// End the open stream of a subscription as if the server closed it.
    pub fn disconnect(&self, subscription_id: &str) {
        if let Some(subscription) = lock(&self.state).subscriptions.get_mut(subscription_id) {
            subscription.delivery = None;
        }
    }

    /// Fail the open stream of a subscription with a transport error.
    pub fn fail(&self, subscription_id: &str, reason: impl Into<String>) {
        if let Some(subscription) = lock(&self.state).subscriptions.get_mut(subscription_id) {
            if let Some(tx) = subscription.delivery.take() {
                let _ = tx.send(Err(TransportError::Stream(reason.into())));
            }
        }
    }

    /// Every envelope published to `eventbus`, in publish order.
    pub fn published(&self, eventbus: &str) -> Vec<CloudEvent> {
        lock(&self.state)
            .buses
            .get(eventbus)
            .cloned()
            .unwrap_or_default()
    }

    /// Acknowledgments received for a subscription, in arrival order.
    pub fn acknowledged(&self, subscription_id: &str) -> Vec<AckFrame> {
        lock(&self.state)
            .subscriptions
            .get(subscription_id)
            .map(|s| s.acks.clone())
            .unwrap_or_default()
    }

    /// Whether a stream is currently open for the subscription.
    pub fn is_streaming(&self, subscription_id: &str) -> bool {
        lock(&self.state)
            .subscriptions
            .get(subscription_id)
            .and_then(|s| s.delivery.as_ref())
            .is_some_and(|tx| !tx.is_closed())
    }
}

#[async_trait]
impl PublishTransport for InMemoryBroker {
    async fn publish(&self, eventbus: &str, events: Vec<CloudEvent>) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        state
            .buses
            .entry(eventbus.to_string())
            .or_default()
            .extend(events.iter().cloned());

        let bound: Vec<String> = state
            .subscriptions
            .iter()
            .filter(|(_, s)| s.eventbus == eventbus)
            .map(|(id, _)| id.clone())
            .collect();
        for id in bound {
            let token = state.next_token();
            if let Some(subscription) = state.subscriptions.get_mut(&id) {
                subscription.push(Frame {
                    token,
                    events: events.clone(),
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SubscribeTransport for InMemoryBroker {
    async fn open(&self, subscription_id: &str) -> Result<StreamPair, TransportError> {
        let mut state = lock(&self.state);
        let subscription = state
            .subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| TransportError::UnknownSubscription(subscription_id.to_string()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        for frame in subscription.backlog.drain(..) {
            let _ = tx.send(Ok(frame));
        }
        subscription.delivery = Some(tx);

        Ok(StreamPair {
            events: Box::new(MemoryEventStream { rx }),
            acks: Arc::new(MemoryAckSink {
                state: Arc::clone(&self.state),
                subscription_id: subscription_id.to_string(),
                closed: AtomicBool::new(false),
            }),
        })
    }
}

struct MemoryEventStream {
    rx: mpsc::UnboundedReceiver<Delivery>,
}

#[async_trait]
impl EventStream for MemoryEventStream {
    async fn recv(&mut self) -> Result<Option<Frame>, TransportError> {
        self.rx.recv().await.transpose()
    }
}

struct MemoryAckSink {
    state: Arc<Mutex<BrokerState>>,
    subscription_id: String,
    closed: AtomicBool,
}

impl AckSink for MemoryAckSink {
    fn send(&self, ack: AckFrame) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        let mut state = lock(&self.state);
        let subscription = state
            .subscriptions
            .get_mut(&self.subscription_id)
            .ok_or(TransportError::Closed)?;
        subscription.acks.push(ack);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
