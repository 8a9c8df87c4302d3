//! Shared helpers for pipeline tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use eventbus_client::transport::{
    AckFrame, AckSink, EventStream, Frame, StreamPair, SubscribeTransport,
};
use eventbus_client::{encode, CorrelationToken, Event, TransportError};

pub fn event(id: impl Into<String>) -> Event {
    Event::new(id, "order-service", "OrderCreated").with_text("text/plain", "payload")
}

pub fn frame(token: u64, ids: &[&str]) -> Frame {
    Frame {
        token: CorrelationToken(token),
        events: ids.iter().map(|id| encode(&event(*id)).unwrap()).collect(),
    }
}

/// Poll `condition` until it holds, panicking after a few seconds.
pub async fn eventually(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Transport that plays back a fixed script of frames and errors, then
/// stays silent.
pub struct ScriptedTransport {
    script: Mutex<Option<VecDeque<Result<Frame, TransportError>>>>,
    pub reads: Arc<AtomicUsize>,
    pub acks: Arc<Mutex<Vec<AckFrame>>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<Frame, TransportError>>) -> Self {
        Self {
            script: Mutex::new(Some(script.into())),
            reads: Arc::new(AtomicUsize::new(0)),
            acks: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl SubscribeTransport for ScriptedTransport {
    async fn open(&self, _subscription_id: &str) -> Result<StreamPair, TransportError> {
        let script = self.script.lock().unwrap().take().ok_or(TransportError::Closed)?;
        Ok(StreamPair {
            events: Box::new(ScriptedStream {
                script,
                reads: Arc::clone(&self.reads),
            }),
            acks: Arc::new(RecordingAcks(Arc::clone(&self.acks))),
        })
    }
}

struct ScriptedStream {
    script: VecDeque<Result<Frame, TransportError>>,
    reads: Arc<AtomicUsize>,
}

#[async_trait]
impl EventStream for ScriptedStream {
    async fn recv(&mut self) -> Result<Option<Frame>, TransportError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match self.script.pop_front() {
            Some(next) => next.map(Some),
            None => std::future::pending().await,
        }
    }
}

struct RecordingAcks(Arc<Mutex<Vec<AckFrame>>>);

impl AckSink for RecordingAcks {
    fn send(&self, ack: AckFrame) -> Result<(), TransportError> {
        self.0.lock().unwrap().push(ack);
        Ok(())
    }

    fn close(&self) {}
}
