//! Receive loop and push ingress.
//!
//! Both turn delivery frames into queued [`Message`]s the same way: decode
//! every envelope, skip the ones that fail, and bind the rest to one
//! [`BatchAck`] whose outcome is reported back for the whole frame.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::batch::BatchAck;
use super::message::{AckHandle, Message, Outcome};
use crate::codec::{self, CloudEvent};
use crate::event::Event;
use crate::transport::{AckFrame, AckSink, CorrelationToken, EventStream, TransportError};

/// The dispatcher queue was closed while a frame was being enqueued.
#[derive(Debug)]
pub(crate) struct QueueClosed;

/// Producer side of the dispatcher queue.
#[derive(Clone)]
pub(crate) struct Ingest {
    queue: mpsc::Sender<Message>,
}

impl Ingest {
    pub(crate) fn new(queue: mpsc::Sender<Message>) -> Self {
        Self { queue }
    }

    /// Decode a frame and enqueue its events in order.
    ///
    /// Waits for queue space rather than dropping. `on_complete` fires once
    /// with the frame outcome; immediately when nothing in the frame decodes.
    pub(crate) async fn enqueue_batch(
        &self,
        token: CorrelationToken,
        envelopes: Vec<CloudEvent>,
        on_complete: impl FnOnce(Outcome) + Send + 'static,
    ) -> Result<usize, QueueClosed> {
        let events = decode_frame(token, envelopes);
        let count = events.len();
        let batch = BatchAck::new(count, Box::new(on_complete));

        for event in events {
            let batch = Arc::clone(&batch);
            let ack = AckHandle::new(move |outcome| batch.settle(outcome));
            self.queue
                .send(Message::new(event, token, ack))
                .await
                .map_err(|_| QueueClosed)?;
        }
        Ok(count)
    }
}

fn decode_frame(token: CorrelationToken, envelopes: Vec<CloudEvent>) -> Vec<Event> {
    envelopes
        .into_iter()
        .enumerate()
        .filter_map(|(index, envelope)| match codec::decode(envelope) {
            Ok(event) => Some(event),
            Err(error) => {
                warn!(token = token.0, index, %error, "skipping undecodable event");
                None
            }
        })
        .collect()
}

/// Entry point for push receivers.
///
/// Each accepted request is one frame; [`accept`](Self::accept) resolves
/// with the frame outcome once the handler has acknowledged every message.
#[derive(Clone)]
pub struct PushIngress {
    ingest: Ingest,
    next_token: Arc<AtomicU64>,
}

impl PushIngress {
    pub(crate) fn new(ingest: Ingest) -> Self {
        Self {
            ingest,
            next_token: Arc::new(AtomicU64::new(1)),
        }
    }

    pub async fn accept(&self, envelopes: Vec<CloudEvent>) -> Outcome {
        let token = CorrelationToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        let enqueued = self
            .ingest
            .enqueue_batch(token, envelopes, move |outcome| {
                let _ = tx.send(outcome);
            })
            .await;
        if enqueued.is_err() {
            return Outcome::Failed("subscriber is closed".into());
        }
        rx.await
            .unwrap_or_else(|_| Outcome::Failed("messages dropped without acknowledgment".into()))
    }
}

/// Counters reported when a receive loop ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct ReceiveStats {
    pub frames: usize,
    pub enqueued: usize,
}

/// Reads frames from a pull stream until shutdown, end of stream or error.
///
/// Every way out cancels `shutdown`, so the owning subscriber closes too.
pub(crate) struct ReceiveLoop {
    events: Box<dyn EventStream>,
    acks: Arc<dyn AckSink>,
    ingest: Ingest,
    shutdown: CancellationToken,
}

impl ReceiveLoop {
    pub(crate) fn new(
        events: Box<dyn EventStream>,
        acks: Arc<dyn AckSink>,
        ingest: Ingest,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            events,
            acks,
            ingest,
            shutdown,
        }
    }

    pub(crate) async fn run(mut self) -> Result<ReceiveStats, TransportError> {
        let mut stats = ReceiveStats::default();
        let result = self.pump(&mut stats).await;
        self.shutdown.cancel();
        debug!(frames = stats.frames, enqueued = stats.enqueued, "receive loop stopped");
        result.map(|()| stats)
    }

    async fn pump(&mut self, stats: &mut ReceiveStats) -> Result<(), TransportError> {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Ok(()),
                next = self.events.recv() => next,
            };
            let frame = match next {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    debug!("delivery stream ended");
                    return Ok(());
                }
                Err(error) => {
                    warn!(%error, "delivery stream failed");
                    return Err(error);
                }
            };
            stats.frames += 1;

            let token = frame.token;
            let acks = Arc::clone(&self.acks);
            let shutdown = self.shutdown.clone();
            let on_complete = move |outcome: Outcome| {
                let ack = AckFrame {
                    token,
                    success: outcome.is_success(),
                };
                if let Err(error) = acks.send(ack) {
                    warn!(token = token.0, %error, "ack write failed, closing stream");
                    shutdown.cancel();
                }
            };

            let enqueued = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Ok(()),
                enqueued = self.ingest.enqueue_batch(token, frame.events, on_complete) => enqueued,
            };
            match enqueued {
                Ok(count) => stats.enqueued += count,
                Err(QueueClosed) => return Ok(()),
            }
        }
    }
}
