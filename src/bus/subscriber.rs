//! Subscriber lifecycle.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::dispatcher::Dispatcher;
use super::error::SubscribeError;
use super::handler::Handler;
use super::options::{Protocol, SubscribeOptions};
use super::receiver::{Ingest, PushIngress, ReceiveLoop};
use crate::error::ConfigError;
use crate::lock;
use crate::transport::{AckSink, SubscribeTransport};

/// Lifecycle state of a subscriber's stream.
///
/// `Idle → Streaming → Closed`, or `Idle → Closed` when closed before
/// listening. There is no way back from `Closed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Streaming,
    Closed,
}

/// Receives events for one subscription and hands them to a [`Handler`].
///
/// In active mode the subscriber pulls from the bus over a
/// [`SubscribeTransport`]; otherwise it serves a push receiver on
/// `0.0.0.0:{port}`. Either way, a receive side feeds a bounded queue and a
/// [`Dispatcher`] drains it.
pub struct Subscriber {
    options: SubscribeOptions,
    transport: Arc<dyn SubscribeTransport>,
    state: Mutex<StreamState>,
    acks: Mutex<Option<Arc<dyn AckSink>>>,
    local_addr: Mutex<Option<SocketAddr>>,
    shutdown: CancellationToken,
}

impl Subscriber {
    pub fn new(
        transport: Arc<dyn SubscribeTransport>,
        options: SubscribeOptions,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self::from_validated(transport, options))
    }

    pub(crate) fn from_validated(
        transport: Arc<dyn SubscribeTransport>,
        options: SubscribeOptions,
    ) -> Self {
        Self {
            options,
            transport,
            state: Mutex::new(StreamState::Idle),
            acks: Mutex::new(None),
            local_addr: Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn subscription_id(&self) -> &str {
        &self.options.subscription_id
    }

    pub fn options(&self) -> &SubscribeOptions {
        &self.options
    }

    pub fn state(&self) -> StreamState {
        *lock(&self.state)
    }

    pub fn is_closed(&self) -> bool {
        self.state() == StreamState::Closed
    }

    /// Address the push receiver is bound to, once it is listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *lock(&self.local_addr)
    }

    /// Receive and dispatch events until the subscriber closes.
    ///
    /// Returns `Ok(())` after [`close`](Self::close) or when the bus ends the
    /// stream, and the transport error when the stream fails. In every case
    /// the subscriber is `Closed` on return and every handler invocation has
    /// finished. A subscriber listens at most once.
    pub async fn listen<H: Handler>(&self, handler: H) -> Result<(), SubscribeError> {
        self.options.validate()?;
        self.begin()?;

        let (queue, pending) = mpsc::channel(self.options.queue_capacity);
        let dispatcher = Dispatcher::from_options(&self.options).spawn(
            pending,
            Arc::new(handler),
            self.shutdown.clone(),
        );
        let ingest = Ingest::new(queue);

        let result = if self.options.active_mode {
            self.pull(ingest).await
        } else {
            self.serve(ingest).await
        };

        self.close();
        if let Err(error) = dispatcher.await {
            warn!(subscription = %self.subscription_id(), %error, "dispatcher task failed");
        }
        result
    }

    /// Stop receiving. Idempotent; returns `true` for the call that closed.
    ///
    /// Buffered messages are still dispatched, but their acknowledgments can
    /// no longer reach the bus.
    pub fn close(&self) -> bool {
        {
            let mut state = lock(&self.state);
            if *state == StreamState::Closed {
                return false;
            }
            *state = StreamState::Closed;
        }
        if let Some(acks) = lock(&self.acks).take() {
            acks.close();
        }
        self.shutdown.cancel();
        info!(subscription = %self.subscription_id(), "subscriber closed");
        true
    }

    fn begin(&self) -> Result<(), SubscribeError> {
        let mut state = lock(&self.state);
        match *state {
            StreamState::Idle => {
                *state = StreamState::Streaming;
                Ok(())
            }
            StreamState::Streaming => Err(SubscribeError::AlreadyListening),
            StreamState::Closed => Err(SubscribeError::Closed),
        }
    }

    async fn pull(&self, ingest: Ingest) -> Result<(), SubscribeError> {
        let pair = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Ok(()),
            pair = self.transport.open(self.subscription_id()) => pair?,
        };
        {
            // close() may have run while the stream was opening
            let mut acks = lock(&self.acks);
            if self.shutdown.is_cancelled() {
                pair.acks.close();
                return Ok(());
            }
            *acks = Some(Arc::clone(&pair.acks));
        }
        info!(subscription = %self.subscription_id(), "subscription stream opened");

        ReceiveLoop::new(pair.events, pair.acks, ingest, self.shutdown.clone())
            .run()
            .await?;
        Ok(())
    }

    async fn serve(&self, ingest: Ingest) -> Result<(), SubscribeError> {
        let protocol = self.options.protocol;
        if !protocol_enabled(protocol) {
            return Err(SubscribeError::ProtocolUnavailable(protocol));
        }

        let listener =
            tokio::net::TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], self.options.port)))
                .await
                .map_err(crate::transport::TransportError::from)?;
        let addr = listener
            .local_addr()
            .map_err(crate::transport::TransportError::from)?;
        *lock(&self.local_addr) = Some(addr);
        info!(subscription = %self.subscription_id(), %addr, ?protocol, "push receiver listening");

        let ingress = PushIngress::new(ingest);
        let shutdown = self.shutdown.clone();
        match protocol {
            #[cfg(feature = "grpc")]
            Protocol::Grpc => {
                crate::transport::grpc::serve_push(listener, ingress, shutdown).await?
            }
            #[cfg(feature = "http")]
            Protocol::Http => {
                crate::transport::http::serve_push(listener, ingress, shutdown).await?
            }
            #[allow(unreachable_patterns)]
            _ => {
                let _ = (listener, ingress, shutdown);
                return Err(SubscribeError::ProtocolUnavailable(protocol));
            }
        }
        Ok(())
    }
}

fn protocol_enabled(protocol: Protocol) -> bool {
    match protocol {
        Protocol::Grpc => cfg!(feature = "grpc"),
        Protocol::Http => cfg!(feature = "http"),
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
