//! gRPC transport: the store proxy client and the push receiver.
//!
//! Requires the `grpc` feature. Message types are prost derives (standard
//! protobuf wire format, no `.proto` file); service stubs are generated in
//! `build.rs`.
//!
//! ## RPCs
//!
//! - `eventbus.proxy.StoreProxy/Publish`: unary, one batch to one event bus.
//! - `eventbus.proxy.StoreProxy/Subscribe`: server stream of delivery frames.
//! - `eventbus.proxy.StoreProxy/Ack`: client stream of frame acknowledgments.
//! - `eventbus.cloudevents.CloudEvents/Send`: unary push into a subscriber.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{TcpListenerStream, UnboundedReceiverStream};
use tokio_util::sync::CancellationToken;
use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Response, Status};
use tracing::debug;

use super::{
    AckFrame, AckSink, CorrelationToken, EventStream, Frame, PublishTransport, StreamPair,
    SubscribeTransport, TransportError,
};
use crate::bus::{Outcome, PushIngress};
use crate::codec::{CloudEvent, CloudEventBatch};
use crate::error::ConfigError;
use crate::lock;

// ---------------------------------------------------------------------------
// Message types
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, prost::Message)]
pub struct Empty {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PublishRequest {
    #[prost(string, tag = "1")]
    pub eventbus_name: String,
    #[prost(message, optional, tag = "2")]
    pub events: Option<CloudEventBatch>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SubscribeRequest {
    #[prost(string, tag = "1")]
    pub subscription_id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SubscribeResponse {
    #[prost(uint64, tag = "1")]
    pub sequence_id: u64,
    #[prost(message, optional, tag = "2")]
    pub events: Option<CloudEventBatch>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AckRequest {
    #[prost(uint64, tag = "1")]
    pub sequence_id: u64,
    #[prost(string, tag = "2")]
    pub subscription_id: String,
    #[prost(bool, tag = "3")]
    pub success: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BatchEvent {
    #[prost(string, tag = "1")]
    pub eventbus_name: String,
    #[prost(message, optional, tag = "2")]
    pub events: Option<CloudEventBatch>,
}

// ---------------------------------------------------------------------------
// Generated service traits + servers/clients
// ---------------------------------------------------------------------------

include!(concat!(env!("OUT_DIR"), "/eventbus.proxy.StoreProxy.rs"));
include!(concat!(env!("OUT_DIR"), "/eventbus.cloudevents.CloudEvents.rs"));

pub use cloud_events_client::CloudEventsClient;
pub use cloud_events_server::{CloudEvents, CloudEventsServer};
pub use store_proxy_client::StoreProxyClient;
pub use store_proxy_server::{StoreProxy, StoreProxyServer};

fn batch(events: Option<CloudEventBatch>) -> Vec<CloudEvent> {
    events.map(|b| b.events).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Client transport
// ---------------------------------------------------------------------------

/// Pull and publish over the store proxy.
#[derive(Clone)]
pub struct GrpcTransport {
    client: StoreProxyClient<Channel>,
}

impl GrpcTransport {
    pub fn new(channel: Channel) -> Self {
        Self {
            client: StoreProxyClient::new(channel),
        }
    }

    /// Build a transport whose connection is established on first use.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect_lazy(endpoint: &str) -> Result<Self, ConfigError> {
        let endpoint = parse_endpoint(endpoint)?;
        Ok(Self::new(endpoint.connect_lazy()))
    }

    /// Connect eagerly, failing if the endpoint is unreachable.
    pub async fn connect(endpoint: &str) -> Result<Self, TransportError> {
        let endpoint =
            parse_endpoint(endpoint).map_err(|e| TransportError::Connect(e.to_string()))?;
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(Self::new(channel))
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Endpoint, ConfigError> {
    if endpoint.is_empty() {
        return Err(ConfigError::MissingEndpoint);
    }
    Endpoint::from_shared(endpoint.to_string()).map_err(|e| ConfigError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl PublishTransport for GrpcTransport {
    async fn publish(&self, eventbus: &str, events: Vec<CloudEvent>) -> Result<(), TransportError> {
        let mut client = self.client.clone();
        client
            .publish(PublishRequest {
                eventbus_name: eventbus.to_string(),
                events: Some(CloudEventBatch { events }),
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SubscribeTransport for GrpcTransport {
    async fn open(&self, subscription_id: &str) -> Result<StreamPair, TransportError> {
        let mut client = self.client.clone();
        let inbound = client
            .subscribe(SubscribeRequest {
                subscription_id: subscription_id.to_string(),
            })
            .await?
            .into_inner();

        let (tx, rx) = mpsc::unbounded_channel();
        let mut ack_client = self.client.clone();
        let id = subscription_id.to_string();
        tokio::spawn(async move {
            match ack_client.ack(UnboundedReceiverStream::new(rx)).await {
                Ok(_) => debug!(subscription = %id, "ack stream finished"),
                Err(status) => debug!(subscription = %id, %status, "ack stream failed"),
            }
        });

        Ok(StreamPair {
            events: Box::new(GrpcEventStream { inbound }),
            acks: Arc::new(GrpcAckSink {
                subscription_id: subscription_id.to_string(),
                sender: Mutex::new(Some(tx)),
            }),
        })
    }
}

struct GrpcEventStream {
    inbound: tonic::Streaming<SubscribeResponse>,
}

#[async_trait]
impl EventStream for GrpcEventStream {
    async fn recv(&mut self) -> Result<Option<Frame>, TransportError> {
        let response = self.inbound.message().await?;
        Ok(response.map(|r| Frame {
            token: CorrelationToken(r.sequence_id),
            events: batch(r.events),
        }))
    }
}

struct GrpcAckSink {
    subscription_id: String,
    sender: Mutex<Option<mpsc::UnboundedSender<AckRequest>>>,
}

impl AckSink for GrpcAckSink {
    fn send(&self, ack: AckFrame) -> Result<(), TransportError> {
        let sender = lock(&self.sender);
        let tx = sender.as_ref().ok_or(TransportError::Closed)?;
        tx.send(AckRequest {
            sequence_id: ack.token.0,
            subscription_id: self.subscription_id.clone(),
            success: ack.success,
        })
        .map_err(|_| TransportError::Closed)
    }

    fn close(&self) {
        lock(&self.sender).take();
    }
}

// ---------------------------------------------------------------------------
// Push receiver
// ---------------------------------------------------------------------------

/// `CloudEvents/Send` handler feeding a subscriber.
///
/// Responds once every message of the batch is acknowledged; a failed batch
/// maps to `INTERNAL`.
pub struct PushService {
    ingress: PushIngress,
}

impl PushService {
    pub fn new(ingress: PushIngress) -> Self {
        Self { ingress }
    }
}

#[tonic::async_trait]
impl CloudEvents for PushService {
    async fn send(&self, request: Request<BatchEvent>) -> Result<Response<Empty>, Status> {
        let events = batch(request.into_inner().events);
        match self.ingress.accept(events).await {
            Outcome::Success => Ok(Response::new(Empty {})),
            Outcome::Failed(reason) => Err(Status::internal(reason)),
        }
    }
}

pub fn push_server(ingress: PushIngress) -> CloudEventsServer<PushService> {
    CloudEventsServer::new(PushService::new(ingress))
}

/// Serve the push receiver on `listener` until `shutdown` fires.
pub async fn serve_push(
    listener: TcpListener,
    ingress: PushIngress,
    shutdown: CancellationToken,
) -> Result<(), TransportError> {
    tonic::transport::Server::builder()
        .add_service(push_server(ingress))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
            shutdown.cancelled().await
        })
        .await
        .map_err(|e| TransportError::Connect(e.to_string()))
}
