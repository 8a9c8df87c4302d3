//! Pull mode and publishing against a mock store proxy.
//!
//! Starts a tonic server implementing `StoreProxy` and drives it through
//! `GrpcTransport`.

use std::pin::Pin;
use std::sync::{Arc, Mutex};

use eventbus_client::codec::CloudEventBatch;
use eventbus_client::transport::grpc::{
    AckRequest, Empty, GrpcTransport, PublishRequest, StoreProxy, StoreProxyServer,
    SubscribeRequest, SubscribeResponse,
};
use eventbus_client::{
    decode, encode, Client, Event, HandlerError, Message, PublishOptions, SubscribeOptions,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_stream::{Stream, StreamExt};
use tonic::{Request, Response, Status, Streaming};

struct MockProxy {
    frames: Mutex<Vec<SubscribeResponse>>,
    published: Arc<Mutex<Vec<PublishRequest>>>,
    subscriptions: Arc<Mutex<Vec<String>>>,
    acks: mpsc::UnboundedSender<AckRequest>,
}

#[tonic::async_trait]
impl StoreProxy for MockProxy {
    async fn publish(&self, request: Request<PublishRequest>) -> Result<Response<Empty>, Status> {
        self.published.lock().unwrap().push(request.into_inner());
        Ok(Response::new(Empty {}))
    }

    type SubscribeStream =
        Pin<Box<dyn Stream<Item = Result<SubscribeResponse, Status>> + Send + 'static>>;

    async fn subscribe(
        &self,
        request: Request<SubscribeRequest>,
    ) -> Result<Response<Self::SubscribeStream>, Status> {
        self.subscriptions
            .lock()
            .unwrap()
            .push(request.into_inner().subscription_id);
        let frames = std::mem::take(&mut *self.frames.lock().unwrap());
        let stream = tokio_stream::iter(frames.into_iter().map(Ok)).chain(tokio_stream::pending());
        Ok(Response::new(Box::pin(stream)))
    }

    async fn ack(
        &self,
        request: Request<Streaming<AckRequest>>,
    ) -> Result<Response<Empty>, Status> {
        let mut acks = request.into_inner();
        while let Some(ack) = acks.message().await? {
            let _ = self.acks.send(ack);
        }
        Ok(Response::new(Empty {}))
    }
}

struct Harness {
    client: Client,
    published: Arc<Mutex<Vec<PublishRequest>>>,
    subscriptions: Arc<Mutex<Vec<String>>>,
    acks: mpsc::UnboundedReceiver<AckRequest>,
}

/// Bind to port 0, spawn the mock proxy, and return a connected client.
async fn start_proxy(frames: Vec<SubscribeResponse>) -> Harness {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (acks_tx, acks) = mpsc::unbounded_channel();
    let published = Arc::new(Mutex::new(Vec::new()));
    let subscriptions = Arc::new(Mutex::new(Vec::new()));
    let proxy = MockProxy {
        frames: Mutex::new(frames),
        published: Arc::clone(&published),
        subscriptions: Arc::clone(&subscriptions),
        acks: acks_tx,
    };
    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(StoreProxyServer::new(proxy))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    let transport = GrpcTransport::connect(&format!("http://{addr}")).await.unwrap();
    Harness {
        client: Client::new(transport),
        published,
        subscriptions,
        acks,
    }
}

fn response(sequence_id: u64, events: &[Event]) -> SubscribeResponse {
    SubscribeResponse {
        sequence_id,
        events: Some(CloudEventBatch {
            events: events.iter().map(|e| encode(e).unwrap()).collect(),
        }),
    }
}

#[tokio::test]
async fn publish_sends_encoded_batch() {
    let harness = start_proxy(Vec::new()).await;
    let event = Event::new("e1", "svc", "OrderCreated")
        .with_extension("retry", 3)
        .with_text("application/json", r#"{"id":"42"}"#);

    let publisher = harness.client.publisher(PublishOptions::new("orders")).unwrap();
    publisher.publish(&event).await.unwrap();

    let published = harness.published.lock().unwrap().clone();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].eventbus_name, "orders");
    let envelopes = published[0].events.clone().unwrap().events;
    assert_eq!(decode(envelopes[0].clone()).unwrap(), event);
}

#[tokio::test]
async fn pulled_frames_are_acked_with_their_sequence_id() {
    let frames = vec![
        response(
            7,
            &[
                Event::new("a", "svc", "OrderCreated"),
                Event::new("b", "svc", "OrderCreated"),
            ],
        ),
        response(8, &[Event::new("c", "svc", "Poison")]),
    ];
    let mut harness = start_proxy(frames).await;

    let subscriber = harness
        .client
        .subscriber(SubscribeOptions::new("audit"))
        .unwrap();
    let listening = tokio::spawn({
        let subscriber = Arc::clone(&subscriber);
        async move {
            subscriber
                .listen(|batch: Vec<Message>| async move {
                    for message in &batch {
                        if message.event().event_type == "Poison" {
                            message.failed("poisoned");
                        } else {
                            message.success();
                        }
                    }
                    Ok::<_, HandlerError>(())
                })
                .await
        }
    });

    let mut acks = vec![
        harness.acks.recv().await.unwrap(),
        harness.acks.recv().await.unwrap(),
    ];
    acks.sort_by_key(|a| a.sequence_id);
    assert_eq!(
        acks,
        vec![
            AckRequest {
                sequence_id: 7,
                subscription_id: "audit".into(),
                success: true,
            },
            AckRequest {
                sequence_id: 8,
                subscription_id: "audit".into(),
                success: false,
            },
        ]
    );
    assert_eq!(*harness.subscriptions.lock().unwrap(), vec!["audit".to_string()]);

    subscriber.close();
    listening.await.unwrap().unwrap();
}
