//! Stream failures, malformed deliveries and shutdown.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use eventbus_client::transport::InMemoryBroker;
use eventbus_client::{
    encode, CloudEvent, HandlerError, Message, StreamState, SubscribeError, SubscribeOptions,
    Subscriber, TransportError,
};

use crate::support::{event, eventually, frame, ScriptedTransport};

type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send>>;

fn counting_handler(
    handled: &Arc<AtomicUsize>,
) -> impl Fn(Vec<Message>) -> HandlerFuture + Send + Sync + 'static {
    let handled = Arc::clone(handled);
    move |batch: Vec<Message>| -> HandlerFuture {
        let handled = Arc::clone(&handled);
        Box::pin(async move {
            for message in &batch {
                handled.fetch_add(1, Ordering::SeqCst);
                message.success();
            }
            Ok::<_, HandlerError>(())
        })
    }
}

#[tokio::test]
async fn transport_error_closes_after_delivered_frames() {
    let mut script: Vec<_> = (1..=5).map(|i| Ok(frame(i, &[format!("e{i}").as_str()]))).collect();
    script.push(Err(TransportError::Stream("connection reset".into())));
    script.extend((6..=10).map(|i| Ok(frame(i, &[format!("e{i}").as_str()]))));

    let transport = ScriptedTransport::new(script);
    let reads = Arc::clone(&transport.reads);
    let subscriber = Subscriber::new(Arc::new(transport), SubscribeOptions::new("audit")).unwrap();

    let handled = Arc::new(AtomicUsize::new(0));
    let result = subscriber.listen(counting_handler(&handled)).await;

    assert!(matches!(
        result,
        Err(SubscribeError::Transport(TransportError::Stream(_)))
    ));
    assert_eq!(subscriber.state(), StreamState::Closed);
    assert_eq!(handled.load(Ordering::SeqCst), 5);
    assert_eq!(reads.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn malformed_elements_are_skipped_and_frame_still_acked() {
    let broker = InMemoryBroker::new();
    broker.bind("audit", "orders");
    let subscriber = Arc::new(
        Subscriber::new(Arc::new(broker.clone()), SubscribeOptions::new("audit")).unwrap(),
    );

    let handled = Arc::new(AtomicUsize::new(0));
    let listening = tokio::spawn({
        let subscriber = Arc::clone(&subscriber);
        let handler = counting_handler(&handled);
        async move { subscriber.listen(handler).await }
    });
    eventually(|| broker.is_streaming("audit")).await;

    let broken = CloudEvent {
        source: String::new(),
        ..encode(&event("broken")).unwrap()
    };
    let token = broker
        .deliver(
            "audit",
            vec![encode(&event("a")).unwrap(), broken, encode(&event("c")).unwrap()],
        )
        .unwrap();

    eventually(|| !broker.acknowledged("audit").is_empty()).await;
    let acks = broker.acknowledged("audit");
    assert_eq!(acks[0].token, token);
    assert!(acks[0].success);
    assert_eq!(handled.load(Ordering::SeqCst), 2);

    subscriber.close();
    listening.await.unwrap().unwrap();
}

#[tokio::test]
async fn close_waits_for_running_handlers() {
    let broker = InMemoryBroker::new();
    broker.bind("audit", "orders");
    let subscriber = Arc::new(
        Subscriber::new(
            Arc::new(broker.clone()),
            SubscribeOptions::new("audit").with_parallelism(2),
        )
        .unwrap(),
    );

    let started = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));
    let listening = tokio::spawn({
        let subscriber = Arc::clone(&subscriber);
        let started = Arc::clone(&started);
        let finished = Arc::clone(&finished);
        async move {
            subscriber
                .listen(move |batch: Vec<Message>| {
                    let started = Arc::clone(&started);
                    let finished = Arc::clone(&finished);
                    async move {
                        started.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        batch.iter().for_each(|m| {
                            m.success();
                        });
                        finished.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, HandlerError>(())
                    }
                })
                .await
        }
    });
    eventually(|| broker.is_streaming("audit")).await;

    broker
        .deliver("audit", vec![encode(&event("slow")).unwrap()])
        .unwrap();
    eventually(|| started.load(Ordering::SeqCst) == 1).await;

    assert!(subscriber.close());
    assert!(!subscriber.close());
    listening.await.unwrap().unwrap();
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}
