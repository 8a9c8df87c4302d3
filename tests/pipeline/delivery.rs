//! Publish through the client and consume through a subscriber.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use eventbus_client::transport::InMemoryBroker;
use eventbus_client::{
    Client, HandlerError, Message, PublishOptions, StreamState, SubscribeOptions,
};

use crate::support::{event, eventually};

#[tokio::test]
async fn published_batches_are_handled_and_acked() {
    let broker = InMemoryBroker::new();
    broker.bind("audit", "orders");
    let client = Client::new(broker.clone());

    let publisher = client.publisher(PublishOptions::new("orders")).unwrap();
    for chunk in 0..4 {
        let events: Vec<_> = (0..5).map(|i| event(format!("e{}", chunk * 5 + i))).collect();
        publisher.publish_batch(&events).await.unwrap();
    }
    assert_eq!(broker.published("orders").len(), 20);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let subscriber = client
        .subscriber(SubscribeOptions::new("audit").with_parallelism(4))
        .unwrap();
    let listening = tokio::spawn({
        let subscriber = Arc::clone(&subscriber);
        let seen = Arc::clone(&seen);
        async move {
            subscriber
                .listen(move |batch: Vec<Message>| {
                    let seen = Arc::clone(&seen);
                    async move {
                        for message in &batch {
                            seen.lock().unwrap().push(message.event().id.clone());
                            message.success();
                        }
                        Ok::<_, HandlerError>(())
                    }
                })
                .await
        }
    });

    eventually(|| broker.acknowledged("audit").len() == 4).await;
    assert_eq!(subscriber.state(), StreamState::Streaming);
    assert!(broker.acknowledged("audit").iter().all(|ack| ack.success));

    let ids: HashSet<String> = seen.lock().unwrap().iter().cloned().collect();
    assert_eq!(ids.len(), 20);
    assert_eq!(seen.lock().unwrap().len(), 20);

    subscriber.close();
    listening.await.unwrap().unwrap();
    assert_eq!(subscriber.state(), StreamState::Closed);
}

#[tokio::test]
async fn failed_message_fails_only_its_frame() {
    let broker = InMemoryBroker::new();
    broker.bind("audit", "orders");
    let client = Client::new(broker.clone());

    let publisher = client.publisher(PublishOptions::new("orders")).unwrap();
    publisher.publish_batch(&[event("ok-1"), event("ok-2")]).await.unwrap();
    publisher.publish_batch(&[event("ok-3"), event("poison")]).await.unwrap();

    let subscriber = client.subscriber(SubscribeOptions::new("audit")).unwrap();
    let listening = tokio::spawn({
        let subscriber = Arc::clone(&subscriber);
        async move {
            subscriber
                .listen(|batch: Vec<Message>| async move {
                    for message in &batch {
                        if message.event().id == "poison" {
                            message.failed("cannot process");
                        } else {
                            message.success();
                        }
                    }
                    Ok::<_, HandlerError>(())
                })
                .await
        }
    });

    eventually(|| broker.acknowledged("audit").len() == 2).await;
    let mut acks = broker.acknowledged("audit");
    acks.sort_by_key(|ack| ack.token);
    assert!(acks[0].success);
    assert!(!acks[1].success);

    client.close();
    listening.await.unwrap().unwrap();
}

#[tokio::test]
async fn single_worker_sees_frame_order() {
    let broker = InMemoryBroker::new();
    broker.bind("audit", "orders");
    let client = Client::new(broker.clone());
    let ids: Vec<_> = (0..10).map(|i| event(i.to_string())).collect();
    client
        .publisher(PublishOptions::new("orders"))
        .unwrap()
        .publish_batch(&ids)
        .await
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let subscriber = client
        .subscriber(
            SubscribeOptions::new("audit")
                .with_parallelism(1)
                .with_batch_size(3),
        )
        .unwrap();
    let listening = tokio::spawn({
        let subscriber = Arc::clone(&subscriber);
        let seen = Arc::clone(&seen);
        async move {
            subscriber
                .listen(move |batch: Vec<Message>| {
                    let seen = Arc::clone(&seen);
                    async move {
                        assert!(batch.len() <= 3);
                        for message in &batch {
                            seen.lock().unwrap().push(message.event().id.clone());
                            message.success();
                        }
                        Ok::<_, HandlerError>(())
                    }
                })
                .await
        }
    });

    eventually(|| broker.acknowledged("audit").len() == 1).await;
    let expected: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    assert_eq!(*seen.lock().unwrap(), expected);

    subscriber.close();
    listening.await.unwrap().unwrap();
}
