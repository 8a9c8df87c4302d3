//! gRPC push receiver.

use eventbus_client::codec::CloudEventBatch;
use eventbus_client::transport::grpc::{BatchEvent, CloudEventsClient};
use eventbus_client::{encode, Event, Protocol, SubscribeOptions};

use crate::support::start_push;

fn batch(types: &[&str]) -> BatchEvent {
    BatchEvent {
        eventbus_name: "orders".into(),
        events: Some(CloudEventBatch {
            events: types
                .iter()
                .enumerate()
                .map(|(i, t)| encode(&Event::new(i.to_string(), "svc", *t)).unwrap())
                .collect(),
        }),
    }
}

#[tokio::test]
async fn send_responds_with_batch_outcome() {
    let (subscriber, addr, listening) =
        start_push(SubscribeOptions::new("audit").with_push(0, Protocol::Grpc)).await;

    let mut client = CloudEventsClient::connect(format!("http://{addr}"))
        .await
        .unwrap();

    client
        .send(batch(&["OrderCreated", "OrderShipped"]))
        .await
        .unwrap();

    let status = client
        .send(batch(&["OrderCreated", "Poison"]))
        .await
        .unwrap_err();
    assert_eq!(status.code(), tonic::Code::Internal);
    assert_eq!(status.message(), "poisoned");

    // nothing decodable still succeeds
    client.send(batch(&[])).await.unwrap();

    drop(client);
    subscriber.close();
    listening.await.unwrap().unwrap();
}
