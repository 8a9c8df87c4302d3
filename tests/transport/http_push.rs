//! HTTP push receiver.
//!
//! Starts a push-mode subscriber and exercises it with reqwest.

use eventbus_client::{Protocol, SubscribeOptions};
use serde_json::{json, Value};

use crate::support::start_push;

fn event(id: &str, event_type: &str) -> Value {
    json!({
        "id": id,
        "source": "svc",
        "specversion": "1.0",
        "type": event_type,
        "data": { "id": id }
    })
}

#[tokio::test]
async fn gatewaysink_responds_with_batch_outcome() {
    let (subscriber, addr, listening) =
        start_push(SubscribeOptions::new("audit").with_push(0, Protocol::Http)).await;
    let url = format!("http://{addr}/gatewaysink");
    let http = reqwest::Client::new();

    let ok = http
        .post(&url)
        .json(&json!([event("a", "OrderCreated"), event("b", "OrderShipped")]))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), 200);
    assert_eq!(ok.json::<Value>().await.unwrap(), json!({ "ok": true }));

    let single = http
        .post(&url)
        .json(&event("c", "OrderCreated"))
        .send()
        .await
        .unwrap();
    assert_eq!(single.status(), 200);

    let failed = http
        .post(&url)
        .json(&json!([event("d", "OrderCreated"), event("e", "Poison"), "not an event"]))
        .send()
        .await
        .unwrap();
    assert_eq!(failed.status(), 500);
    assert_eq!(
        failed.json::<Value>().await.unwrap(),
        json!({ "error": "poisoned" })
    );

    drop(http);
    subscriber.close();
    listening.await.unwrap().unwrap();
}
