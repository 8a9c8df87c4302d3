use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use eventbus_client::transport::InMemoryBroker;
use eventbus_client::{HandlerError, Message, SubscribeError, Subscriber, SubscribeOptions};
use tokio::task::JoinHandle;

/// Acks every message, failing the ones whose type is `Poison`.
pub async fn ack_unless_poison(batch: Vec<Message>) -> Result<(), HandlerError> {
    for message in &batch {
        if message.event().event_type == "Poison" {
            message.failed("poisoned");
        } else {
            message.success();
        }
    }
    Ok(())
}

/// Start a push-mode subscriber on an ephemeral port.
pub async fn start_push(
    options: SubscribeOptions,
) -> (Arc<Subscriber>, SocketAddr, JoinHandle<Result<(), SubscribeError>>) {
    let subscriber = Arc::new(Subscriber::new(Arc::new(InMemoryBroker::new()), options).unwrap());
    let listening = tokio::spawn({
        let subscriber = Arc::clone(&subscriber);
        async move { subscriber.listen(ack_unless_poison).await }
    });

    let addr = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(addr) = subscriber.local_addr() {
                break addr;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .unwrap();

    (subscriber, SocketAddr::from(([127, 0, 0, 1], addr.port())), listening)
}
