use std::future::Future;

use async_trait::async_trait;

use super::error::HandlerError;
use super::message::Message;

/// Processes batches of delivered messages.
///
/// Called concurrently from up to `parallelism` tasks. The handler owns the
/// batch and is responsible for acknowledging each message.
///
/// Any `Fn(Vec<Message>) -> impl Future<Output = Result<(), HandlerError>>`
/// is a handler:
///
/// ```
/// use eventbus_client::bus::{HandlerError, Message};
///
/// let handler = |batch: Vec<Message>| async move {
///     for message in &batch {
///         message.success();
///     }
///     Ok::<_, HandlerError>(())
/// };
/// # fn assert_handler<H: eventbus_client::bus::Handler>(_: H) {}
/// # assert_handler(handler);
/// ```
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, messages: Vec<Message>) -> Result<(), HandlerError>;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Vec<Message>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, messages: Vec<Message>) -> Result<(), HandlerError> {
        (self)(messages).await
    }
}
