//! Bounded fan-out of queued messages to the handler.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::handler::Handler;
use super::message::Message;
use super::options::{SubscribeOptions, MAX_PARALLELISM};

/// Counters reported when a dispatcher stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub batches: usize,
    pub messages: usize,
    pub handler_failures: usize,
}

/// Pulls messages off the queue and runs the handler on batches of them.
///
/// At most `parallelism` handler invocations run at once. A batch holds the
/// message that freed the dispatcher plus whatever is already queued, up to
/// `batch_size`; the dispatcher never waits to fill a batch.
///
/// On shutdown the queue is closed to new messages, messages already
/// buffered are still dispatched, and [`run`](Self::run) returns after every
/// in-flight handler has finished.
#[derive(Clone, Copy, Debug)]
pub struct Dispatcher {
    parallelism: usize,
    batch_size: usize,
}

impl Dispatcher {
    pub fn new(parallelism: usize, batch_size: usize) -> Self {
        Self {
            parallelism: parallelism.clamp(1, MAX_PARALLELISM),
            batch_size: batch_size.max(1),
        }
    }

    pub fn from_options(options: &SubscribeOptions) -> Self {
        Self::new(options.parallelism, options.batch_size)
    }

    pub fn spawn<H: Handler>(
        self,
        queue: mpsc::Receiver<Message>,
        handler: Arc<H>,
        shutdown: CancellationToken,
    ) -> JoinHandle<DispatchStats> {
        tokio::spawn(self.run(queue, handler, shutdown))
    }

    pub async fn run<H: Handler>(
        self,
        mut queue: mpsc::Receiver<Message>,
        handler: Arc<H>,
        shutdown: CancellationToken,
    ) -> DispatchStats {
        let slots = Arc::new(Semaphore::new(self.parallelism));
        let failures = Arc::new(AtomicUsize::new(0));
        let mut stats = DispatchStats::default();
        let mut closing = false;

        loop {
            let first = tokio::select! {
                biased;
                _ = shutdown.cancelled(), if !closing => {
                    debug!("dispatcher closing queue, draining buffered messages");
                    queue.close();
                    closing = true;
                    continue;
                }
                next = queue.recv() => match next {
                    Some(message) => message,
                    None => break,
                },
            };

            let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
                break;
            };

            let mut batch = Vec::with_capacity(self.batch_size);
            batch.push(first);
            while batch.len() < self.batch_size {
                match queue.try_recv() {
                    Ok(message) => batch.push(message),
                    Err(_) => break,
                }
            }

            stats.batches += 1;
            stats.messages += batch.len();

            let handler = Arc::clone(&handler);
            let failures = Arc::clone(&failures);
            tokio::spawn(async move {
                let size = batch.len();
                if let Err(error) = handler.handle(batch).await {
                    failures.fetch_add(1, Ordering::Relaxed);
                    warn!(%error, batch_size = size, "handler failed");
                }
                drop(permit);
            });
        }

        // every permit back means no handler is still running
        let all = u32::try_from(self.parallelism).unwrap_or(u32::MAX);
        let _ = slots.acquire_many(all).await;
        stats.handler_failures = failures.load(Ordering::Relaxed);
        debug!(
            batches = stats.batches,
            messages = stats.messages,
            handler_failures = stats.handler_failures,
            "dispatcher stopped"
        );
        stats
    }
}
