//! Delivered messages and their acknowledgment handles.

use std::fmt;
use std::sync::Mutex;

use crate::event::Event;
use crate::lock;
use crate::transport::CorrelationToken;

/// Result of processing a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

pub(crate) type AckCallback = Box<dyn FnOnce(Outcome) + Send>;

enum AckState {
    Pending(AckCallback),
    Acknowledged,
}

/// One-shot acknowledgment capability.
///
/// The first call to [`success`](Self::success) or [`failed`](Self::failed)
/// reports the outcome and moves the handle to the acknowledged state; every
/// later call is a no-op that returns `false`. Safe to call from any task.
pub struct AckHandle {
    state: Mutex<AckState>,
}

impl AckHandle {
    pub fn new(callback: impl FnOnce(Outcome) + Send + 'static) -> Self {
        Self {
            state: Mutex::new(AckState::Pending(Box::new(callback))),
        }
    }

    /// Report success. Returns `true` if this call performed the acknowledgment.
    pub fn success(&self) -> bool {
        self.settle(Outcome::Success)
    }

    /// Report failure. Returns `true` if this call performed the acknowledgment.
    pub fn failed(&self, reason: impl Into<String>) -> bool {
        self.settle(Outcome::Failed(reason.into()))
    }

    pub fn is_acknowledged(&self) -> bool {
        matches!(*lock(&self.state), AckState::Acknowledged)
    }

    fn settle(&self, outcome: Outcome) -> bool {
        let previous = std::mem::replace(&mut *lock(&self.state), AckState::Acknowledged);
        match previous {
            // invoked outside the lock
            AckState::Pending(callback) => {
                callback(outcome);
                true
            }
            AckState::Acknowledged => false,
        }
    }
}

impl fmt::Debug for AckHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AckHandle")
            .field("acknowledged", &self.is_acknowledged())
            .finish()
    }
}

/// A decoded event delivered to a handler, together with its ack handle.
///
/// Dropping a message without acknowledging it leaves its batch pending.
#[derive(Debug)]
pub struct Message {
    event: Event,
    token: CorrelationToken,
    ack: AckHandle,
}

impl Message {
    pub fn new(event: Event, token: CorrelationToken, ack: AckHandle) -> Self {
        Self { event, token, ack }
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Token of the delivery frame this message arrived in.
    pub fn token(&self) -> CorrelationToken {
        self.token
    }

    pub fn success(&self) -> bool {
        self.ack.success()
    }

    pub fn failed(&self, reason: impl Into<String>) -> bool {
        self.ack.failed(reason)
    }

    pub fn is_acknowledged(&self) -> bool {
        self.ack.is_acknowledged()
    }

    pub fn ack_handle(&self) -> &AckHandle {
        &self.ack
    }
}
