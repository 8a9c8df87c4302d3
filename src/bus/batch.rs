//! Frame-level acknowledgment shared by every message of one delivery.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::message::{AckCallback, Outcome};
use crate::lock;

/// Combines per-message outcomes into one outcome for the delivery frame.
///
/// Succeeds once every expected message reports success. The first failure
/// fails the frame immediately; outcomes reported afterwards are ignored.
/// With zero expected messages the frame succeeds on construction.
pub(crate) struct BatchAck {
    remaining: AtomicUsize,
    callback: Mutex<Option<AckCallback>>,
}

impl BatchAck {
    pub(crate) fn new(expected: usize, callback: AckCallback) -> Arc<Self> {
        let batch = Arc::new(Self {
            remaining: AtomicUsize::new(expected),
            callback: Mutex::new(Some(callback)),
        });
        if expected == 0 {
            batch.fire(Outcome::Success);
        }
        batch
    }

    pub(crate) fn settle(&self, outcome: Outcome) {
        match outcome {
            Outcome::Success => {
                if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    self.fire(Outcome::Success);
                }
            }
            failed => self.fire(failed),
        }
    }

    fn fire(&self, outcome: Outcome) {
        let callback = lock(&self.callback).take();
        if let Some(callback) = callback {
            callback(outcome);
        }
    }
}
