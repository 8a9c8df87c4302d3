//! Subscriber pipeline integration tests over the in-memory broker.

mod delivery;
mod failures;
mod support;
