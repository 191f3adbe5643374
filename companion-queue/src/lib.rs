//! Offline submission queue repository and consent gate.
//!
//! The queue is persisted as one encrypted record: the full item list is
//! serialized, encrypted, and rewritten wholesale on every mutation.
//! Capacity is fixed at [`MAX_QUEUE_SIZE`] items. The consent gate is the
//! cross-cutting precondition every mutating operation checks first.
//!
//! Concurrency: a single logical writer per process is assumed. Both the
//! enqueue path and the sync drain perform read-modify-write against the
//! one persisted record with no locking layer of their own; callers
//! serialize access by routing all mutation through one engine.

mod consent;
mod error;
mod repository;

pub use consent::{ConsentGate, ConsentState, CONSENT_REQUIRED_MESSAGE};
pub use error::{QueueError, QueueResult, QUEUE_FULL_MESSAGE};
pub use repository::{QueueRepository, MAX_QUEUE_SIZE, QUEUE_RECORD_KEY};
