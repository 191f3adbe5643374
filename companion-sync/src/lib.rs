//! Sync engine for the companion offline queue.
//!
//! Drains the encrypted queue through a transport collaborator, strictly
//! in FIFO order, persisting progress after every confirmed delivery:
//! - Each pass runs `Idle → Started → {Finished | Failed(reason)}`
//! - A stuck head blocks the pass (head-of-line blocking); retry
//!   metadata is persisted and a later pass resumes at the same head
//! - At most one pass is in flight at a time; overlapping triggers are
//!   ignored
//! - The consent gate blocks both the enqueue path and the drain
//!
//! Triggers arrive over a command channel, either explicitly or from the
//! connectivity monitor's edge-triggered online signal.

mod connectivity;
mod engine;
mod error;
mod transport;

pub use connectivity::{ConnectivityMonitor, Subscription};
pub use engine::{
    create_sync_engine, FailureReason, PassOutcome, QueueSignal, SyncCommand, SyncEngine,
    SyncHandle, SyncLoop, ENQUEUE_FAILED_MESSAGE, SYNC_FAILED_MESSAGE,
};
pub use error::{SyncError, SyncResult};
pub use transport::{Transport, TransportError, BACKEND_UNAVAILABLE_CODE, UNKNOWN_ERROR_CODE};
