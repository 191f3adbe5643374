//! Queue drain state machine and its command wiring.

use crate::connectivity::{ConnectivityMonitor, Subscription};
use crate::error::{SyncError, SyncResult};
use crate::transport::Transport;
use companion_queue::{ConsentGate, QueueError, QueueRepository, CONSENT_REQUIRED_MESSAGE};
use companion_types::QueueItem;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Reason string emitted when a drain pass fails for any non-consent
/// cause. Stable but intentionally generic; the persisted retry
/// metadata carries the classified detail.
pub const SYNC_FAILED_MESSAGE: &str = "Failed to sync offline queue";

/// Reason string emitted when an enqueue fails for any non-capacity,
/// non-consent cause.
pub const ENQUEUE_FAILED_MESSAGE: &str = "Failed to queue submission";

/// Discrete outward notifications for UI/state collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueSignal {
    SyncStarted,
    SyncFinished,
    SyncFailed { reason: String },
    EnqueueSucceeded,
    EnqueueFailed { reason: String },
    ConsentError { reason: String },
}

/// Why a pass ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    ConsentRequired,
    SyncFailed,
}

/// Terminal state of one drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Finished,
    Failed(FailureReason),
    /// Another pass was already in flight; this trigger was ignored.
    Skipped,
}

/// Commands accepted by the engine's run loop.
#[derive(Debug)]
pub enum SyncCommand {
    SyncNow,
    Shutdown,
}

/// Handle for sending commands to the sync loop.
#[derive(Clone)]
pub struct SyncHandle {
    command_tx: mpsc::Sender<SyncCommand>,
}

impl SyncHandle {
    /// Requests a drain pass, waiting for channel capacity.
    pub async fn sync_now(&self) -> SyncResult<()> {
        self.command_tx
            .send(SyncCommand::SyncNow)
            .await
            .map_err(|_| SyncError::EngineStopped)
    }

    /// Non-blocking trigger for connectivity callbacks. While a pass is
    /// running (or a trigger is already pending) the send coalesces into
    /// the pending one.
    pub fn trigger(&self) {
        if self.command_tx.try_send(SyncCommand::SyncNow).is_err() {
            debug!("sync trigger coalesced, a pass is already pending");
        }
    }

    /// Stops the run loop after the current pass.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.command_tx
            .send(SyncCommand::Shutdown)
            .await
            .map_err(|_| SyncError::EngineStopped)
    }

    /// Wires the connectivity monitor's online edge to this handle.
    ///
    /// The subscription deregisters when dropped; keep it alive for as
    /// long as connectivity should trigger syncs.
    pub fn attach_connectivity(&self, monitor: &ConnectivityMonitor) -> Subscription {
        let handle = self.clone();
        monitor.subscribe(move || handle.trigger())
    }
}

/// Creates the sync engine, its command handle, and the run loop.
///
/// The engine itself is shareable: the enqueue path is called directly
/// by the submitting UI (it must report failures synchronously), while
/// drain passes run on the serial loop.
pub fn create_sync_engine(
    repository: Arc<QueueRepository>,
    gate: Arc<ConsentGate>,
    transport: Arc<dyn Transport>,
    signal_tx: mpsc::Sender<QueueSignal>,
) -> (Arc<SyncEngine>, SyncHandle, SyncLoop) {
    // Capacity 1: one running pass plus at most one pending trigger;
    // anything beyond that coalesces.
    let (command_tx, command_rx) = mpsc::channel(1);

    let engine = Arc::new(SyncEngine {
        repository,
        gate,
        transport,
        signal_tx,
        in_flight: AtomicBool::new(false),
    });

    let handle = SyncHandle { command_tx };
    let sync_loop = SyncLoop {
        engine: Arc::clone(&engine),
        command_rx,
    };

    (engine, handle, sync_loop)
}

/// Serial command loop driving the engine.
pub struct SyncLoop {
    engine: Arc<SyncEngine>,
    command_rx: mpsc::Receiver<SyncCommand>,
}

impl SyncLoop {
    /// Runs until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        info!("sync loop started");

        while let Some(command) = self.command_rx.recv().await {
            match command {
                SyncCommand::SyncNow => {
                    let outcome = self.engine.sync_now().await;
                    debug!("sync pass ended: {outcome:?}");
                }
                SyncCommand::Shutdown => {
                    info!("sync loop stopping");
                    break;
                }
            }
        }

        info!("sync loop stopped");
    }
}

/// The drain state machine.
///
/// Per pass: `Idle → Started → {Finished | Failed(reason)}`. The queue
/// is drained strictly from the head; the remainder is persisted after
/// every confirmed delivery, so a crash loses at most the in-flight
/// item (which the backend deduplicates by id). A failed head stops the
/// pass; items behind it wait, in order, for a later pass.
pub struct SyncEngine {
    repository: Arc<QueueRepository>,
    gate: Arc<ConsentGate>,
    transport: Arc<dyn Transport>,
    signal_tx: mpsc::Sender<QueueSignal>,
    in_flight: AtomicBool,
}

impl SyncEngine {
    /// Queues one submission, gated on consent.
    ///
    /// Failures are reported synchronously to the caller *and* emitted
    /// as signals; a direct user action awaits this.
    pub async fn enqueue(&self, item: QueueItem) -> Result<(), QueueError> {
        if let Err(err) = self.gate.require() {
            self.emit(QueueSignal::ConsentError {
                reason: CONSENT_REQUIRED_MESSAGE.to_string(),
            });
            return Err(err);
        }

        match self.repository.enqueue(item).await {
            Ok(()) => {
                self.emit(QueueSignal::EnqueueSucceeded);
                Ok(())
            }
            Err(QueueError::Full) => {
                warn!("offline queue is full, rejecting submission");
                self.emit(QueueSignal::EnqueueFailed {
                    reason: QueueError::Full.to_string(),
                });
                Err(QueueError::Full)
            }
            Err(err) => {
                warn!("enqueue failed: {err}");
                self.emit(QueueSignal::EnqueueFailed {
                    reason: ENQUEUE_FAILED_MESSAGE.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Runs one drain pass, unless a pass is already in flight.
    pub async fn sync_now(&self) -> PassOutcome {
        let Some(_guard) = PassGuard::acquire(&self.in_flight) else {
            debug!("sync pass already in flight, ignoring trigger");
            return PassOutcome::Skipped;
        };

        self.run_pass().await
    }

    async fn run_pass(&self) -> PassOutcome {
        // Entry guard: consent blocks the pass before the queue is touched
        if self.gate.require().is_err() {
            self.emit(QueueSignal::ConsentError {
                reason: CONSENT_REQUIRED_MESSAGE.to_string(),
            });
            self.emit(QueueSignal::SyncFailed {
                reason: CONSENT_REQUIRED_MESSAGE.to_string(),
            });
            return PassOutcome::Failed(FailureReason::ConsentRequired);
        }

        self.emit(QueueSignal::SyncStarted);

        let mut pending: VecDeque<QueueItem> = match self.repository.load_queue().await {
            Ok(items) => items.into(),
            Err(err) => {
                warn!("sync pass could not load the queue: {err}");
                return self.fail_pass();
            }
        };

        if pending.is_empty() {
            self.emit(QueueSignal::SyncFinished);
            return PassOutcome::Finished;
        }

        info!("sync pass draining {} queued item(s)", pending.len());

        while let Some(head) = pending.front() {
            match self.transport.submit(head).await {
                Ok(()) => {
                    let delivered = pending.pop_front();
                    // Persist the remainder before the next submit:
                    // crash exposure stays bounded to the in-flight item
                    if let Err(err) = self.save_pending(&pending).await {
                        warn!("failed to persist drained queue: {err}");
                        return self.fail_pass();
                    }
                    if let Some(item) = delivered {
                        debug!("delivered queued item {}", item.id);
                    }
                }
                Err(err) => {
                    warn!("submit failed for item {}: {err}", head.id);
                    let code = err.code();
                    if let Some(head) = pending.front_mut() {
                        head.record_failure(code);
                    }
                    // Same head stays at the front; the tail keeps its order
                    if let Err(err) = self.save_pending(&pending).await {
                        warn!("failed to persist retry metadata: {err}");
                    }
                    return self.fail_pass();
                }
            }
        }

        self.emit(QueueSignal::SyncFinished);
        PassOutcome::Finished
    }

    async fn save_pending(&self, pending: &VecDeque<QueueItem>) -> Result<(), QueueError> {
        let items: Vec<QueueItem> = pending.iter().cloned().collect();
        self.repository.save_queue(&items).await
    }

    fn fail_pass(&self) -> PassOutcome {
        self.emit(QueueSignal::SyncFailed {
            reason: SYNC_FAILED_MESSAGE.to_string(),
        });
        PassOutcome::Failed(FailureReason::SyncFailed)
    }

    /// Signals are advisory; the persisted queue is the source of
    /// truth. A full or closed receiver drops the notification.
    fn emit(&self, signal: QueueSignal) {
        if let Err(err) = self.signal_tx.try_send(signal) {
            debug!("dropping queue signal: {err}");
        }
    }
}

/// Releases the in-flight flag on every exit path of a pass.
struct PassGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(Self { flag })
        }
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
