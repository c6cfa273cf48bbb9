//! TransactionEngine - per-host serial execution.
//!
//! The [`TransactionEngine`] accepts asynchronous units of work
//! ("transactions"), runs at most one at a time in submission order,
//! bounds how much work may be queued, and shuts down cleanly with
//! distinguishable errors for everything still waiting.
//!
//! # Architecture
//!
//! ```text
//! submit() ──► TransactionProxy (cold, nothing queued yet)
//!                   │ subscribe()
//!                   ▼
//!             Admission ──full──► Err(TXN_CAPACITY_EXCEEDED)
//!                   │
//!                   ▼
//!             pending (FIFO, bounded)
//!                   │ promote_if_idle()
//!                   ▼
//!             active (at most one) ──► tokio task runs work
//!                   │ terminate / cancel / shutdown
//!                   ▼
//!             release ──► promote_if_idle()
//! ```
//!
//! # Locking Discipline
//!
//! `destroyed`, `pending` and `active` form one unit of state guarded by
//! a single mutex. Every transition (admission, promotion, release,
//! cancellation, shutdown) happens inside that critical section. Work
//! items run entirely outside it: promotion reserves the slot under the
//! lock, then invokes the closure and spawns its task with no lock held.
//! Work items may therefore query the engine or subscribe follow-up
//! submissions from their closure body without deadlocking, and a
//! long-running transaction never blocks admission, only promotion.
//!
//! # Slot Identity
//!
//! The active slot is cleared only when the terminating transaction *is*
//! the one occupying it. A transaction that reaches a terminal state
//! without ever becoming active (capacity rejection, post-shutdown
//! drain, unsubscribe while pending) never touches the slot; otherwise a
//! rejection arriving mid-run could free the slot early and let two
//! transactions run concurrently.

use crate::config::EngineConfig;
use crate::emitter::TxnEmitter;
use crate::error::{RejectReason, ShutdownError, TransactionError};
use crate::proxy::TransactionProxy;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use txe_types::{EngineId, TransactionId};

/// Boxed future produced by a work item.
pub(crate) type WorkFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Boxed work item, stored until promotion.
pub(crate) type WorkFn<T> = Box<dyn FnOnce(TxnEmitter<T>) -> WorkFuture + Send>;

/// Sender half of a transaction's result channel.
pub(crate) type OutputSender<T> = mpsc::UnboundedSender<Result<T, TransactionError>>;

/// A transaction admitted to the queue but not yet running.
struct PendingEntry<T: Send + 'static> {
    id: TransactionId,
    work: WorkFn<T>,
    output: OutputSender<T>,
}

/// The one currently-executing transaction.
///
/// `handle` is `None` between slot reservation and task spawn; the
/// spawn happens outside the lock and stores the handle afterwards.
struct ActiveEntry<T: Send + 'static> {
    id: TransactionId,
    handle: Option<tokio::task::JoinHandle<()>>,
    output: OutputSender<T>,
}

/// A slot reservation produced under the lock, to be started outside it.
struct Promotion<T: Send + 'static> {
    id: TransactionId,
    work: WorkFn<T>,
    output: OutputSender<T>,
}

/// Engine bookkeeping. Mutated only under the [`Shared`] mutex.
struct EngineState<T: Send + 'static> {
    destroyed: bool,
    pending: VecDeque<PendingEntry<T>>,
    active: Option<ActiveEntry<T>>,
}

/// State shared between the engine handle, its proxies and worker tasks.
pub(crate) struct Shared<T: Send + 'static> {
    id: EngineId,
    max_capacity: usize,
    state: Mutex<EngineState<T>>,
}

impl<T: Send + 'static> Shared<T> {
    /// Admits a subscribed transaction, or rejects it on its own
    /// channel. Called exactly once per submission, at first-subscribe.
    pub(crate) fn admit(
        self: &Arc<Self>,
        id: TransactionId,
        work: WorkFn<T>,
        output: OutputSender<T>,
    ) {
        let promotion = {
            let mut state = self.state.lock();

            if state.destroyed {
                warn!("{}: rejecting {} after shutdown", self.id, id);
                let _ = output.send(Err(TransactionError::CannotExecute(
                    RejectReason::HostDestroyed,
                )));
                return;
            }

            if state.pending.len() >= self.max_capacity {
                // Rejection must not touch the active slot.
                warn!(
                    "{}: rejecting {}, pending queue full (max={})",
                    self.id, id, self.max_capacity
                );
                let _ = output.send(Err(TransactionError::CannotExecute(
                    RejectReason::CapacityExceeded,
                )));
                return;
            }

            debug!("{}: admitted {}", self.id, id);
            state.pending.push_back(PendingEntry { id, work, output });
            self.promote_if_idle(&mut state)
        };
        if let Some(promotion) = promotion {
            self.start(promotion);
        }
    }

    /// Reserves the active slot for the head of the pending queue if
    /// the slot is free. Idempotent; safe to call whenever slot state
    /// might have changed. The caller must pass any returned
    /// [`Promotion`] to [`start`](Self::start) after releasing the lock.
    ///
    /// After shutdown this becomes the drain path: popped entries are
    /// failed one at a time in FIFO order instead of reserved, keeping
    /// all state transitions funneled through a single place.
    fn promote_if_idle(&self, state: &mut EngineState<T>) -> Option<Promotion<T>> {
        loop {
            if state.active.is_some() {
                return None;
            }
            let entry = state.pending.pop_front()?;

            if state.destroyed {
                debug!("{}: draining {} after shutdown", self.id, entry.id);
                let _ = entry.output.send(Err(TransactionError::CannotExecute(
                    RejectReason::HostDestroyed,
                )));
                continue;
            }

            let PendingEntry { id, work, output } = entry;
            let prev = state.active.replace(ActiveEntry {
                id,
                handle: None,
                output: output.clone(),
            });
            assert!(
                prev.is_none(),
                "active slot occupied during promotion of {id}; mutual exclusion broken"
            );
            debug!("{}: promoted {} to active", self.id, id);
            return Some(Promotion { id, work, output });
        }
    }

    /// Starts a reserved promotion.
    ///
    /// Invokes the work closure and spawns its task with no lock held,
    /// so work items may call back into the engine from their closure
    /// body. The handle is stored once the task exists; if the slot was
    /// cancelled or the engine destroyed in the interim, the task is
    /// aborted instead.
    fn start(self: &Arc<Self>, promotion: Promotion<T>) {
        let Promotion { id, work, output } = promotion;
        let fut = work(TxnEmitter::new(output.clone()));
        let task_shared = Arc::clone(self);
        let handle = tokio::spawn(async move {
            if let Err(err) = fut.await {
                let _ = output.send(Err(TransactionError::Application(err)));
            }
            drop(output);
            task_shared.release(id);
        });

        let mut state = self.state.lock();
        match state.active.as_mut() {
            Some(active) if active.id == id => active.handle = Some(handle),
            _ => {
                debug!("{}: {} superseded before start, aborting", self.id, id);
                handle.abort();
            }
        }
    }

    /// Clears the active slot after natural termination of the worker
    /// task and promotes the next pending transaction.
    ///
    /// No-op if `id` is not the active transaction: the terminating
    /// channel belongs to work that was already cancelled or replaced,
    /// and must not free a slot it does not hold.
    fn release(self: &Arc<Self>, id: TransactionId) {
        let promotion = {
            let mut state = self.state.lock();
            if !state.active.as_ref().is_some_and(|active| active.id == id) {
                return;
            }
            state.active = None;
            debug!("{}: {} terminated, slot released", self.id, id);
            self.promote_if_idle(&mut state)
        };
        if let Some(promotion) = promotion {
            self.start(promotion);
        }
    }

    /// Cancels a transaction on unsubscribe.
    ///
    /// A pending transaction is removed from the queue immediately; an
    /// active one has its task aborted and the slot released exactly as
    /// a natural termination would. Unknown IDs (already terminal) are
    /// ignored.
    pub(crate) fn cancel(self: &Arc<Self>, id: TransactionId) {
        let promotion = {
            let mut state = self.state.lock();

            if state.active.as_ref().is_some_and(|active| active.id == id) {
                if let Some(active) = state.active.take() {
                    debug!("{}: cancelling active {}", self.id, id);
                    if let Some(handle) = active.handle {
                        handle.abort();
                    }
                }
                self.promote_if_idle(&mut state)
            } else {
                let before = state.pending.len();
                state.pending.retain(|entry| entry.id != id);
                if state.pending.len() != before {
                    debug!("{}: removed pending {} on unsubscribe", self.id, id);
                }
                None
            }
        };
        if let Some(promotion) = promotion {
            self.start(promotion);
        }
    }
}

/// Per-host serial transaction scheduler.
///
/// Cheap to clone; clones share the same queue and active slot, so a
/// host can hand submission capability to collaborators while retaining
/// the shutdown authority itself.
///
/// # Lifecycle
///
/// `created → (serving) → destroyed`. [`shutdown`](Self::shutdown) is
/// one-way: the active transaction is interrupted, queued transactions
/// are failed lazily through the promotion path, and all future
/// subscriptions are rejected.
///
/// # Example
///
/// ```ignore
/// let engine: TransactionEngine<i32> = TransactionEngine::new();
///
/// let proxy = engine.submit(|tx| async move {
///     tx.emit(5);
///     Ok(())
/// });
///
/// let mut stream = proxy.subscribe()?;
/// while let Some(item) = stream.recv().await {
///     println!("{item:?}");
/// }
///
/// engine.shutdown()?;
/// ```
pub struct TransactionEngine<T: Send + 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> TransactionEngine<T> {
    /// Creates an engine with the default configuration
    /// (`max_capacity = 1000`).
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine with an explicit configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let id = EngineId::new();
        info!(
            "{}: engine created (max_capacity={})",
            id, config.max_capacity
        );
        Self {
            shared: Arc::new(Shared {
                id,
                max_capacity: config.max_capacity,
                state: Mutex::new(EngineState {
                    destroyed: false,
                    pending: VecDeque::new(),
                    active: None,
                }),
            }),
        }
    }

    /// Submits a unit of work and returns its result proxy.
    ///
    /// Never blocks and never queues anything by itself: the work is
    /// admitted when the proxy is first subscribed. A proxy that is
    /// dropped without subscribing never runs and never fails; it is
    /// simply garbage.
    ///
    /// The work item receives a [`TxnEmitter`] for its values and
    /// reports completion or an application failure through its future.
    /// Application failures pass through to the subscriber unchanged.
    pub fn submit<F, Fut>(&self, work: F) -> TransactionProxy<T>
    where
        F: FnOnce(TxnEmitter<T>) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let id = TransactionId::next();
        let (tx, rx) = mpsc::unbounded_channel();
        let work: WorkFn<T> = Box::new(move |emitter| Box::pin(work(emitter)));
        debug!("{}: submitted {}", self.shared.id, id);
        TransactionProxy::new(id, Arc::clone(&self.shared), work, tx, rx)
    }

    /// Destroys the engine.
    ///
    /// The active transaction (if any) observes
    /// [`TransactionError::PrematureTermination`] and its task is
    /// aborted. Pending transactions are failed with
    /// `TXN_HOST_DESTROYED` one at a time through the promotion path,
    /// preserving FIFO order of error delivery.
    ///
    /// # Errors
    ///
    /// [`ShutdownError::AlreadyDestroyed`] if called twice.
    pub fn shutdown(&self) -> Result<(), ShutdownError> {
        let mut state = self.shared.state.lock();
        if state.destroyed {
            return Err(ShutdownError::AlreadyDestroyed);
        }
        state.destroyed = true;
        info!(
            "{}: shutting down (pending={})",
            self.shared.id,
            state.pending.len()
        );

        if let Some(active) = state.active.take() {
            debug!("{}: interrupting active {}", self.shared.id, active.id);
            if let Some(handle) = active.handle {
                handle.abort();
            }
            let _ = active
                .output
                .send(Err(TransactionError::PrematureTermination));
        }

        // Drain pending entries through the single promotion path. With
        // the destroyed flag set it never reserves the slot.
        let promotion = self.shared.promote_if_idle(&mut state);
        debug_assert!(promotion.is_none());
        Ok(())
    }

    /// Returns this engine's ID.
    #[must_use]
    pub fn id(&self) -> EngineId {
        self.shared.id
    }

    /// Returns the configured pending-queue bound.
    #[must_use]
    pub fn max_capacity(&self) -> usize {
        self.shared.max_capacity
    }

    /// Returns the number of admitted, not-yet-active transactions.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Returns the ID of the active transaction, if one is running.
    #[must_use]
    pub fn active_id(&self) -> Option<TransactionId> {
        self.shared.state.lock().active.as_ref().map(|a| a.id)
    }

    /// Returns `true` if the engine has been shut down.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.shared.state.lock().destroyed
    }

    /// Returns `true` if nothing is active and nothing is pending.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        let state = self.shared.state.lock();
        state.active.is_none() && state.pending.is_empty()
    }
}

impl<T: Send + 'static> Clone for TransactionEngine<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> Default for TransactionEngine<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> std::fmt::Debug for TransactionEngine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("TransactionEngine")
            .field("id", &self.shared.id)
            .field("destroyed", &state.destroyed)
            .field("pending", &state.pending.len())
            .field("active", &state.active.as_ref().map(|a| a.id))
            .finish()
    }
}
