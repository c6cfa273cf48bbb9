//! Result proxy - the caller-facing handle for one transaction.
//!
//! [`TransactionProxy`] is returned synchronously by
//! [`submit`](crate::TransactionEngine::submit) but is cold: the work it
//! carries is neither queued nor given resources until
//! [`subscribe`](TransactionProxy::subscribe) is called. Subscribing is
//! the admission event; the returned [`ProxyStream`] mirrors the work
//! item's output, and dropping it is the one and only cancellation
//! mechanism.
//!
//! # Per-transaction state machine
//!
//! ```text
//! Created ──subscribe()──► Pending ──promote──► Active ──► Terminal
//!    │                        │                    │
//!    │ (drop proxy:           ├─reject──► Terminal ├─cancel/shutdown─► Terminal
//!    │  never runs)           └─unsubscribe─► gone
//!    ▼
//!  garbage
//! ```

use crate::engine::{OutputSender, Shared, WorkFn};
use crate::error::{SubscribeError, TransactionError};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use txe_types::TransactionId;

/// Un-admitted submission state, consumed by the first `subscribe()`.
struct ProxySlot<T: Send + 'static> {
    work: WorkFn<T>,
    tx: OutputSender<T>,
    rx: mpsc::UnboundedReceiver<Result<T, TransactionError>>,
}

/// Cold handle for a submitted transaction.
///
/// Dropping a never-subscribed proxy discards the work without touching
/// the engine; such a submission never runs and never fails.
pub struct TransactionProxy<T: Send + 'static> {
    id: TransactionId,
    shared: Arc<Shared<T>>,
    slot: Mutex<Option<ProxySlot<T>>>,
}

impl<T: Send + 'static> TransactionProxy<T> {
    pub(crate) fn new(
        id: TransactionId,
        shared: Arc<Shared<T>>,
        work: WorkFn<T>,
        tx: OutputSender<T>,
        rx: mpsc::UnboundedReceiver<Result<T, TransactionError>>,
    ) -> Self {
        Self {
            id,
            shared,
            slot: Mutex::new(Some(ProxySlot { work, tx, rx })),
        }
    }

    /// Returns the transaction's ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Subscribes to the transaction's output, admitting it into the
    /// engine's pending queue.
    ///
    /// Admission happens exactly once, on the first call; the queue
    /// position is determined by first-subscription order, not
    /// submission order. Must be called within a tokio runtime, since
    /// promotion spawns the worker task.
    ///
    /// If the queue is full or the engine is destroyed the stream
    /// yields exactly one error and completes; nothing is queued.
    ///
    /// # Errors
    ///
    /// [`SubscribeError::AlreadySubscribed`] on every call after the
    /// first. A repeated subscription must not re-admit the work.
    pub fn subscribe(&self) -> Result<ProxyStream<T>, SubscribeError> {
        let slot = self
            .slot
            .lock()
            .take()
            .ok_or(SubscribeError::AlreadySubscribed)?;
        let ProxySlot { work, tx, rx } = slot;

        self.shared.admit(self.id, work, tx);

        Ok(ProxyStream {
            id: self.id,
            shared: Arc::clone(&self.shared),
            rx,
        })
    }
}

impl<T: Send + 'static> std::fmt::Debug for TransactionProxy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionProxy")
            .field("id", &self.id)
            .field("subscribed", &self.slot.lock().is_none())
            .finish()
    }
}

/// Live subscription to a transaction's output.
///
/// Yields the work item's emissions verbatim, then at most one terminal
/// [`TransactionError`], then `None`. Dropping the stream cancels the
/// transaction: a pending one is removed from the queue immediately, an
/// active one has its task aborted and the slot released exactly as a
/// natural termination would.
pub struct ProxyStream<T: Send + 'static> {
    id: TransactionId,
    shared: Arc<Shared<T>>,
    rx: mpsc::UnboundedReceiver<Result<T, TransactionError>>,
}

impl<T: Send + 'static> ProxyStream<T> {
    /// Returns the transaction's ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Receives the next value or terminal error.
    ///
    /// Returns `None` once the transaction has reached a terminal
    /// outcome and all buffered output has been consumed.
    pub async fn recv(&mut self) -> Option<Result<T, TransactionError>> {
        self.rx.recv().await
    }

    /// Receives without waiting. Returns `None` when no output is
    /// currently buffered (the transaction may still be running).
    pub fn try_recv(&mut self) -> Option<Result<T, TransactionError>> {
        self.rx.try_recv().ok()
    }
}

impl<T: Send + 'static> Drop for ProxyStream<T> {
    fn drop(&mut self) {
        // Unsubscribe is the cancellation contract. Terminal
        // transactions are unknown to the engine by now; cancel is a
        // no-op for them.
        self.shared.cancel(self.id);
    }
}

impl<T: Send + 'static> std::fmt::Debug for ProxyStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyStream").field("id", &self.id).finish()
    }
}
