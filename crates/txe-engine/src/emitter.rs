//! Value emitter handed to running work items.
//!
//! A work item receives a [`TxnEmitter`] when it is promoted to the
//! active slot and calls [`emit`](TxnEmitter::emit) for each value it
//! produces. Values flow to the transaction's result channel; the work
//! item's future resolving is what signals completion.
//!
//! # Usage
//!
//! ```ignore
//! engine.submit(|tx| async move {
//!     tx.emit(1);
//!     tokio::time::sleep(Duration::from_millis(50)).await;
//!     tx.emit(2);
//!     Ok(())
//! });
//! ```

use crate::error::TransactionError;
use tokio::sync::mpsc;

/// Emits values from a running work item to its result channel.
///
/// Cloneable so a work item can fan emission out to helpers it spawns.
/// The engine does not inspect emitted values; they are forwarded to the
/// subscriber verbatim.
pub struct TxnEmitter<T> {
    tx: mpsc::UnboundedSender<Result<T, TransactionError>>,
}

impl<T> TxnEmitter<T> {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Result<T, TransactionError>>) -> Self {
        Self { tx }
    }

    /// Emits a value to the subscriber.
    ///
    /// Returns `true` if the value was delivered to the channel, `false`
    /// if the subscriber has gone away. Work items may use a `false`
    /// return to stop early; the engine does not require it.
    pub fn emit(&self, value: T) -> bool {
        self.tx.send(Ok(value)).is_ok()
    }

    /// Returns `true` if the subscriber has dropped its stream.
    ///
    /// Long-running work items can poll this to bail out once nobody is
    /// observing them.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> Clone for TxnEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> std::fmt::Debug for TxnEmitter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxnEmitter")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let emitter = TxnEmitter::new(tx);

        assert!(emitter.emit(41));
        assert!(emitter.emit(42));

        assert!(matches!(rx.try_recv(), Ok(Ok(41))));
        assert!(matches!(rx.try_recv(), Ok(Ok(42))));
    }

    #[test]
    fn emit_reports_closed_subscriber() {
        let (tx, rx) = mpsc::unbounded_channel::<Result<u8, TransactionError>>();
        let emitter = TxnEmitter::new(tx);

        drop(rx);
        assert!(emitter.is_closed());
        assert!(!emitter.emit(1));
    }

    #[test]
    fn clones_share_the_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let emitter = TxnEmitter::new(tx);
        let clone = emitter.clone();

        assert!(clone.emit(7));
        assert!(matches!(rx.try_recv(), Ok(Ok(7))));
    }
}
