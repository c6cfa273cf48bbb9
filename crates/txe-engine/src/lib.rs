//! TXE Engine - per-host serial transaction execution.
//!
//! A host (a UI component, a session, any object with a teardown point)
//! owns one [`TransactionEngine`] and submits asynchronous units of work
//! to it. The engine guarantees:
//!
//! 1. **Mutual exclusion** - at most one transaction runs at a time
//! 2. **FIFO fairness** - promotion order equals admission order
//! 3. **Bounded queueing** - admission is rejected once `max_capacity`
//!    transactions are queued and not yet active
//! 4. **Cooperative cancellation** - dropping a subscription cancels
//!    that transaction and only that transaction
//! 5. **Clean teardown** - shutdown fails in-flight and queued work with
//!    distinguishable errors; no transaction is silently dropped
//!
//! # Crate Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │  txe-types   : TransactionId, EngineId,        │
//! │                ErrorCode                       │
//! ├────────────────────────────────────────────────┤
//! │  txe-engine  (THIS CRATE)                      │
//! │  engine/  : TransactionEngine, admission,      │
//! │             promotion, shutdown                │
//! │  proxy    : TransactionProxy, ProxyStream      │
//! │  emitter  : TxnEmitter                         │
//! │  config   : EngineConfig                       │
//! │  error    : TransactionError, ShutdownError,   │
//! │             SubscribeError                     │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! # Control Flow
//!
//! `submit()` returns a cold [`TransactionProxy`] immediately; nothing
//! happens until the caller subscribes. First-subscribe admits the work
//! into the bounded FIFO queue (or rejects it outright), and the
//! supervisor promotes the queue head whenever the single active slot is
//! free. Termination of the active transaction, whether by completion,
//! failure, cancellation or shutdown, releases the slot and triggers
//! the next promotion.
//!
//! # Example
//!
//! ```
//! use txe_engine::TransactionEngine;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let engine: TransactionEngine<i32> = TransactionEngine::new();
//!
//! let proxy = engine.submit(|tx| async move {
//!     tx.emit(5);
//!     Ok(())
//! });
//!
//! let mut stream = proxy.subscribe().expect("first subscription");
//! assert!(matches!(stream.recv().await, Some(Ok(5))));
//! assert!(stream.recv().await.is_none());
//!
//! engine.shutdown().expect("first shutdown");
//! # }
//! ```
//!
//! # What the engine does not do
//!
//! No timeout is imposed on the active transaction: work that never
//! terminates starves the queue, and bounding work is the caller's job.
//! There is no persistence, no priority scheduling, and exactly one
//! global FIFO queue per engine instance.

mod config;
mod emitter;
mod engine;
mod error;
mod proxy;

pub use config::{EngineConfig, DEFAULT_MAX_CAPACITY};
pub use emitter::TxnEmitter;
pub use engine::TransactionEngine;
pub use error::{RejectReason, ShutdownError, SubscribeError, TransactionError};
pub use proxy::{ProxyStream, TransactionProxy};

// Re-export the foundation types callers need to hold on to.
pub use txe_types::{EngineId, ErrorCode, TransactionId};
