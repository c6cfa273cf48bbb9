//! Engine layer: admission, promotion, shutdown.
//!
//! The engine decomposes into five cooperating responsibilities, all
//! sharing one critical section:
//!
//! | Component | Responsibility |
//! |---|---|
//! | Admission | Accept or reject a subscription based on queue depth |
//! | Pending queue | Bounded FIFO of admitted, not-yet-running work |
//! | Supervisor | Promote the queue head whenever the single active slot frees |
//! | Result proxy | Caller-facing channel; dropping it is cancellation |
//! | Shutdown | One-way teardown with distinguishable errors |
//!
//! See [`TransactionEngine`] for the public surface.

#[allow(clippy::module_inception)]
mod engine;

pub use engine::TransactionEngine;
pub(crate) use engine::{OutputSender, Shared, WorkFn};
