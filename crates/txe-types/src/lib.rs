//! Foundation types for TXE (Transaction Execution Engine).
//!
//! TXE is a per-host scheduler for asynchronous units of work
//! ("transactions"): at most one runs at a time, submission order is
//! preserved, queued work is bounded, and shutdown fails in-flight and
//! queued work with distinguishable errors.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │  txe-types   : TransactionId, EngineId,        │
//! │                ErrorCode            ◄── HERE   │
//! ├────────────────────────────────────────────────┤
//! │  txe-engine  : TransactionEngine,              │
//! │                TransactionProxy, shutdown      │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! This crate stays dependency-light so higher layers (and their tests)
//! can share identifiers and the error-code contract without pulling in
//! the runtime.
//!
//! # Identifier Design
//!
//! - [`TransactionId`]: process-wide atomic counter with a
//!   compare-and-swap retry loop, wrapping before a reserved high range.
//!   Cheap to compare inside the engine's critical section, which is what
//!   the slot bookkeeping needs.
//! - [`EngineId`]: UUID v4 newtype for attributing log output to the
//!   owning engine instance.

mod error;
mod id;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{EngineId, TransactionId};
