//! Identifier types for TXE.
//!
//! Transactions are identified by a process-wide monotonic counter so that
//! slot bookkeeping can compare identities cheaply inside the critical
//! section. Engines are identified by UUIDs for log attribution across
//! hosts.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Upper bound for allocated transaction IDs.
///
/// The range above the ceiling is reserved; the allocator wraps back to 1
/// before crossing it. Zero is never allocated so it can serve as a
/// sentinel in debugging output.
const TXN_ID_CEILING: u64 = u64::MAX - (1 << 16);

/// Next transaction ID to hand out. Starts at 1; 0 is never allocated.
static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier for a single submitted transaction.
///
/// Every `submit()` call allocates a fresh ID. The ID tags the
/// transaction's result channel so the execution supervisor can tell
/// "the active transaction terminated" apart from "some other channel
/// reached a terminal state"; a rejected submission must never clear
/// the active slot.
///
/// # Allocation
///
/// IDs come from a process-wide atomic counter advanced by a
/// compare-and-swap retry loop. No lock is taken. The counter wraps to 1
/// before entering the reserved high range, so allocated IDs are always
/// in `1..TXN_ID_CEILING`.
///
/// # Example
///
/// ```
/// use txe_types::TransactionId;
///
/// let a = TransactionId::next();
/// let b = TransactionId::next();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Allocates the next transaction ID.
    ///
    /// Lock-free: contending allocators retry the compare-and-swap until
    /// one wins. Wraps to 1 before exceeding the reserved high range.
    #[must_use]
    pub fn next() -> Self {
        let mut current = NEXT_TXN_ID.load(Ordering::Relaxed);
        loop {
            let successor = if current >= TXN_ID_CEILING {
                1
            } else {
                current + 1
            };
            match NEXT_TXN_ID.compare_exchange_weak(
                current,
                successor,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(claimed) => return Self(claimed),
                Err(observed) => current = observed,
            }
        }
    }

    /// Returns the raw counter value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

// NOTE: TransactionId intentionally does NOT implement Default.
// Default::default() would produce an ID the engine never allocated,
// which defeats the identity-tagged slot bookkeeping. Use next().

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// Identifier for a [`TransactionEngine`] instance.
///
/// Each host owns exactly one engine; the UUID attributes log lines to
/// the owning engine when several hosts run in one process.
///
/// [`TransactionEngine`]: https://docs.rs/txe-engine
///
/// # Example
///
/// ```
/// use txe_types::EngineId;
///
/// let a = EngineId::new();
/// let b = EngineId::new();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngineId(pub Uuid);

impl EngineId {
    /// Creates a new [`EngineId`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EngineId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EngineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "engine:{}", self.0)
    }
}
