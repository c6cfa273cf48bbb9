//! Engine layer errors.
//!
//! Errors are delivered only on the affected transaction's result
//! channel, never to unrelated callers. All types implement
//! [`ErrorCode`] for standardized handling.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`TransactionError::CannotExecute`] (capacity) | `TXN_CAPACITY_EXCEEDED` | Yes |
//! | [`TransactionError::CannotExecute`] (destroyed) | `TXN_HOST_DESTROYED` | No |
//! | [`TransactionError::PrematureTermination`] | `TXN_PREMATURE_TERMINATION` | No |
//! | [`TransactionError::Application`] | `TXN_APPLICATION_FAILED` | No |
//! | [`ShutdownError::AlreadyDestroyed`] | `ENGINE_ALREADY_DESTROYED` | No |
//! | [`SubscribeError::AlreadySubscribed`] | `PROXY_ALREADY_SUBSCRIBED` | No |
//!
//! # Recoverability
//!
//! `TXN_CAPACITY_EXCEEDED` is the only recoverable code: the queue may
//! have drained by the time the caller retries. Everything else signals
//! a lifecycle boundary or a programmer error that a retry cannot fix.

use thiserror::Error;
use txe_types::ErrorCode;

/// Why a transaction was rejected without ever running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The pending queue was at `max_capacity` at admission time.
    CapacityExceeded,
    /// The engine was destroyed before the transaction could run.
    ///
    /// Covers both a post-shutdown subscription and a transaction that
    /// was still pending when shutdown drained the queue.
    HostDestroyed,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CapacityExceeded => write!(f, "capacity exceeded"),
            Self::HostDestroyed => write!(f, "host destroyed"),
        }
    }
}

/// Terminal error delivered on a transaction's result channel.
///
/// A channel yields at most one of these; after an error the channel
/// completes. Application failures raised by the work item itself pass
/// through in [`TransactionError::Application`] without affecting any
/// other transaction.
///
/// # Example
///
/// ```
/// use txe_engine::{RejectReason, TransactionError};
/// use txe_types::ErrorCode;
///
/// let err = TransactionError::CannotExecute(RejectReason::CapacityExceeded);
/// assert_eq!(err.code(), "TXN_CAPACITY_EXCEEDED");
/// assert!(err.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum TransactionError {
    /// The transaction was rejected before it started running.
    #[error("cannot execute transaction: {0}")]
    CannotExecute(RejectReason),

    /// The transaction was actively running when the engine shut down
    /// and was forcibly cancelled.
    #[error("transaction terminated prematurely by engine shutdown")]
    PrematureTermination,

    /// The work item itself failed. The original error is carried
    /// unwrapped.
    #[error("transaction failed: {0}")]
    Application(anyhow::Error),
}

impl TransactionError {
    /// Returns the rejection reason, if this is a rejection.
    #[must_use]
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Self::CannotExecute(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl ErrorCode for TransactionError {
    fn code(&self) -> &'static str {
        match self {
            Self::CannotExecute(RejectReason::CapacityExceeded) => "TXN_CAPACITY_EXCEEDED",
            Self::CannotExecute(RejectReason::HostDestroyed) => "TXN_HOST_DESTROYED",
            Self::PrematureTermination => "TXN_PREMATURE_TERMINATION",
            Self::Application(_) => "TXN_APPLICATION_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::CannotExecute(RejectReason::CapacityExceeded))
    }
}

/// Error returned by [`TransactionEngine::shutdown`].
///
/// [`TransactionEngine::shutdown`]: crate::TransactionEngine::shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ShutdownError {
    /// `shutdown()` was called on an engine that was already destroyed.
    ///
    /// This is a programmer-error signal: the host's teardown path ran
    /// twice. It is not part of normal transaction flow.
    #[error("engine already destroyed")]
    AlreadyDestroyed,
}

impl ErrorCode for ShutdownError {
    fn code(&self) -> &'static str {
        match self {
            Self::AlreadyDestroyed => "ENGINE_ALREADY_DESTROYED",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Error returned by [`TransactionProxy::subscribe`].
///
/// [`TransactionProxy::subscribe`]: crate::TransactionProxy::subscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubscribeError {
    /// The proxy was already subscribed once.
    ///
    /// A submission is admitted at most once; a second subscription must
    /// not re-enqueue the work.
    #[error("transaction proxy already subscribed")]
    AlreadySubscribed,
}

impl ErrorCode for SubscribeError {
    fn code(&self) -> &'static str {
        match self {
            Self::AlreadySubscribed => "PROXY_ALREADY_SUBSCRIBED",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
