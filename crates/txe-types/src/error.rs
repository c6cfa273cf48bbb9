//! Unified error interface for TXE.
//!
//! Every error type in the workspace implements [`ErrorCode`] so callers
//! can branch on stable machine-readable codes instead of matching enum
//! variants across crate boundaries.
//!
//! # Code format
//!
//! - UPPER_SNAKE_CASE, prefixed with the owning layer (`TXN_`, `ENGINE_`,
//!   `PROXY_`)
//! - Stable once published; changing a code is a breaking change
//!
//! # Example
//!
//! ```
//! use txe_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum QueueError {
//!     Full,
//!     Closed,
//! }
//!
//! impl ErrorCode for QueueError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::Full => "QUEUE_FULL",
//!             Self::Closed => "QUEUE_CLOSED",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Full)
//!     }
//! }
//!
//! assert_eq!(QueueError::Full.code(), "QUEUE_FULL");
//! assert!(QueueError::Full.is_recoverable());
//! ```

/// Stable machine-readable error code interface.
pub trait ErrorCode {
    /// Returns the error's stable code in UPPER_SNAKE_CASE.
    fn code(&self) -> &'static str;

    /// Returns whether retrying the failed operation may succeed.
    ///
    /// Recoverable errors describe transient conditions (a queue that is
    /// momentarily full). Non-recoverable errors will not change on
    /// retry and require a code or lifecycle fix.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that an error code follows TXE conventions.
///
/// Checks that the code is non-empty UPPER_SNAKE_CASE and carries the
/// expected layer prefix. Intended for use in each error enum's test
/// module.
///
/// # Panics
///
/// Panics with a descriptive message when a check fails.
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();
    assert!(!code.is_empty(), "error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "error code '{code}' must start with '{expected_prefix}'"
    );
    assert!(
        is_upper_snake_case(code),
        "error code '{code}' must be UPPER_SNAKE_CASE"
    );
}

/// Asserts [`assert_error_code`] over every variant of an error enum.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('_')
        && !s.ends_with('_')
        && !s.contains("__")
        && s.chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
