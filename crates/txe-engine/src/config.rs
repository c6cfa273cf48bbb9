//! Engine configuration.
//!
//! [`EngineConfig`] defines the behavioral attributes of a
//! [`TransactionEngine`](crate::TransactionEngine). There is exactly one
//! tunable today, the pending-queue bound; configuration lives in its own
//! struct so hosts can persist and extend it without touching the engine
//! surface.
//!
//! # Example
//!
//! ```
//! use txe_engine::{EngineConfig, DEFAULT_MAX_CAPACITY};
//!
//! let config = EngineConfig::default();
//! assert_eq!(config.max_capacity, DEFAULT_MAX_CAPACITY);
//!
//! let small = EngineConfig::with_max_capacity(8);
//! assert_eq!(small.max_capacity, 8);
//! ```

use serde::{Deserialize, Serialize};

/// Default bound on the pending queue.
///
/// Admission is rejected once this many transactions are queued and not
/// yet active. The active slot does not count against the bound.
pub const DEFAULT_MAX_CAPACITY: usize = 1000;

/// Configuration for a [`TransactionEngine`](crate::TransactionEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of pending (admitted, not yet active)
    /// transactions. A subscription that would exceed this bound is
    /// rejected with `TXN_CAPACITY_EXCEEDED` and nothing is queued.
    pub max_capacity: usize,
}

impl EngineConfig {
    /// Creates a config with the default capacity of 1000.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a config with a custom pending-queue bound.
    ///
    /// A bound of zero means no transaction can ever be admitted; every
    /// subscription is rejected at admission time.
    #[must_use]
    pub fn with_max_capacity(max_capacity: usize) -> Self {
        Self { max_capacity }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_capacity: DEFAULT_MAX_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capacity_is_1000() {
        assert_eq!(EngineConfig::default().max_capacity, 1000);
        assert_eq!(EngineConfig::new(), EngineConfig::default());
    }

    #[test]
    fn custom_capacity() {
        let config = EngineConfig::with_max_capacity(4);
        assert_eq!(config.max_capacity, 4);
    }

    #[test]
    fn serde_round_trip() {
        let config = EngineConfig::with_max_capacity(17);
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
