//! # Exponential Backoff
//!
//! Per-resource retry delays for bindings that failed with a retryable error.
//!
//! The delay doubles on every consecutive failure, starting at `start_ms` and
//! capped at `max_ms`. A successful bind resets the sequence.
//!
//! ## Usage
//!
//! ```rust
//! use service_binding_controller::controller::backoff::ExponentialBackoff;
//!
//! let mut backoff = ExponentialBackoff::new(1000, 30_000);
//! assert_eq!(backoff.next_backoff_ms(), 1000);
//! assert_eq!(backoff.next_backoff_ms(), 2000);
//! assert_eq!(backoff.next_backoff_ms(), 4000);
//! ```

use std::time::Duration;

/// Exponential backoff calculator
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Starting value in milliseconds (for reset)
    start_ms: u64,
    /// Value returned by the next call in milliseconds
    current_ms: u64,
    /// Maximum value in milliseconds
    max_ms: u64,
}

impl ExponentialBackoff {
    /// Create a backoff starting at `start_ms` and capped at `max_ms`
    ///
    /// A zero start is bumped to one millisecond so the sequence still grows.
    #[must_use]
    pub fn new(start_ms: u64, max_ms: u64) -> Self {
        let start_ms = start_ms.max(1);
        let max_ms = max_ms.max(start_ms);
        Self {
            start_ms,
            current_ms: start_ms,
            max_ms,
        }
    }

    /// Get the next backoff in milliseconds and advance the sequence
    pub fn next_backoff_ms(&mut self) -> u64 {
        let result = self.current_ms;
        self.current_ms = self.current_ms.saturating_mul(2).min(self.max_ms);
        result
    }

    /// Get the next backoff as a `Duration` and advance the sequence
    #[must_use]
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_millis(self.next_backoff_ms())
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.current_ms = self.start_ms;
    }
}
