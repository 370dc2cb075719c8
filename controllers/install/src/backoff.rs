//! # Fibonacci Backoff
//!
//! Requeue delays for failed reconciliations. Grows more slowly than
//! exponential backoff, so a transiently broken cluster is retried often
//! enough without hammering the API server.
//!
//! Sequence in minutes: 1m, 1m, 2m, 3m, 5m, 8m, 10m (max).

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, capped at a maximum.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum backoff value in minutes (for reset)
    min_minutes: u64,
    /// Previous backoff value in minutes
    prev_minutes: u64,
    /// Current backoff value in minutes
    current_minutes: u64,
    /// Maximum backoff value in minutes
    max_minutes: u64,
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with specified minimum and maximum values in minutes
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            min_minutes,
            prev_minutes: 0,
            current_minutes: min_minutes,
            max_minutes,
        }
    }

    /// Get the next backoff duration and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = Duration::from_secs(self.current_minutes * 60);

        let next_minutes = self.prev_minutes + self.current_minutes;
        self.prev_minutes = self.current_minutes;
        self.current_minutes = std::cmp::min(next_minutes, self.max_minutes);

        result
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev_minutes = 0;
        self.current_minutes = self.min_minutes;
    }
}

/// One backoff sequence per object key
#[derive(Debug)]
pub struct KeyedBackoff<K> {
    template: FibonacciBackoff,
    backoffs: HashMap<K, FibonacciBackoff>,
}

impl<K: Eq + Hash> KeyedBackoff<K> {
    /// Every key starts from a copy of `template`
    pub fn new(template: FibonacciBackoff) -> Self {
        Self {
            template,
            backoffs: HashMap::new(),
        }
    }

    /// Next delay for `key`, advancing only that key's sequence
    pub fn next_backoff(&mut self, key: K) -> Duration {
        self.backoffs
            .entry(key)
            .or_insert_with(|| self.template.clone())
            .next_backoff()
    }

    /// Forget `key` after a successful pass
    pub fn reset(&mut self, key: &K) {
        self.backoffs.remove(key);
    }
}
