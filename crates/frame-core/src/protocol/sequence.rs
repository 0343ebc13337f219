//! Correlation counter.
//!
//! Every draw-shape request the bridge issues carries a history id
//! (`hist_id`).  When the viewer later announces the shape it generated, it
//! echoes that id, which is how the bridge tells its own request apart from
//! shapes the user drew by hand.  The viewer announces generated shapes to
//! every bridge attached to it, so ids must be unique per viewer; one shared
//! increasing counter is enough.
//!
//! The same counter type also hands out the provisional (negative) region ids
//! given to new shapes before the server assigns real ones.

use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing counter for correlation ids.
///
/// # Examples
///
/// ```rust
/// use frame_core::protocol::CorrelationCounter;
///
/// let counter = CorrelationCounter::starting_at(1);
/// assert_eq!(counter.next(), 1);
/// assert_eq!(counter.next(), 2);
/// ```
#[derive(Debug)]
pub struct CorrelationCounter {
    inner: AtomicU64,
}

impl CorrelationCounter {
    /// Creates a new counter starting at 0.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates a counter whose first [`next`](Self::next) returns `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            inner: AtomicU64::new(first),
        }
    }

    /// Returns the next id and advances the counter.
    ///
    /// Wraps from `u64::MAX` to 0 without panicking.
    pub fn next(&self) -> u64 {
        // `fetch_add` returns the value before the addition and wraps on
        // overflow.
        self.inner.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the value the next call to [`next`](Self::next) will yield.
    pub fn current(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}

impl Default for CorrelationCounter {
    fn default() -> Self {
        Self::new()
    }
}
