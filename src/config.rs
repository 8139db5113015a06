//! In-process configuration knobs for the core.
//!
//! Loading these values from a file or environment is host glue and
//! deliberately not this crate's job; what lives here is the small set of
//! value structs the core's own data structures need at construction time.

/// Construction-time configuration for a [`crate::freshness::FreshnessQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessQueueConfig {
    /// Ring buffer capacity. Once full, `enqueue` silently drops the oldest
    /// live entry and increments the overflow counter.
    pub capacity: usize,
    /// Optional max age (in logical ticks supplied by the caller's clock).
    /// Entries older than this are dropped on `dequeue` and counted as stale.
    pub max_age: Option<u64>,
}

impl FreshnessQueueConfig {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "freshness queue capacity must be positive");
        Self {
            capacity,
            max_age: None,
        }
    }

    pub fn with_max_age(mut self, max_age: u64) -> Self {
        self.max_age = Some(max_age);
        self
    }
}
