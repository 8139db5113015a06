//! Freshness queue: a bounded ring buffer that decouples ingest rate from
//! step rate, with age-based eviction on dequeue.
//!
//! Blocking is cooperative: a `dequeue` call on an empty queue waits on a
//! [`Condvar`] up to the caller's timeout, the systems-language
//! replacement for a promise-based wait list.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::config::FreshnessQueueConfig;

struct Entry<T> {
    seq: u64,
    enqueued_at: Instant,
    value: T,
}

/// Running counters exposed by [`FreshnessQueue::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessStats {
    pub size: usize,
    pub capacity: usize,
    /// `size / capacity` expressed in basis points (`size * 10000 / capacity`)
    /// to avoid pulling a float into the core's stats surface.
    pub utilization_bp: u64,
    /// Age of the oldest live entry, if any.
    pub lag: Option<Duration>,
    pub dropped_oldest: u64,
    pub dropped_stale: u64,
}

struct Inner<T> {
    buffer: VecDeque<Entry<T>>,
    next_seq: u64,
    dropped_oldest: u64,
    dropped_stale: u64,
}

/// Bounded ring buffer of capacity `config.capacity`, with optional
/// max-age eviction on dequeue.
pub struct FreshnessQueue<T> {
    config: FreshnessQueueConfig,
    state: Mutex<Inner<T>>,
    not_empty: Condvar,
}

impl<T> FreshnessQueue<T> {
    pub fn new(config: FreshnessQueueConfig) -> Self {
        Self {
            config,
            state: Mutex::new(Inner {
                buffer: VecDeque::with_capacity(config.capacity),
                next_seq: 0,
                dropped_oldest: 0,
                dropped_stale: 0,
            }),
            not_empty: Condvar::new(),
        }
    }

    /// Assigns the next sequence number and pushes `value`. If the buffer
    /// is already at capacity, the oldest live entry is silently dropped
    /// and `dropped_oldest` is incremented.
    pub fn enqueue(&self, value: T) -> u64 {
        let mut inner = self.state.lock().unwrap();
        let seq = inner.next_seq;
        inner.next_seq += 1;

        if inner.buffer.len() >= self.config.capacity {
            inner.buffer.pop_front();
            inner.dropped_oldest += 1;
            trace!("freshness queue full, dropped oldest entry (seq {})", seq);
        }
        inner.buffer.push_back(Entry {
            seq,
            enqueued_at: Instant::now(),
            value,
        });
        drop(inner);
        self.not_empty.notify_one();
        seq
    }

    /// Returns up to `max_count` entries in sequence order. Entries older
    /// than `config.max_age` (if set) are dropped and counted as stale
    /// rather than returned. Waits up to `timeout` if the buffer is empty.
    pub fn dequeue(&self, max_count: usize, timeout: Option<Duration>) -> Vec<T> {
        let mut inner = self.state.lock().unwrap();

        if inner.buffer.is_empty() {
            if let Some(timeout) = timeout {
                let (guard, result) = self
                    .not_empty
                    .wait_timeout_while(inner, timeout, |inner| inner.buffer.is_empty())
                    .unwrap();
                inner = guard;
                if result.timed_out() {
                    debug!("freshness queue dequeue timed out with no entries");
                }
            }
        }

        self.evict_stale(&mut inner);

        let n = max_count.min(inner.buffer.len());
        inner.buffer.drain(..n).map(|e| e.value).collect()
    }

    fn evict_stale(&self, inner: &mut Inner<T>) {
        let Some(max_age) = self.config.max_age else {
            return;
        };
        let max_age = Duration::from_millis(max_age);
        let now = Instant::now();
        while let Some(front) = inner.buffer.front() {
            if now.duration_since(front.enqueued_at) > max_age {
                inner.buffer.pop_front();
                inner.dropped_stale += 1;
            } else {
                break;
            }
        }
    }

    pub fn stats(&self) -> FreshnessStats {
        let inner = self.state.lock().unwrap();
        let size = inner.buffer.len();
        let utilization_bp = if self.config.capacity == 0 {
            0
        } else {
            (size as u64 * 10_000) / self.config.capacity as u64
        };
        let lag = inner
            .buffer
            .front()
            .map(|e| Instant::now().duration_since(e.enqueued_at));
        FreshnessStats {
            size,
            capacity: self.config.capacity,
            utilization_bp,
            lag,
            dropped_oldest: inner.dropped_oldest,
            dropped_stale: inner.dropped_stale,
        }
    }
}
