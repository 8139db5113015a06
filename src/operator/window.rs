//! Window-function state: per-partition ranking, offset access, and
//! sliding-window aggregates.
//!
//! A partition is an already-ordered sequence of rows (ordering by the
//! window's `ORDER BY` clause is the host's job, upstream of this
//! module). `RollingAggregate` maintains a running accumulator for
//! invertible aggregates (SUM/COUNT/AVG) and a monotonic deque of
//! `(value, index)` for MIN/MAX, so a sliding window of width `k+1`
//! updates in amortized O(1) per row instead of rescanning the window.

use std::collections::VecDeque;

/// Rank assignment for an ordered partition. `RANK` leaves gaps after a
/// tie (`1, 1, 3`); `DENSE_RANK` does not (`1, 1, 2`).
pub fn rank<T: PartialOrd>(partition: &[T]) -> Vec<u64> {
    rank_with(partition, false)
}

pub fn dense_rank<T: PartialOrd>(partition: &[T]) -> Vec<u64> {
    rank_with(partition, true)
}

fn rank_with<T: PartialOrd>(partition: &[T], dense: bool) -> Vec<u64> {
    let mut out = Vec::with_capacity(partition.len());
    let mut rank = 0u64;
    let mut dense_rank = 0u64;
    for (i, v) in partition.iter().enumerate() {
        if i == 0 || partition[i - 1].partial_cmp(v) != Some(std::cmp::Ordering::Equal) {
            rank = i as u64 + 1;
            dense_rank += 1;
        }
        out.push(if dense { dense_rank } else { rank });
    }
    out
}

/// Divides a partition of `len` rows into `n` buckets as equally as
/// possible, with earlier buckets receiving the extra rows. Returns the
/// bucket index (1-based) for each row.
pub fn ntile(len: usize, n: usize) -> Vec<u64> {
    assert!(n > 0, "NTILE requires a positive bucket count");
    let base = len / n;
    let remainder = len % n;
    let mut out = Vec::with_capacity(len);
    for bucket in 0..n {
        let size = base + if bucket < remainder { 1 } else { 0 };
        out.extend(std::iter::repeat((bucket + 1) as u64).take(size));
    }
    out
}

/// Value at a fixed offset behind the current row within the partition,
/// or `default` if the offset runs past the partition start.
pub fn lag<T: Clone>(partition: &[T], index: usize, offset: usize, default: Option<T>) -> Option<T> {
    index.checked_sub(offset).and_then(|i| partition.get(i).cloned()).or(default)
}

/// Value at a fixed offset ahead of the current row within the
/// partition, or `default` if the offset runs past the partition end.
pub fn lead<T: Clone>(partition: &[T], index: usize, offset: usize, default: Option<T>) -> Option<T> {
    partition.get(index + offset).cloned().or(default)
}

pub fn first_value<T: Clone>(partition: &[T]) -> Option<T> {
    partition.first().cloned()
}

pub fn last_value<T: Clone>(partition: &[T]) -> Option<T> {
    partition.last().cloned()
}

/// Running state for `SUM/COUNT/AVG/MIN/MAX OVER (ROWS BETWEEN k
/// PRECEDING AND CURRENT ROW)`. `push` advances the window by one row;
/// the window holds at most `width` rows (the current row plus `k`
/// preceding).
#[derive(Debug, Clone)]
pub struct RollingAggregate {
    width: usize,
    /// All rows currently inside the window, in arrival order, for the
    /// invertible SUM/COUNT accumulator.
    window: VecDeque<f64>,
    sum: f64,
    /// Monotonic decreasing deque of `(value, index)` for MAX; front is
    /// always the current window's maximum.
    max_deque: VecDeque<(f64, u64)>,
    /// Monotonic increasing deque of `(value, index)` for MIN.
    min_deque: VecDeque<(f64, u64)>,
    next_index: u64,
}

impl RollingAggregate {
    /// `width` is `k + 1`: the current row plus `k` preceding rows.
    pub fn new(width: usize) -> Self {
        assert!(width > 0, "rolling window width must be positive");
        Self {
            width,
            window: VecDeque::with_capacity(width),
            sum: 0.0,
            max_deque: VecDeque::new(),
            min_deque: VecDeque::new(),
            next_index: 0,
        }
    }

    /// Advances the window by one row, evicting the oldest row once the
    /// window exceeds `width`.
    pub fn push(&mut self, value: f64) {
        let index = self.next_index;
        self.next_index += 1;

        self.window.push_back(value);
        self.sum += value;

        while let Some(&(v, _)) = self.max_deque.back() {
            if v <= value {
                self.max_deque.pop_back();
            } else {
                break;
            }
        }
        self.max_deque.push_back((value, index));

        while let Some(&(v, _)) = self.min_deque.back() {
            if v >= value {
                self.min_deque.pop_back();
            } else {
                break;
            }
        }
        self.min_deque.push_back((value, index));

        if self.window.len() > self.width {
            let evicted = self.window.pop_front().unwrap();
            self.sum -= evicted;
            let cutoff = index.saturating_sub(self.width as u64 - 1);
            while let Some(&(_, i)) = self.max_deque.front() {
                if i < cutoff {
                    self.max_deque.pop_front();
                } else {
                    break;
                }
            }
            while let Some(&(_, i)) = self.min_deque.front() {
                if i < cutoff {
                    self.min_deque.pop_front();
                } else {
                    break;
                }
            }
        }
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn count(&self) -> usize {
        self.window.len()
    }

    pub fn avg(&self) -> Option<f64> {
        if self.window.is_empty() {
            None
        } else {
            Some(self.sum / self.window.len() as f64)
        }
    }

    pub fn max(&self) -> Option<f64> {
        self.max_deque.front().map(|&(v, _)| v)
    }

    pub fn min(&self) -> Option<f64> {
        self.min_deque.front().map(|&(v, _)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(vec![10, 10, 20, 20, 30], vec![1, 1, 3, 3, 5], vec![1, 1, 2, 2, 3])]
    #[case(vec![1, 2, 3], vec![1, 2, 3], vec![1, 2, 3])]
    #[case(vec![5, 5, 5], vec![1, 1, 1], vec![1, 1, 1])]
    fn rank_vs_dense_rank_over_same_partition(
        #[case] values: Vec<i32>,
        #[case] expected_rank: Vec<u64>,
        #[case] expected_dense: Vec<u64>,
    ) {
        assert_eq!(rank(&values), expected_rank);
        assert_eq!(dense_rank(&values), expected_dense);
    }

    #[rstest]
    #[case(10, 3, vec![1, 1, 1, 1, 2, 2, 2, 3, 3, 3])]
    #[case(5, 2, vec![1, 1, 1, 2, 2])]
    #[case(4, 4, vec![1, 2, 3, 4])]
    fn ntile_distributes_extra_rows_to_earlier_buckets(
        #[case] len: usize,
        #[case] n: usize,
        #[case] expected: Vec<u64>,
    ) {
        assert_eq!(ntile(len, n), expected);
    }

    #[test]
    fn lag_lead_read_fixed_offsets() {
        let partition = vec![10, 20, 30, 40];
        assert_eq!(lag(&partition, 2, 1, None), Some(20));
        assert_eq!(lag(&partition, 0, 1, Some(-1)), Some(-1));
        assert_eq!(lead(&partition, 1, 2, None), Some(40));
        assert_eq!(lead(&partition, 3, 1, Some(999)), Some(999));
    }

    #[test]
    fn first_last_value() {
        let partition = vec![10, 20, 30];
        assert_eq!(first_value(&partition), Some(10));
        assert_eq!(last_value(&partition), Some(30));
    }

    #[test]
    fn rolling_aggregate_tracks_sum_avg_min_max_over_window() {
        let mut agg = RollingAggregate::new(3);
        for v in [5.0, 1.0, 3.0, 9.0, 2.0] {
            agg.push(v);
        }
        // Window holds the last 3 values: 3, 9, 2.
        assert_eq!(agg.count(), 3);
        assert_eq!(agg.sum(), 14.0);
        assert_eq!(agg.avg(), Some(14.0 / 3.0));
        assert_eq!(agg.max(), Some(9.0));
        assert_eq!(agg.min(), Some(2.0));
    }

    #[test]
    fn rolling_aggregate_before_window_fills_uses_partial_window() {
        let mut agg = RollingAggregate::new(5);
        agg.push(10.0);
        assert_eq!(agg.count(), 1);
        assert_eq!(agg.sum(), 10.0);
        agg.push(20.0);
        assert_eq!(agg.sum(), 30.0);
        assert_eq!(agg.max(), Some(20.0));
        assert_eq!(agg.min(), Some(10.0));
    }
}
