//! Streams over a group-valued type, and pointwise lifting of scalar
//! functions into stream operators.
//!
//! A `Stream<T>` is conceptually `ℕ → T`; we materialize a finite prefix
//! and treat every position beyond it as `T::zero()`.

use crate::algebra::HasZero;

/// A finite, extensible prefix of a conceptually infinite sequence of
/// values in a group. Positions past the materialized prefix read as
/// `T::zero()`.
#[derive(Clone, Debug)]
pub struct Stream<T> {
    values: Vec<T>,
}

impl<T: HasZero + Clone> Default for Stream<T> {
    fn default() -> Self {
        Self { values: Vec::new() }
    }
}

impl<T: HasZero + Clone> Stream<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: Vec<T>) -> Self {
        Self { values }
    }

    pub fn push(&mut self, value: T) {
        self.values.push(value);
    }

    /// Value at position `t`; `T::zero()` beyond the materialized prefix.
    pub fn at(&self, t: usize) -> T {
        self.values.get(t).cloned().unwrap_or_else(T::zero)
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn length(&self) -> usize {
        self.values.len()
    }

    pub fn zero() -> T {
        T::zero()
    }
}

/// Converts a scalar `T -> U` into a stream operator applied pointwise at
/// every materialized position. Linear iff `f` is.
pub fn lift<T, U, F>(input: &Stream<T>, f: F) -> Stream<U>
where
    T: HasZero + Clone,
    U: HasZero + Clone,
    F: Fn(&T) -> U,
{
    Stream::from_values(input.values().iter().map(f).collect())
}

/// Pointwise binary lift: applies `f` at every position across two
/// streams, treating missing positions in the shorter stream as zero.
pub fn lift2<T1, T2, U, F>(a: &Stream<T1>, b: &Stream<T2>, f: F) -> Stream<U>
where
    T1: HasZero + Clone,
    T2: HasZero + Clone,
    U: HasZero + Clone,
    F: Fn(&T1, &T2) -> U,
{
    let len = a.length().max(b.length());
    let mut out = Vec::with_capacity(len);
    for t in 0..len {
        out.push(f(&a.at(t), &b.at(t)));
    }
    Stream::from_values(out)
}
