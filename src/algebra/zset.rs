//! Z-sets: weighted multisets over an abelian group of weights.
//!
//! A Z-set never stores an entry with weight zero; every transform named
//! here is documented as linear, bilinear, or (for `distinct`) non-linear,
//! which is the algebraic property the incrementalization of that
//! transform depends on.

use std::{
    borrow::Borrow,
    hash::Hash,
    iter::FromIterator,
};

use deepsize::{Context, DeepSizeOf};
use hashbrown::HashMap;

use crate::algebra::{checked_weight_mul, Group, HasZero, ZWeight};

type Map<T> = HashMap<T, ZWeight, fxhash::FxBuildHasher>;

/// A weighted multiset over `T`, with the invariant that no entry has
/// weight zero. `T` only needs `Hash + Eq + Clone`, rather than any
/// stringify-then-compare identity convention.
#[derive(Clone)]
pub struct ZSet<T> {
    entries: Map<T>,
}

impl<T> Default for ZSet<T> {
    fn default() -> Self {
        Self {
            entries: Map::default(),
        }
    }
}

impl<T: Hash + Eq + Clone> ZSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Map::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// A Z-set containing a single element with weight 1.
    pub fn singleton(value: T) -> Self {
        let mut z = Self::new();
        z.insert(value, 1);
        z
    }

    /// Current weight of `value` (zero if absent).
    pub fn weight<Q>(&self, value: &Q) -> ZWeight
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(value).copied().unwrap_or(0)
    }

    /// Add `delta` to the weight of `value`, dropping the entry if the
    /// result is zero.
    pub fn insert(&mut self, value: T, delta: ZWeight) {
        if delta == 0 {
            return;
        }
        match self.entries.raw_entry_mut().from_key(&value) {
            hashbrown::hash_map::RawEntryMut::Occupied(mut e) => {
                let w = e.get_mut();
                *w += delta;
                if *w == 0 {
                    e.remove();
                }
            }
            hashbrown::hash_map::RawEntryMut::Vacant(e) => {
                e.insert(value, delta);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&T, ZWeight)> {
        self.entries.iter().map(|(k, w)| (k, *w))
    }

    pub fn into_iter_owned(self) -> impl Iterator<Item = (T, ZWeight)> {
        self.entries.into_iter()
    }

    /// `true` iff every weight is zero, i.e. the Z-set is empty (since no
    /// zero-weight entry is ever stored).
    pub fn is_zero_set(&self) -> bool {
        self.is_empty()
    }

    /// `true` iff every stored weight equals 1 — the Z-set behaves like a
    /// plain set.
    pub fn is_set(&self) -> bool {
        self.entries.values().all(|&w| w == 1)
    }

    /// `true` iff no entry has a negative weight.
    pub fn is_positive(&self) -> bool {
        self.entries.values().all(|&w| w > 0)
    }

    pub fn negate(&self) -> Self {
        Self {
            entries: self.entries.iter().map(|(k, w)| (k.clone(), -w)).collect(),
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        let (mut big, small) = if self.len() >= other.len() {
            (self.clone(), other)
        } else {
            (other.clone(), self)
        };
        for (k, w) in small.iter() {
            big.insert(k.clone(), w);
        }
        big
    }

    pub fn subtract(&self, other: &Self) -> Self {
        self.add(&other.negate())
    }

    /// Bag-semantics intersection: for each key present in both, the
    /// minimum of the two weights, but only when both weights are
    /// positive (negative weights don't represent "copies present").
    pub fn intersect(&self, other: &Self) -> Self {
        let (small, big) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        let mut result = Self::new();
        for (k, w) in small.iter() {
            let ow = big.weight(k);
            if w > 0 && ow > 0 {
                result.insert(k.clone(), w.min(ow));
            }
        }
        result
    }

    /// Linear: `filter(a+b) = filter(a) + filter(b)`. Weights are
    /// preserved exactly, including negative weights.
    pub fn filter<F>(&self, pred: F) -> Self
    where
        F: Fn(&T) -> bool,
    {
        let mut result = Self::with_capacity(self.len());
        for (k, w) in self.iter() {
            if pred(k) {
                result.insert(k.clone(), w);
            }
        }
        result
    }

    /// Linear. Values may collide after mapping; colliding weights
    /// combine, matching Z-set semantics.
    pub fn map<U, F>(&self, f: F) -> ZSet<U>
    where
        U: Hash + Eq + Clone,
        F: Fn(&T) -> U,
    {
        let mut result = ZSet::with_capacity(self.len());
        for (k, w) in self.iter() {
            result.insert(f(k), w);
        }
        result
    }

    /// Linear.
    pub fn flat_map<U, F, I>(&self, f: F) -> ZSet<U>
    where
        U: Hash + Eq + Clone,
        I: IntoIterator<Item = U>,
        F: Fn(&T) -> I,
    {
        let mut result = ZSet::new();
        for (k, w) in self.iter() {
            for u in f(k) {
                result.insert(u, w);
            }
        }
        result
    }

    /// Σ weights.
    pub fn count(&self) -> ZWeight {
        self.entries.values().sum()
    }

    /// Σ f(v)·w.
    pub fn sum<F>(&self, f: F) -> ZWeight
    where
        F: Fn(&T) -> ZWeight,
    {
        self.entries.iter().map(|(k, w)| f(k) * w).sum()
    }

    /// Non-linear: positive weights collapse to 1, non-positive entries
    /// are dropped. See `operator::distinct` for the incremental version
    /// that avoids recomputing this from scratch every step.
    pub fn distinct(&self) -> Self {
        let mut result = Self::new();
        for (k, w) in self.iter() {
            if w > 0 {
                result.insert(k.clone(), 1);
            }
        }
        result
    }

    /// Bilinear: multiplies weights pairwise over the cartesian product.
    pub fn cartesian<U, V, F>(&self, other: &ZSet<U>, f: F) -> ZSet<V>
    where
        U: Hash + Eq + Clone,
        V: Hash + Eq + Clone,
        F: Fn(&T, &U) -> V,
    {
        let mut result = ZSet::new();
        for (a, wa) in self.iter() {
            for (b, wb) in other.iter() {
                result.insert(f(a, b), checked_weight_mul(wa, wb));
            }
        }
        result
    }
}

impl<T: Hash + Eq + Clone> HasZero for ZSet<T> {
    fn zero() -> Self {
        Self::new()
    }
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Hash + Eq + Clone> Group for ZSet<T> {
    fn add(&self, other: &Self) -> Self {
        ZSet::add(self, other)
    }
    fn negate(&self) -> Self {
        ZSet::negate(self)
    }
}

/// `hashbrown::HashMap` itself has no `DeepSizeOf` impl, so this walks
/// the entries directly rather than deriving. Used by
/// `Circuit::state_size` for any stateful operator whose state is built
/// on `ZSet`.
impl<T: Hash + Eq + Clone + DeepSizeOf> DeepSizeOf for ZSet<T> {
    fn deep_size_of_children(&self, context: &mut Context) -> usize {
        self.entries
            .iter()
            .map(|(k, _)| k.deep_size_of_children(context) + std::mem::size_of::<T>() + std::mem::size_of::<ZWeight>())
            .sum()
    }
}

impl<T: Hash + Eq + Clone> FromIterator<(T, ZWeight)> for ZSet<T> {
    fn from_iter<I: IntoIterator<Item = (T, ZWeight)>>(iter: I) -> Self {
        let mut z = Self::new();
        for (v, w) in iter {
            z.insert(v, w);
        }
        z
    }
}

impl<T: Hash + Eq + Clone> IntoIterator for ZSet<T> {
    type Item = (T, ZWeight);
    type IntoIter = hashbrown::hash_map::IntoIter<T, ZWeight>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<T: Hash + Eq + Clone + PartialEq> PartialEq for ZSet<T> {
    /// Equal iff they contain the same (key, weight) pairs; iteration
    /// order is irrelevant.
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<T: Hash + Eq + Clone + Eq> Eq for ZSet<T> {}

impl<T: std::fmt::Debug + Hash + Eq + Clone> std::fmt::Debug for ZSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

/// Build a `ZSet` from a literal list of `(value, weight)` pairs.
#[macro_export]
macro_rules! zset {
    () => { $crate::algebra::ZSet::new() };
    ($($value:expr => $weight:expr),+ $(,)?) => {{
        let mut z = $crate::algebra::ZSet::new();
        $( z.insert($value, $weight); )+
        z
    }};
}
