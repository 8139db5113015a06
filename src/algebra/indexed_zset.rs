//! Indexed Z-sets: a Z-set plus a secondary hash index on a join key.
//!
//! Semantically identical to a `ZSet<(K, V)>`; the index exists purely to
//! make `entries_by_join_key` expected O(1 + matches) instead of a full
//! scan, which is what the indexed join variant (`operator::join::indexed`)
//! needs to avoid re-scanning its whole state on every step.

use std::hash::Hash;

use hashbrown::HashSet;

use crate::algebra::{zset::ZSet, Group, HasZero, ZWeight};

type Bucket<K, V> = HashSet<V, fxhash::FxBuildHasher>;

/// `ZSet<(K, V)>` plus `join_key -> set of values` for fast lookups keyed
/// on `K`. Both structures are kept in sync by every mutating method;
/// mutation is single-threaded within a step so partial updates are never
/// observable.
#[derive(Clone)]
pub struct IndexedZSet<K, V> {
    base: ZSet<(K, V)>,
    index: hashbrown::HashMap<K, Bucket<K, V>, fxhash::FxBuildHasher>,
}

impl<K, V> Default for IndexedZSet<K, V>
where
    K: Hash + Eq + Clone,
    V: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self {
            base: ZSet::new(),
            index: Default::default(),
        }
    }
}

impl<K, V> IndexedZSet<K, V>
where
    K: Hash + Eq + Clone,
    V: Hash + Eq + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn weight(&self, key: &K, value: &V) -> ZWeight {
        self.base.weight(&(key.clone(), value.clone()))
    }

    pub fn insert(&mut self, key: K, value: V, delta: ZWeight) {
        if delta == 0 {
            return;
        }
        let was_present = self.base.weight(&(key.clone(), value.clone())) != 0;
        self.base.insert((key.clone(), value.clone()), delta);
        let now_present = self.base.weight(&(key.clone(), value.clone())) != 0;

        if now_present && !was_present {
            self.index.entry(key).or_default().insert(value);
        } else if !now_present && was_present {
            if let Some(bucket) = self.index.get_mut(&key) {
                bucket.remove(&value);
                if bucket.is_empty() {
                    self.index.remove(&key);
                }
            }
        }
    }

    /// Values (with current weight) sharing `join_key`, in expected
    /// O(1 + matches).
    pub fn entries_by_join_key<'a>(&'a self, join_key: &K) -> impl Iterator<Item = (&'a V, ZWeight)> + 'a {
        let key = join_key.clone();
        self.index
            .get(join_key)
            .into_iter()
            .flat_map(move |bucket| bucket.iter())
            .map(move |v| (v, self.base.weight(&(key.clone(), v.clone()))))
    }

    pub fn join_keys(&self) -> impl Iterator<Item = &K> {
        self.index.keys()
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V, ZWeight)> {
        self.base.iter().map(|((k, v), w)| (k, v, w))
    }

    /// Materialize back to a plain `ZSet<(K, V)>` — must equal the Z-set
    /// this indexed Z-set was derived from, after any sequence of inserts.
    pub fn to_zset(&self) -> ZSet<(K, V)> {
        self.base.clone()
    }

    pub fn from_zset(zset: ZSet<(K, V)>) -> Self {
        let mut result = Self::new();
        for ((k, v), w) in zset.into_iter_owned() {
            result.insert(k, v, w);
        }
        result
    }

    pub fn add(&self, other: &Self) -> Self {
        Self::from_zset(self.base.add(&other.base))
    }

    pub fn negate(&self) -> Self {
        Self::from_zset(self.base.negate())
    }
}

impl<K, V> HasZero for IndexedZSet<K, V>
where
    K: Hash + Eq + Clone,
    V: Hash + Eq + Clone,
{
    fn zero() -> Self {
        Self::new()
    }
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> Group for IndexedZSet<K, V>
where
    K: Hash + Eq + Clone,
    V: Hash + Eq + Clone,
{
    fn add(&self, other: &Self) -> Self {
        IndexedZSet::add(self, other)
    }
    fn negate(&self) -> Self {
        IndexedZSet::negate(self)
    }
}

impl<K, V> PartialEq for IndexedZSet<K, V>
where
    K: Hash + Eq + Clone,
    V: Hash + Eq + Clone,
{
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
    }
}
impl<K, V> Eq for IndexedZSet<K, V>
where
    K: Hash + Eq + Clone,
    V: Hash + Eq + Clone,
{
}
