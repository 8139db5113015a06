//! Fused join-filter[-map]: the predicate (and, for filter-map, the
//! projection) is applied after the key match and before the output pair
//! is materialized, so a plain join followed by a separate `filter`/
//! `filter_map` never allocates the intermediate `(A, B)` Z-set.
//!
//! Like [`super::indexed::IndexedJoin`], both variants hold `A_prev`/
//! `B_prev` as [`IndexedZSet`]s and compute the three bilinear cross terms
//! from deltas rather than rescanning the accumulated state.

use std::hash::Hash;
use std::marker::PhantomData;

use crate::algebra::{checked_weight_mul, IndexedZSet, ZSet};

/// `(left, right) -> bool` evaluated after key-match, eliminating the
/// intermediate `(A, B)` Z-set a plain `join` followed by `filter` would
/// materialize.
pub struct FusedFilterJoin<A, B, K, FKA, FKB, FP> {
    a_state: IndexedZSet<K, A>,
    b_state: IndexedZSet<K, B>,
    key_a: FKA,
    key_b: FKB,
    predicate: FP,
    _marker: PhantomData<(A, B, K)>,
}

impl<A, B, K, FKA, FKB, FP> FusedFilterJoin<A, B, K, FKA, FKB, FP>
where
    A: Hash + Eq + Clone,
    B: Hash + Eq + Clone,
    K: Hash + Eq + Clone,
    FKA: Fn(&A) -> Option<K>,
    FKB: Fn(&B) -> Option<K>,
    FP: Fn(&A, &B) -> bool,
{
    pub fn new(key_a: FKA, key_b: FKB, predicate: FP) -> Self {
        Self {
            a_state: IndexedZSet::new(),
            b_state: IndexedZSet::new(),
            key_a,
            key_b,
            predicate,
            _marker: PhantomData,
        }
    }

    /// Applies one step's deltas and returns the output delta, folding
    /// the predicate into the probe so a row that fails it is never
    /// materialized at all.
    pub fn step(&mut self, delta_a: &ZSet<A>, delta_b: &ZSet<B>) -> ZSet<(A, B)> {
        let dd = probe_delta(delta_a, delta_b, &self.key_a, &self.key_b, |va, vb| {
            (self.predicate)(va, vb).then(|| (va.clone(), vb.clone()))
        });
        let ad = probe_against_state(delta_b, &self.a_state, &self.key_b, |vb, va| {
            (self.predicate)(va, vb).then(|| (va.clone(), vb.clone()))
        });
        let da = probe_against_state(delta_a, &self.b_state, &self.key_a, |va, vb| {
            (self.predicate)(va, vb).then(|| (va.clone(), vb.clone()))
        });
        let output = dd.add(&ad).add(&da);

        fold_into(&mut self.a_state, &self.key_a, delta_a);
        fold_into(&mut self.b_state, &self.key_b, delta_b);
        output
    }

    pub fn reset(&mut self) {
        self.a_state = IndexedZSet::new();
        self.b_state = IndexedZSet::new();
    }
}

/// As [`FusedFilterJoin`], plus a projection `(left, right) -> R`; only
/// the projected value is ever materialized.
pub struct FusedFilterMapJoin<A, B, K, R, FKA, FKB, FP, FM> {
    a_state: IndexedZSet<K, A>,
    b_state: IndexedZSet<K, B>,
    key_a: FKA,
    key_b: FKB,
    predicate: FP,
    project: FM,
    _marker: PhantomData<(A, B, K, R)>,
}

impl<A, B, K, R, FKA, FKB, FP, FM> FusedFilterMapJoin<A, B, K, R, FKA, FKB, FP, FM>
where
    A: Hash + Eq + Clone,
    B: Hash + Eq + Clone,
    K: Hash + Eq + Clone,
    R: Hash + Eq + Clone,
    FKA: Fn(&A) -> Option<K>,
    FKB: Fn(&B) -> Option<K>,
    FP: Fn(&A, &B) -> bool,
    FM: Fn(&A, &B) -> R,
{
    pub fn new(key_a: FKA, key_b: FKB, predicate: FP, project: FM) -> Self {
        Self {
            a_state: IndexedZSet::new(),
            b_state: IndexedZSet::new(),
            key_a,
            key_b,
            predicate,
            project,
            _marker: PhantomData,
        }
    }

    pub fn step(&mut self, delta_a: &ZSet<A>, delta_b: &ZSet<B>) -> ZSet<R> {
        let dd = probe_delta(delta_a, delta_b, &self.key_a, &self.key_b, |va, vb| {
            (self.predicate)(va, vb).then(|| (self.project)(va, vb))
        });
        let ad = probe_against_state(delta_b, &self.a_state, &self.key_b, |vb, va| {
            (self.predicate)(va, vb).then(|| (self.project)(va, vb))
        });
        let da = probe_against_state(delta_a, &self.b_state, &self.key_a, |va, vb| {
            (self.predicate)(va, vb).then(|| (self.project)(va, vb))
        });
        let output = dd.add(&ad).add(&da);

        fold_into(&mut self.a_state, &self.key_a, delta_a);
        fold_into(&mut self.b_state, &self.key_b, delta_b);
        output
    }

    pub fn reset(&mut self) {
        self.a_state = IndexedZSet::new();
        self.b_state = IndexedZSet::new();
    }
}

/// `Δa ⋈ Δb`, fusing `combine` (predicate + optional projection) into the
/// probe itself.
fn probe_delta<A, B, K, O>(
    delta_a: &ZSet<A>,
    delta_b: &ZSet<B>,
    key_a: &impl Fn(&A) -> Option<K>,
    key_b: &impl Fn(&B) -> Option<K>,
    combine: impl Fn(&A, &B) -> Option<O>,
) -> ZSet<O>
where
    A: Hash + Eq + Clone,
    B: Hash + Eq + Clone,
    K: Hash + Eq + Clone,
    O: Hash + Eq + Clone,
{
    let mut index: hashbrown::HashMap<K, Vec<(&B, crate::algebra::ZWeight)>> = hashbrown::HashMap::new();
    for (vb, wb) in delta_b.iter() {
        if let Some(k) = key_b(vb) {
            index.entry(k).or_default().push((vb, wb));
        }
    }

    let mut result = ZSet::new();
    for (va, wa) in delta_a.iter() {
        let Some(k) = key_a(va) else { continue };
        if let Some(matches) = index.get(&k) {
            for &(vb, wb) in matches {
                if let Some(o) = combine(va, vb) {
                    result.insert(o, checked_weight_mul(wa, wb));
                }
            }
        }
    }
    result
}

/// `delta ⋈ index`: probes an indexed accumulator with every element of a
/// small delta, fusing `combine` into the probe.
fn probe_against_state<T, U, K, O>(
    delta: &ZSet<T>,
    index: &IndexedZSet<K, U>,
    key_delta: &impl Fn(&T) -> Option<K>,
    combine: impl Fn(&T, &U) -> Option<O>,
) -> ZSet<O>
where
    T: Hash + Eq + Clone,
    U: Hash + Eq + Clone,
    K: Hash + Eq + Clone,
    O: Hash + Eq + Clone,
{
    let mut out = ZSet::new();
    for (t, wt) in delta.iter() {
        let Some(k) = key_delta(t) else { continue };
        for (u, wu) in index.entries_by_join_key(&k) {
            if let Some(o) = combine(t, u) {
                out.insert(o, checked_weight_mul(wt, wu));
            }
        }
    }
    out
}

fn fold_into<T, K>(state: &mut IndexedZSet<K, T>, key: &impl Fn(&T) -> Option<K>, delta: &ZSet<T>)
where
    T: Hash + Eq + Clone,
    K: Hash + Eq + Clone,
{
    for (v, w) in delta.iter() {
        if let Some(k) = key(v) {
            state.insert(k, v.clone(), w);
        }
    }
}
