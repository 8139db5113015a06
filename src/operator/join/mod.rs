//! The incremental-join family: naive, indexed, append-only, fused
//! filter/filter-map, anti, semi, and left/full outer join, all expressed
//! via the bilinear delta formula
//!
//! ```text
//! Δ(A ⋈ B) = (Δa ⋈ Δb) + (A_prev ⋈ Δb) + (Δa ⋈ B_prev)
//! ```
//!
//! where `A_prev`/`B_prev` are the integrated state *before* the current
//! step. State is always updated after the join is computed, never during.

pub mod append_only;
pub mod fused;
pub mod indexed;
pub mod naive;
pub mod outer;
pub mod semi_anti;

pub use append_only::AppendOnlyJoin;
pub use fused::{FusedFilterJoin, FusedFilterMapJoin};
pub use indexed::IndexedJoin;
pub use naive::NaiveJoin;
pub use outer::{FullOuterJoin, LeftOuterJoin};
pub use semi_anti::{anti_join, semi_join};

use std::hash::Hash;

use crate::algebra::{checked_weight_mul, ZSet};

/// Bilinear equi-join: builds a hash index on `b` keyed by `key_b` and
/// probes with `key_a`, emitting `merge(va, vb)` with weight `wa * wb` for
/// every matching pair.
///
/// Null join keys (`key_a`/`key_b` returning `None`) never match anything,
/// including another null, matching SQL semantics.
pub fn equi_join<A, B, K, O, FKA, FKB, FM>(
    a: &ZSet<A>,
    b: &ZSet<B>,
    key_a: FKA,
    key_b: FKB,
    merge: FM,
) -> ZSet<O>
where
    A: Hash + Eq + Clone,
    B: Hash + Eq + Clone,
    K: Hash + Eq + Clone,
    O: Hash + Eq + Clone,
    FKA: Fn(&A) -> Option<K>,
    FKB: Fn(&B) -> Option<K>,
    FM: Fn(&A, &B) -> O,
{
    let mut index: hashbrown::HashMap<K, Vec<(&B, crate::algebra::ZWeight)>> = hashbrown::HashMap::new();
    for (vb, wb) in b.iter() {
        if let Some(k) = key_b(vb) {
            index.entry(k).or_default().push((vb, wb));
        }
    }

    let mut result = ZSet::new();
    for (va, wa) in a.iter() {
        let Some(k) = key_a(va) else { continue };
        if let Some(matches) = index.get(&k) {
            for &(vb, wb) in matches {
                result.insert(merge(va, vb), checked_weight_mul(wa, wb));
            }
        }
    }
    result
}

/// The bilinear delta formula itself, parameterized over the three cross
/// terms so every join variant shares one implementation of the algebraic
/// identity.
pub(crate) fn bilinear_delta<A, B, K, O, FKA, FKB, FM>(
    delta_a: &ZSet<A>,
    delta_b: &ZSet<B>,
    a_prev: &ZSet<A>,
    b_prev: &ZSet<B>,
    key_a: &FKA,
    key_b: &FKB,
    merge: &FM,
) -> ZSet<O>
where
    A: Hash + Eq + Clone,
    B: Hash + Eq + Clone,
    K: Hash + Eq + Clone,
    O: Hash + Eq + Clone,
    FKA: Fn(&A) -> Option<K>,
    FKB: Fn(&B) -> Option<K>,
    FM: Fn(&A, &B) -> O,
{
    let dd = equi_join(delta_a, delta_b, key_a, key_b, merge);
    let ad = equi_join(a_prev, delta_b, key_a, key_b, merge);
    let da = equi_join(delta_a, b_prev, key_a, key_b, merge);
    dd.add(&ad).add(&da)
}
