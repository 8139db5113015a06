//! Append-only join: the external precondition that both input streams
//! only ever insert (weights strictly positive, no deletions) lets the
//! cross terms `A_prev ⋈ Δb` / `Δa ⋈ B_prev` be computed with half the
//! bookkeeping a general join needs, since no retraction ever has to flow
//! back out through previously emitted output.
//!
//! The precondition is not merely assumed: every incoming delta is
//! checked, and non-positive entries are skipped rather than folded into
//! state, so a caller that violates the precondition gets a silently
//! incomplete join rather than state corruption.

use std::hash::Hash;
use std::marker::PhantomData;

use crate::algebra::{checked_weight_mul, IndexedZSet, ZSet, ZWeight};

/// Indexed join state restricted to append-only inputs. Entries with a
/// non-positive weight are dropped from the delta before folding into
/// state or taking part in a cross term — see [`AppendOnlyJoin::step`].
pub struct AppendOnlyJoin<A, B, K, O, FKA, FKB, FM> {
    a_state: IndexedZSet<K, A>,
    b_state: IndexedZSet<K, B>,
    key_a: FKA,
    key_b: FKB,
    merge: FM,
    _marker: PhantomData<O>,
}

impl<A, B, K, O, FKA, FKB, FM> AppendOnlyJoin<A, B, K, O, FKA, FKB, FM>
where
    A: Hash + Eq + Clone,
    B: Hash + Eq + Clone,
    K: Hash + Eq + Clone,
    O: Hash + Eq + Clone,
    FKA: Fn(&A) -> Option<K>,
    FKB: Fn(&B) -> Option<K>,
    FM: Fn(&A, &B) -> O,
{
    pub fn new(key_a: FKA, key_b: FKB, merge: FM) -> Self {
        Self {
            a_state: IndexedZSet::new(),
            b_state: IndexedZSet::new(),
            key_a,
            key_b,
            merge,
            _marker: PhantomData,
        }
    }

    /// Keeps only entries with weight `> 0`, the append-only precondition.
    fn positive_only<T: Hash + Eq + Clone>(delta: &ZSet<T>) -> ZSet<T> {
        delta
            .iter()
            .filter(|(_, w)| *w > 0)
            .map(|(v, w)| (v.clone(), w))
            .collect()
    }

    pub fn step(&mut self, delta_a: &ZSet<A>, delta_b: &ZSet<B>) -> ZSet<O> {
        let delta_a = Self::positive_only(delta_a);
        let delta_b = Self::positive_only(delta_b);

        let mut output = ZSet::new();

        for (va, wa) in delta_a.iter() {
            if let Some(k) = (self.key_a)(va) {
                for (vb, wb) in self.b_state.entries_by_join_key(&k) {
                    output.insert((self.merge)(va, vb), checked_weight_mul(wa, wb));
                }
            }
        }
        for (vb, wb) in delta_b.iter() {
            if let Some(k) = (self.key_b)(vb) {
                for (va, wa) in self.a_state.entries_by_join_key(&k) {
                    output.insert((self.merge)(va, vb), checked_weight_mul(wa, wb));
                }
            }
        }
        // Δa ⋈ Δb, folded in once so a match within the same step is not
        // double counted by the two loops above (neither loop above sees
        // the other's delta, only prior state).
        for (va, wa) in delta_a.iter() {
            let Some(ka) = (self.key_a)(va) else { continue };
            for (vb, wb) in delta_b.iter() {
                if (self.key_b)(vb).as_ref() == Some(&ka) {
                    let w: ZWeight = checked_weight_mul(wa, wb);
                    output.insert((self.merge)(va, vb), w);
                }
            }
        }

        for (va, w) in delta_a.iter() {
            if let Some(k) = (self.key_a)(va) {
                self.a_state.insert(k, va.clone(), w);
            }
        }
        for (vb, w) in delta_b.iter() {
            if let Some(k) = (self.key_b)(vb) {
                self.b_state.insert(k, vb.clone(), w);
            }
        }

        output
    }

    pub fn reset(&mut self) {
        self.a_state = IndexedZSet::new();
        self.b_state = IndexedZSet::new();
    }
}
