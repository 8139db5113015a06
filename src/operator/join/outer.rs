//! Left and full outer join.
//!
//! Unlike the other join variants, outer join's unmatched-row complement
//! cannot be produced incrementally from the three bilinear cross terms
//! alone: a row already emitted as "unmatched" must be retracted the
//! moment a match for it first appears, which requires knowing the
//! *current* match count for that row, not just its delta. Both variants
//! recompute the unmatched complement from the fully integrated state on
//! every step and diff it against the previous step's complement to
//! produce an output delta. The matched side still uses the incremental
//! indexed join.

use std::hash::Hash;

use crate::algebra::ZSet;

use super::indexed::IndexedJoin;

/// `A LEFT OUTER JOIN B`: every row of `A` appears, paired with a
/// matching `B` row when one exists, or with the unmatched projection
/// `unmatched(a)` once per `A` row with no current match.
pub struct LeftOuterJoin<A, B, K, O, FKA, FKB, FM, FU> {
    inner: IndexedJoin<A, B, K, O, FKA, FKB, FM>,
    a_integrated: ZSet<A>,
    b_keys_integrated: hashbrown::HashSet<K>,
    previous_complement: ZSet<O>,
    key_a: FKA,
    key_b: FKB,
    unmatched: FU,
}

impl<A, B, K, O, FKA, FKB, FM, FU> LeftOuterJoin<A, B, K, O, FKA, FKB, FM, FU>
where
    A: Hash + Eq + Clone,
    B: Hash + Eq + Clone,
    K: Hash + Eq + Clone,
    O: Hash + Eq + Clone,
    FKA: Fn(&A) -> Option<K> + Copy,
    FKB: Fn(&B) -> Option<K> + Copy,
    FM: Fn(&A, &B) -> O,
    FU: Fn(&A) -> O,
{
    pub fn new(key_a: FKA, key_b: FKB, merge: FM, unmatched: FU) -> Self {
        Self {
            inner: IndexedJoin::new(key_a, key_b, merge),
            a_integrated: ZSet::new(),
            b_keys_integrated: hashbrown::HashSet::new(),
            previous_complement: ZSet::new(),
            key_a,
            key_b,
            unmatched,
        }
    }

    /// Recomputes the full unmatched complement from integrated state and
    /// returns the delta against the previous step's complement.
    fn complement_delta(&mut self) -> ZSet<O> {
        let mut complement = ZSet::new();
        for (va, w) in self.a_integrated.iter() {
            if w <= 0 {
                continue;
            }
            let has_match = (self.key_a)(va)
                .map(|k| self.b_keys_integrated.contains(&k))
                .unwrap_or(false);
            if !has_match {
                complement.insert((self.unmatched)(va), 1);
            }
        }
        let delta = complement.subtract(&self.previous_complement);
        self.previous_complement = complement;
        delta
    }

    pub fn step(&mut self, delta_a: &ZSet<A>, delta_b: &ZSet<B>) -> ZSet<O> {
        let matched = self.inner.step(delta_a, delta_b);

        self.a_integrated = self.a_integrated.add(delta_a);
        for (vb, w) in delta_b.iter() {
            if w <= 0 {
                continue;
            }
            if let Some(k) = (self.key_b)(vb) {
                self.b_keys_integrated.insert(k);
            }
        }

        let complement_delta = self.complement_delta();
        matched.add(&complement_delta)
    }

    pub fn reset(&mut self) {
        self.inner.reset();
        self.a_integrated = ZSet::new();
        self.b_keys_integrated = hashbrown::HashSet::new();
        self.previous_complement = ZSet::new();
    }
}

/// `A FULL OUTER JOIN B`: a [`LeftOuterJoin`] plus the symmetric
/// unmatched complement on the `B` side.
pub struct FullOuterJoin<A, B, K, O, FKA, FKB, FM, FUA, FUB> {
    inner: IndexedJoin<A, B, K, O, FKA, FKB, FM>,
    a_integrated: ZSet<A>,
    b_integrated: ZSet<B>,
    a_keys_integrated: hashbrown::HashSet<K>,
    b_keys_integrated: hashbrown::HashSet<K>,
    previous_a_complement: ZSet<O>,
    previous_b_complement: ZSet<O>,
    key_a: FKA,
    key_b: FKB,
    unmatched_a: FUA,
    unmatched_b: FUB,
}

impl<A, B, K, O, FKA, FKB, FM, FUA, FUB> FullOuterJoin<A, B, K, O, FKA, FKB, FM, FUA, FUB>
where
    A: Hash + Eq + Clone,
    B: Hash + Eq + Clone,
    K: Hash + Eq + Clone,
    O: Hash + Eq + Clone,
    FKA: Fn(&A) -> Option<K> + Copy,
    FKB: Fn(&B) -> Option<K> + Copy,
    FM: Fn(&A, &B) -> O,
    FUA: Fn(&A) -> O,
    FUB: Fn(&B) -> O,
{
    pub fn new(key_a: FKA, key_b: FKB, merge: FM, unmatched_a: FUA, unmatched_b: FUB) -> Self {
        Self {
            inner: IndexedJoin::new(key_a, key_b, merge),
            a_integrated: ZSet::new(),
            b_integrated: ZSet::new(),
            a_keys_integrated: hashbrown::HashSet::new(),
            b_keys_integrated: hashbrown::HashSet::new(),
            previous_a_complement: ZSet::new(),
            previous_b_complement: ZSet::new(),
            key_a,
            key_b,
            unmatched_a,
            unmatched_b,
        }
    }

    pub fn step(&mut self, delta_a: &ZSet<A>, delta_b: &ZSet<B>) -> ZSet<O> {
        let matched = self.inner.step(delta_a, delta_b);

        self.a_integrated = self.a_integrated.add(delta_a);
        self.b_integrated = self.b_integrated.add(delta_b);
        for (va, w) in delta_a.iter() {
            if w > 0 {
                if let Some(k) = (self.key_a)(va) {
                    self.a_keys_integrated.insert(k);
                }
            }
        }
        for (vb, w) in delta_b.iter() {
            if w > 0 {
                if let Some(k) = (self.key_b)(vb) {
                    self.b_keys_integrated.insert(k);
                }
            }
        }

        let mut a_complement = ZSet::new();
        for (va, w) in self.a_integrated.iter() {
            if w <= 0 {
                continue;
            }
            let has_match = (self.key_a)(va)
                .map(|k| self.b_keys_integrated.contains(&k))
                .unwrap_or(false);
            if !has_match {
                a_complement.insert((self.unmatched_a)(va), 1);
            }
        }
        let a_delta = a_complement.subtract(&self.previous_a_complement);
        self.previous_a_complement = a_complement;

        let mut b_complement = ZSet::new();
        for (vb, w) in self.b_integrated.iter() {
            if w <= 0 {
                continue;
            }
            let has_match = (self.key_b)(vb)
                .map(|k| self.a_keys_integrated.contains(&k))
                .unwrap_or(false);
            if !has_match {
                b_complement.insert((self.unmatched_b)(vb), 1);
            }
        }
        let b_delta = b_complement.subtract(&self.previous_b_complement);
        self.previous_b_complement = b_complement;

        matched.add(&a_delta).add(&b_delta)
    }

    pub fn reset(&mut self) {
        self.inner.reset();
        self.a_integrated = ZSet::new();
        self.b_integrated = ZSet::new();
        self.a_keys_integrated = hashbrown::HashSet::new();
        self.b_keys_integrated = hashbrown::HashSet::new();
        self.previous_a_complement = ZSet::new();
        self.previous_b_complement = ZSet::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::join::tests::{Customer, Order};
    use crate::zset;

    fn key_o(o: &Order) -> Option<u32> {
        Some(o.customer)
    }
    fn key_c(c: &Customer) -> Option<u32> {
        Some(c.id)
    }

    #[test]
    fn left_outer_emits_unmatched_once_and_retracts_on_match() {
        let orders = zset! {
            Order { id: 1, customer: 1, amount: 100 } => 1,
            Order { id: 2, customer: 2, amount: 200 } => 1,
        };
        let mut join = LeftOuterJoin::new(
            key_o,
            key_c,
            |o: &Order, c: &Customer| (o.id, Some(c.name), o.amount),
            |o: &Order| (o.id, None, o.amount),
        );

        let step1 = join.step(&orders, &ZSet::new());
        // Neither order has a matching customer yet.
        assert_eq!(step1.weight(&(1, None, 100)), 1);
        assert_eq!(step1.weight(&(2, None, 200)), 1);

        let customers = zset! { Customer { id: 1, name: "Alice" } => 1 };
        let step2 = join.step(&ZSet::new(), &customers);
        // Order 1 now matches: its unmatched row is retracted, the
        // matched row is emitted; order 2 is untouched.
        assert_eq!(step2.weight(&(1, None, 100)), -1);
        assert_eq!(step2.weight(&(1, Some("Alice"), 100)), 1);
        assert_eq!(step2.weight(&(2, None, 200)), 0);
    }

    #[test]
    fn full_outer_tracks_unmatched_on_both_sides() {
        let orders = zset! { Order { id: 1, customer: 1, amount: 100 } => 1 };
        let customers = zset! { Customer { id: 2, name: "Bob" } => 1 };
        let mut join = FullOuterJoin::new(
            key_o,
            key_c,
            |o: &Order, c: &Customer| (Some(o.id), Some(c.id)),
            |o: &Order| (Some(o.id), None),
            |c: &Customer| (None, Some(c.id)),
        );

        let step = join.step(&orders, &customers);
        assert_eq!(step.weight(&(Some(1), None)), 1);
        assert_eq!(step.weight(&(None, Some(2))), 1);
    }
}
