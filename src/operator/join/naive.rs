//! Naive join: two plain-`ZSet` integration accumulators, a fresh hash
//! index built on every invocation. Simple, and O(|A| + |B|) per step
//! regardless of delta size — the baseline the indexed and append-only
//! variants improve on.

use std::hash::Hash;
use std::marker::PhantomData;

use crate::algebra::ZSet;

use super::bilinear_delta;

/// Maintains `A_prev`/`B_prev` as plain Z-sets and recomputes the bilinear
/// delta formula's hash index from scratch on every step.
pub struct NaiveJoin<A, B, K, O, FKA, FKB, FM> {
    a_state: ZSet<A>,
    b_state: ZSet<B>,
    key_a: FKA,
    key_b: FKB,
    merge: FM,
    _marker: PhantomData<(K, O)>,
}

impl<A, B, K, O, FKA, FKB, FM> NaiveJoin<A, B, K, O, FKA, FKB, FM>
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
            a_state: ZSet::new(),
            b_state: ZSet::new(),
            key_a,
            key_b,
            merge,
            _marker: PhantomData,
        }
    }

    pub fn step(&mut self, delta_a: &ZSet<A>, delta_b: &ZSet<B>) -> ZSet<O> {
        let output = bilinear_delta(
            delta_a,
            delta_b,
            &self.a_state,
            &self.b_state,
            &self.key_a,
            &self.key_b,
            &self.merge,
        );
        self.a_state = self.a_state.add(delta_a);
        self.b_state = self.b_state.add(delta_b);
        output
    }

    pub fn reset(&mut self) {
        self.a_state = ZSet::new();
        self.b_state = ZSet::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::join::tests::{sample_orders_customers, Customer, Order};
    use crate::zset;

    #[test]
    fn insert_then_delete_scenario() {
        let (customers, orders) = sample_orders_customers();
        let mut join = NaiveJoin::new(
            |o: &Order| Some(o.customer),
            |c: &Customer| Some(c.id),
            |o: &Order, c: &Customer| (o.id, c.name, o.amount),
        );

        let step1 = join.step(&orders, &customers);
        assert_eq!(step1.count(), 3);

        let delete_o1 = zset! { Order { id: 1, customer: 1, amount: 100 } => -1 };
        let insert_o1b = zset! { Order { id: 1, customer: 1, amount: 120 } => 1 };
        let step2 = join.step(&delete_o1.add(&insert_o1b), &ZSet::new());

        // Net row count over both steps stays at 3; Alice's rows now sum to 120+150.
        let mut total = step1.add(&step2);
        assert_eq!(total.count(), 3);
        let alice_total: u32 = total
            .iter()
            .filter(|(tup, w)| tup.1 == "Alice" && *w > 0)
            .map(|(tup, _)| tup.2)
            .sum();
        assert_eq!(alice_total, 270);

        let delete_alice = zset! { Customer { id: 1, name: "Alice" } => -1 };
        let step3 = join.step(&ZSet::new(), &delete_alice);
        total = total.add(&step3);
        assert_eq!(total.count(), 1);
    }
}
