//! Semi- and anti-join: filter one Z-set by key-set membership in
//! another, without ever materializing the matched pair.

use std::hash::Hash;

use crate::algebra::ZSet;

/// Keeps every `a` whose key has at least one match in `b`.
pub fn semi_join<A, B, K, FKA, FKB>(a: &ZSet<A>, b: &ZSet<B>, key_a: FKA, key_b: FKB) -> ZSet<A>
where
    A: Hash + Eq + Clone,
    B: Hash + Eq + Clone,
    K: Hash + Eq + Clone,
    FKA: Fn(&A) -> Option<K>,
    FKB: Fn(&B) -> Option<K>,
{
    let keys: hashbrown::HashSet<K> = b.iter().filter_map(|(v, w)| if w > 0 { key_b(v) } else { None }).collect();
    a.filter(|v| key_a(v).map(|k| keys.contains(&k)).unwrap_or(false))
}

/// Keeps every `a` whose key has no match in `b` (including `a`s whose
/// key is `None`, which never "matches" anything).
pub fn anti_join<A, B, K, FKA, FKB>(a: &ZSet<A>, b: &ZSet<B>, key_a: FKA, key_b: FKB) -> ZSet<A>
where
    A: Hash + Eq + Clone,
    B: Hash + Eq + Clone,
    K: Hash + Eq + Clone,
    FKA: Fn(&A) -> Option<K>,
    FKB: Fn(&B) -> Option<K>,
{
    let keys: hashbrown::HashSet<K> = b.iter().filter_map(|(v, w)| if w > 0 { key_b(v) } else { None }).collect();
    a.filter(|v| !key_a(v).map(|k| keys.contains(&k)).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::join::tests::{sample_orders_customers, Customer, Order};
    use crate::zset;

    #[test]
    fn semi_join_keeps_only_matched_keys() {
        let (customers, orders) = sample_orders_customers();
        let only_alice = zset! { Customer { id: 1, name: "Alice" } => 1 };
        let result = semi_join(&orders, &only_alice, |o: &Order| Some(o.customer), |c: &Customer| Some(c.id));
        assert_eq!(result.count(), 2);
        assert!(result.iter().all(|(o, _)| o.customer == 1));
    }

    #[test]
    fn anti_join_keeps_only_unmatched_keys() {
        let (customers, orders) = sample_orders_customers();
        let only_alice = zset! { Customer { id: 1, name: "Alice" } => 1 };
        let _ = customers;
        let result = anti_join(&orders, &only_alice, |o: &Order| Some(o.customer), |c: &Customer| Some(c.id));
        assert_eq!(result.count(), 1);
        assert!(result.iter().all(|(o, _)| o.customer == 2));
    }

    #[test]
    fn semi_anti_partition_the_input() {
        let (customers, orders) = sample_orders_customers();
        let semi = semi_join(&orders, &customers, |o: &Order| Some(o.customer), |c: &Customer| Some(c.id));
        let anti = anti_join(&orders, &customers, |o: &Order| Some(o.customer), |c: &Customer| Some(c.id));
        assert_eq!(semi.count() + anti.count(), orders.count());
    }
}
