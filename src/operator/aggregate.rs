//! Grouped aggregation: maintains a per-key running `SUM` and emits the
//! output as a retract-old/insert-new delta, the shape a materialized
//! `GROUP BY` view needs.
//!
//! `SUM` is linear in the input weight, so the running total itself
//! never needs to rescan a group's members; what isn't incremental for
//! free is the *delta view* of that total, since a key's previous
//! snapshot has to be retracted before its new one is inserted. This
//! operator keeps both: the running totals, and the last Z-set emitted
//! from them, diffed on every step.

use std::collections::HashMap;
use std::hash::Hash;

use deepsize::DeepSizeOf;

use crate::algebra::ZSet;

/// `SUM(amount) GROUP BY key`: each `step` folds `(key, amount)` deltas
/// into the running per-key totals and returns the retract-old/insert-new
/// delta against the snapshot last emitted.
///
/// `totals` uses the standard-library `HashMap` rather than the
/// `ZSet`'s `hashbrown` map so that `DeepSizeOf` derives without a
/// manual impl; `emitted` is skipped from the size estimate since the
/// running totals already bound this operator's footprint.
#[derive(Debug, Clone, Default, DeepSizeOf)]
pub struct GroupSum<K: Hash + Eq + Clone> {
    totals: HashMap<K, i64>,
    #[deepsize(skip)]
    emitted: ZSet<(K, i64)>,
}

impl<K: Hash + Eq + Clone> GroupSum<K> {
    pub fn new() -> Self {
        Self {
            totals: HashMap::new(),
            emitted: ZSet::new(),
        }
    }

    /// Applies a delta of `(key, amount)` pairs and returns the output
    /// delta: a retraction of every changed key's previous total and an
    /// insertion of its new one. A key whose total returns to zero is
    /// dropped from `totals` entirely, so it stops appearing in `next`
    /// instead of lingering as a phantom `(key, 0)` row.
    pub fn step(&mut self, delta: &ZSet<(K, i64)>) -> ZSet<(K, i64)> {
        for ((k, amount), w) in delta.iter() {
            let total = *self.totals.entry(k.clone()).or_insert(0) + amount * w;
            if total == 0 {
                self.totals.remove(k);
            } else {
                self.totals.insert(k.clone(), total);
            }
        }

        let mut next = ZSet::new();
        for (k, total) in self.totals.iter() {
            next.insert((k.clone(), *total), 1);
        }

        let out = next.subtract(&self.emitted);
        self.emitted = next;
        out
    }

    pub fn reset(&mut self) {
        self.totals.clear();
        self.emitted = ZSet::new();
    }

    pub fn current(&self) -> &HashMap<K, i64> {
        &self.totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zset;

    #[test]
    fn group_by_sum_scenario() {
        let mut view = GroupSum::new();

        let step1 = view.step(&zset! {
            ("NA".to_string(), 100) => 1,
            ("NA".to_string(), 200) => 1,
            ("EU".to_string(), 150) => 1,
        });
        assert_eq!(step1.weight(&("NA".to_string(), 300)), 1);
        assert_eq!(step1.weight(&("EU".to_string(), 150)), 1);

        let step2 = view.step(&zset! { ("NA".to_string(), 50) => 1 });
        assert_eq!(step2.weight(&("NA".to_string(), 300)), -1);
        assert_eq!(step2.weight(&("NA".to_string(), 350)), 1);
        assert_eq!(step2.weight(&("EU".to_string(), 150)), 0);

        let step3 = view.step(&zset! { ("EU".to_string(), 150) => -1 });
        assert_eq!(step3.weight(&("EU".to_string(), 150)), -1);
        assert_eq!(step3.weight(&("NA".to_string(), 350)), 0);
    }

    #[test]
    fn emptied_group_stops_appearing_in_the_emitted_view() {
        let mut view = GroupSum::new();
        view.step(&zset! { ("EU".to_string(), 150) => 1 });
        let step2 = view.step(&zset! { ("EU".to_string(), 150) => -1 });

        assert_eq!(step2.weight(&("EU".to_string(), 150)), -1);
        assert_eq!(step2.weight(&("EU".to_string(), 0)), 0);
        assert!(!view.current().contains_key("EU"));
    }

    #[test]
    fn reset_clears_running_totals() {
        let mut view = GroupSum::new();
        view.step(&zset! { ("NA".to_string(), 100) => 1 });
        view.reset();
        let out = view.step(&zset! { ("NA".to_string(), 5) => 1 });
        assert_eq!(out.weight(&("NA".to_string(), 5)), 1);
    }
}
