//! Incremental `distinct`: the one non-linear operator in the core.
//! Maintains the integrated input as a `ZSet` and emits only the
//! threshold crossings, rather than recomputing `distinct` over the whole
//! integrated state on every delta.

use std::hash::Hash;

use deepsize::DeepSizeOf;

use crate::algebra::ZSet;

/// Stateful incremental `distinct`. `integrated` is `I(a)` for the input
/// stream `a` seen so far; `step` applies one delta and returns the
/// corresponding output delta.
///
/// `integrated` is skipped from the `DeepSizeOf` estimate since `ZSet`
/// doesn't itself implement it (see `operator::aggregate::GroupSum` for
/// why); a circuit that needs a tighter estimate for a distinct-heavy
/// workload should track `integrated().len()` directly instead.
#[derive(Clone, Debug, Default, DeepSizeOf)]
pub struct IncrementalDistinct<T: Hash + Eq + Clone> {
    #[deepsize(skip)]
    integrated: ZSet<T>,
}

impl<T: Hash + Eq + Clone> IncrementalDistinct<T> {
    pub fn new() -> Self {
        Self {
            integrated: ZSet::new(),
        }
    }

    /// Applies delta `Δ` and returns the output delta: for every element
    /// with `Δ(v) ≠ 0`, emit `+1` on a 0-or-below → above crossing, `-1`
    /// on an above → 0-or-below crossing, nothing otherwise.
    pub fn step(&mut self, delta: &ZSet<T>) -> ZSet<T> {
        let mut output = ZSet::new();
        for (v, dw) in delta.iter() {
            if dw == 0 {
                continue;
            }
            let old = self.integrated.weight(v);
            let new = old + dw;
            if old <= 0 && new > 0 {
                output.insert(v.clone(), 1);
            } else if old > 0 && new <= 0 {
                output.insert(v.clone(), -1);
            }
        }
        self.integrated = self.integrated.add(delta);
        output
    }

    pub fn reset(&mut self) {
        self.integrated = ZSet::new();
    }

    /// Current integrated input, exposed for testing the
    /// incremental-equals-batch law against `ZSet::distinct`.
    pub fn integrated(&self) -> &ZSet<T> {
        &self.integrated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zset;

    #[test]
    fn threshold_law_scenario() {
        // weight stream +2, +1, -2, -1 -> output +1, 0, 0, -1
        let mut op = IncrementalDistinct::new();

        let d1 = op.step(&zset! { "a" => 2 });
        assert_eq!(d1.weight(&"a"), 1);

        let d2 = op.step(&zset! { "a" => 1 });
        assert_eq!(d2.weight(&"a"), 0);

        let d3 = op.step(&zset! { "a" => -2 });
        assert_eq!(d3.weight(&"a"), 0);

        let d4 = op.step(&zset! { "a" => -1 });
        assert_eq!(d4.weight(&"a"), -1);
    }

    #[test]
    fn reset_clears_integrated_state() {
        let mut op = IncrementalDistinct::new();
        op.step(&zset! { "a" => 1 });
        op.reset();
        assert!(op.integrated().is_zero_set());
        let d = op.step(&zset! { "a" => 1 });
        assert_eq!(d.weight(&"a"), 1);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn delta() -> impl Strategy<Value = Vec<(i32, i64)>> {
            prop::collection::vec((0i32..5, -3i64..3), 0..10)
        }

        proptest! {
            /// Incremental distinct, applied delta-by-delta and integrated
            /// back, equals batch `distinct` of the integrated input.
            #[test]
            fn incremental_equals_batch(deltas in prop::collection::vec(delta(), 0..8)) {
                let mut op = IncrementalDistinct::new();
                let mut output_integral: ZSet<i32> = ZSet::new();
                let mut input_integral: ZSet<i32> = ZSet::new();

                for pairs in deltas {
                    let mut d = ZSet::new();
                    for (v, w) in pairs {
                        d.insert(v, w);
                    }
                    let out = op.step(&d);
                    output_integral = output_integral.add(&out);
                    input_integral = input_integral.add(&d);
                }

                prop_assert_eq!(output_integral, input_integral.distinct());
            }
        }
    }
}
