//! The weight domain Z-sets are valued over: the ring of integers.

/// The default integer weight type used throughout the crate. 64-bit since
/// a row's multiplicity across a join chain can outgrow 32 bits well
/// before it overflows practical memory.
pub type ZWeight = i64;

/// Alias kept for readability at call sites that talk about "a weight"
/// rather than specifically `ZWeight`.
pub type Weight = ZWeight;

/// Multiplies two weights, the operation every bilinear operator (join,
/// cartesian product) performs once per matching pair.
///
/// Plain `*` on `i64` only panics on overflow in debug builds and wraps
/// silently in release, which would corrupt a materialized view's row
/// counts without any signal. This panics deterministically in both
/// profiles instead; the panic is caught at the node boundary by
/// [`crate::circuit::Circuit::step`] and surfaces as
/// [`crate::error::StepError::OperatorFailed`].
pub fn checked_weight_mul(a: ZWeight, b: ZWeight) -> ZWeight {
    a.checked_mul(b).expect("weight overflow")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplies_in_range_weights() {
        assert_eq!(checked_weight_mul(3, 4), 12);
        assert_eq!(checked_weight_mul(-2, 5), -10);
    }

    #[test]
    #[should_panic(expected = "weight overflow")]
    fn panics_on_overflow_regardless_of_build_profile() {
        checked_weight_mul(ZWeight::MAX, 2);
    }
}
