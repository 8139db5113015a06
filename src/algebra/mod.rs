//! The algebraic capability set every stream-edge value must satisfy, plus
//! the two concrete value domains the rest of the crate is built from:
//! Z-sets (`zset`) and indexed Z-sets (`indexed_zset`).
//!
//! Element identity is a plain capability bundle: `Hash + Eq + Clone`,
//! rather than any stringify-then-hash convention. `hashbrown`'s raw-entry
//! API means we never hash a key twice on the insert-or-update path.

pub mod indexed_zset;
pub mod weight;
pub mod zset;

pub use indexed_zset::IndexedZSet;
pub use weight::{checked_weight_mul, Weight, ZWeight};
pub use zset::ZSet;

/// Capability bundle required of any group-valued type living on a stream
/// edge: a distinguished zero, addition, and negation. `Stream<T>` and
/// `ZSet<T>` are the two groups the rest of the crate depends on.
pub trait HasZero {
    fn zero() -> Self;
    fn is_zero(&self) -> bool;
}

/// A group: `zero`, `add`, `negate`, satisfying the usual axioms
/// (associativity, identity, inverse, and commutativity for the groups
/// used here).
pub trait Group: HasZero + Clone {
    fn add(&self, other: &Self) -> Self;
    fn negate(&self) -> Self;

    fn subtract(&self, other: &Self) -> Self {
        self.add(&other.negate())
    }
}

impl HasZero for i64 {
    fn zero() -> Self {
        0
    }
    fn is_zero(&self) -> bool {
        *self == 0
    }
}

impl Group for i64 {
    fn add(&self, other: &Self) -> Self {
        self + other
    }
    fn negate(&self) -> Self {
        -self
    }
}
