//! Incremental stream operators: the stateful implementations that realize
//! each primitive's `Q^Δ` form.

pub mod aggregate;
pub mod delay;
pub mod distinct;
pub mod join;
pub mod window;

pub use aggregate::GroupSum;
pub use delay::{delay, differentiate, integrate, DelayState, DifferentiateState, IntegrateState, StatefulStep};
pub use distinct::IncrementalDistinct;
