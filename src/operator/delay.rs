//! Delay (`z⁻¹`), integrate (`I`), and differentiate (`D`): the three
//! linear, causal stream operators the rest of the incrementalization
//! transform is built from.
//!
//! Each has a batch form operating on a whole [`Stream`] and a stateful
//! step variant that consumes one input value and produces one output
//! value per call, which is what [`crate::circuit::Circuit::step`] drives
//! one node at a time.

use deepsize::DeepSizeOf;

use crate::algebra::Group;
use crate::stream::Stream;

/// `delay(s)[t] = zero` if `t = 0`, else `s[t-1]`.
pub fn delay<T: Group>(s: &Stream<T>) -> Stream<T> {
    let mut out = Vec::with_capacity(s.length());
    let mut prev = T::zero();
    for t in 0..s.length() {
        out.push(prev);
        prev = s.at(t);
    }
    Stream::from_values(out)
}

/// `I(s)[t] = Σ_{i≤t} s[i]`.
pub fn integrate<T: Group>(s: &Stream<T>) -> Stream<T> {
    let mut out = Vec::with_capacity(s.length());
    let mut acc = T::zero();
    for t in 0..s.length() {
        acc = acc.add(&s.at(t));
        out.push(acc.clone());
    }
    Stream::from_values(out)
}

/// `D(s)[t] = s[t] - s[t-1]`, with `s[-1] = zero`.
pub fn differentiate<T: Group>(s: &Stream<T>) -> Stream<T> {
    let mut out = Vec::with_capacity(s.length());
    let mut prev = T::zero();
    for t in 0..s.length() {
        let cur = s.at(t);
        out.push(cur.subtract(&prev));
        prev = cur;
    }
    Stream::from_values(out)
}

/// A stateful operator that consumes one value at a time and maintains
/// whatever private state it needs, with a `reset` that restores the
/// initial state.
pub trait StatefulStep<T> {
    fn step(&mut self, input: &T) -> T;
    fn reset(&mut self);
}

/// Stateful `z⁻¹`: remembers the previous input.
#[derive(Clone, Debug, DeepSizeOf)]
pub struct DelayState<T> {
    previous: T,
}

impl<T: Group> Default for DelayState<T> {
    fn default() -> Self {
        Self { previous: T::zero() }
    }
}

impl<T: Group> DelayState<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Group> StatefulStep<T> for DelayState<T> {
    fn step(&mut self, input: &T) -> T {
        std::mem::replace(&mut self.previous, input.clone())
    }
    fn reset(&mut self) {
        self.previous = T::zero();
    }
}

/// Stateful `I`: maintains a running sum.
#[derive(Clone, Debug, DeepSizeOf)]
pub struct IntegrateState<T> {
    running_sum: T,
}

impl<T: Group> Default for IntegrateState<T> {
    fn default() -> Self {
        Self { running_sum: T::zero() }
    }
}

impl<T: Group> IntegrateState<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Group> StatefulStep<T> for IntegrateState<T> {
    fn step(&mut self, input: &T) -> T {
        self.running_sum = self.running_sum.add(input);
        self.running_sum.clone()
    }
    fn reset(&mut self) {
        self.running_sum = T::zero();
    }
}

/// Stateful `D`: remembers the previous input and emits the difference.
#[derive(Clone, Debug, DeepSizeOf)]
pub struct DifferentiateState<T> {
    previous: T,
}

impl<T: Group> Default for DifferentiateState<T> {
    fn default() -> Self {
        Self { previous: T::zero() }
    }
}

impl<T: Group> DifferentiateState<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Group> StatefulStep<T> for DifferentiateState<T> {
    fn step(&mut self, input: &T) -> T {
        let diff = input.subtract(&self.previous);
        self.previous = input.clone();
        diff
    }
    fn reset(&mut self) {
        self.previous = T::zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_of(values: &[i64]) -> Stream<i64> {
        Stream::from_values(values.to_vec())
    }

    #[test]
    fn integrate_and_differentiate_are_inverses() {
        let s = stream_of(&[1, 2, 3, 4, 5]);
        let integrated = integrate(&s);
        assert_eq!(integrated.values(), &[1, 3, 6, 10, 15]);
        assert_eq!(differentiate(&integrated).values(), s.values());

        let differentiated = differentiate(&s);
        assert_eq!(differentiated.values(), &[1, 1, 1, 1, 1]);
        assert_eq!(integrate(&differentiated).values(), s.values());
    }

    #[test]
    fn delay_shifts_by_one_with_leading_zero() {
        let s = stream_of(&[1, 2, 3]);
        assert_eq!(delay(&s).values(), &[0, 1, 2]);
    }

    #[test]
    fn stateful_variants_match_batch_variants() {
        let s = stream_of(&[1, 2, 3, 4, 5]);

        let mut delay_state = DelayState::new();
        let stepped: Vec<i64> = s.values().iter().map(|v| delay_state.step(v)).collect();
        assert_eq!(stepped, delay(&s).values());

        let mut integrate_state = IntegrateState::new();
        let stepped: Vec<i64> = s.values().iter().map(|v| integrate_state.step(v)).collect();
        assert_eq!(stepped, integrate(&s).values());

        let mut diff_state = DifferentiateState::new();
        let stepped: Vec<i64> = s.values().iter().map(|v| diff_state.step(v)).collect();
        assert_eq!(stepped, differentiate(&s).values());
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut integrate_state = IntegrateState::new();
        integrate_state.step(&10);
        integrate_state.step(&10);
        integrate_state.reset();
        assert_eq!(integrate_state.step(&5), 5);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn round_trip_any_stream(values in prop::collection::vec(-1000i64..1000, 0..50)) {
                let s = Stream::from_values(values);
                prop_assert_eq!(differentiate(&integrate(&s)).values(), s.values());
                prop_assert_eq!(integrate(&differentiate(&s)).values(), s.values());
            }
        }
    }
}
