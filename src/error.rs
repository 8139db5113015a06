//! Error taxonomy for circuit construction and stepping.
//!
//! Construction and type errors fail the respective builder/step call
//! immediately; operator-internal errors are caught at the node boundary
//! and abort the step, leaving circuit state as documented in the crate
//! root (recovery is `Circuit::reset`).

use thiserror::Error;

/// Errors raised while assembling a [`crate::circuit::Circuit`].
#[derive(Debug, Error)]
pub enum BuildError {
    /// The dataflow graph contains a cycle that does not pass through a
    /// delay node (delay nodes are the only operators allowed to close a
    /// loop, since their output at step `t` only depends on input at `t-1`).
    #[error("cyclic topology detected outside of delay/z1 nodes")]
    CyclicTopology,

    /// Two input handles were registered under the same name.
    #[error("duplicate input name {0:?}")]
    DuplicateInputName(String),

    /// A node referenced an input/handle that does not belong to this
    /// circuit (e.g. a handle from a different builder).
    #[error("dangling node reference")]
    DanglingNode,
}

/// Errors raised by [`crate::circuit::Circuit::step`].
#[derive(Debug, Error)]
pub enum StepError {
    /// An input delta's dynamic type did not match the declared element
    /// type of the input handle. Raised before any node executes.
    #[error("delta for input {input:?} does not match its declared element type")]
    TypeMismatch { input: String },

    /// A user-supplied predicate/map/key/aggregate function panicked while
    /// evaluating `node`. The step is aborted; earlier node mutations in
    /// this step are left as-is until [`crate::circuit::Circuit::reset`] is
    /// called.
    #[error("step {step} aborted: node {node:?} failed: {cause}")]
    OperatorFailed {
        step: u64,
        node: String,
        cause: String,
    },
}

impl StepError {
    pub(crate) fn from_panic(step: u64, node: impl Into<String>, payload: Box<dyn std::any::Any + Send>) -> Self {
        let cause = panic_message(&payload);
        StepError::OperatorFailed {
            step,
            node: node.into(),
            cause,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
