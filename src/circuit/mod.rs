//! The circuit runtime: a builder that assembles an immutable dataflow
//! DAG, and a step function that runs it.
//!
//! Rather than a method-chaining `Stream` API backed by nested scopes and
//! trace batches, this is the systems-language reading of the same idea:
//! a `petgraph` DAG holding tagged node records, a single
//! `HashMap<NodeId, Box<dyn Any>>` value-cache arena rebuilt every step in
//! topological order, and statically-typed builder methods that are the
//! only places the type erasure is visible to a caller.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use deepsize::DeepSizeOf;
use log::{debug, trace, warn};
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;

use crate::algebra::HasZero;
use crate::error::{BuildError, StepError};

/// Identifies a node within a circuit's graph. Returned by every builder
/// method and passed back in to wire up downstream nodes.
pub type NodeId = petgraph::graph::NodeIndex;

type StatelessFn = Box<dyn Fn(&[&dyn Any]) -> Box<dyn Any>>;
type StatefulFn = Box<dyn FnMut(&[&dyn Any]) -> Box<dyn Any>>;
type ResetFn = Box<dyn FnMut()>;
type SizeFn = Box<dyn Fn() -> usize>;
type OutputFn = Box<dyn FnMut(&dyn Any)>;
type ZeroFn = Box<dyn Fn() -> Box<dyn Any>>;

enum Role {
    Input { zero: ZeroFn },
    Stateless { compute: StatelessFn },
    Stateful {
        compute: StatefulFn,
        reset: ResetFn,
        size: SizeFn,
    },
    Output { callback: OutputFn },
}

struct NodeMeta {
    name: String,
    parents: Vec<NodeId>,
    role: Role,
}

/// Builds an immutable circuit topology. Once [`build`](CircuitBuilder::build)
/// succeeds, the topology never changes again; only the per-node state
/// captured by `stateful_op` closures mutates across steps.
#[derive(Default)]
pub struct CircuitBuilder {
    graph: DiGraph<NodeMeta, ()>,
    input_names: std::collections::HashSet<String>,
}

impl CircuitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an input handle. Missing deltas at step time default to
    /// `T::zero()`.
    pub fn input<T>(&mut self, name: impl Into<String>) -> Result<NodeId, BuildError>
    where
        T: HasZero + 'static,
    {
        let name = name.into();
        if !self.input_names.insert(name.clone()) {
            return Err(BuildError::DuplicateInputName(name));
        }
        let idx = self.graph.add_node(NodeMeta {
            name,
            parents: Vec::new(),
            role: Role::Input {
                zero: Box::new(|| Box::new(T::zero()) as Box<dyn Any>),
            },
        });
        Ok(idx)
    }

    /// A stateless node with one input.
    pub fn op1<I, O>(&mut self, input: NodeId, name: impl Into<String>, f: impl Fn(&I) -> O + 'static) -> NodeId
    where
        I: 'static,
        O: 'static,
    {
        let compute = move |args: &[&dyn Any]| -> Box<dyn Any> {
            let i = args[0].downcast_ref::<I>().expect("op1: input type mismatch");
            Box::new(f(i)) as Box<dyn Any>
        };
        self.push_node(name.into(), vec![input], Role::Stateless { compute: Box::new(compute) })
    }

    /// A stateless node with two inputs.
    pub fn op2<A, B, O>(
        &mut self,
        a: NodeId,
        b: NodeId,
        name: impl Into<String>,
        f: impl Fn(&A, &B) -> O + 'static,
    ) -> NodeId
    where
        A: 'static,
        B: 'static,
        O: 'static,
    {
        let compute = move |args: &[&dyn Any]| -> Box<dyn Any> {
            let x = args[0].downcast_ref::<A>().expect("op2: left type mismatch");
            let y = args[1].downcast_ref::<B>().expect("op2: right type mismatch");
            Box::new(f(x, y)) as Box<dyn Any>
        };
        self.push_node(name.into(), vec![a, b], Role::Stateless { compute: Box::new(compute) })
    }

    /// A stateful node with one input. `step_fn` mutates `initial`-seeded
    /// state and produces this step's output; `reset_fn` restores the
    /// state a later [`Circuit::reset`] should see.
    pub fn stateful_op1<I, O, S>(
        &mut self,
        input: NodeId,
        name: impl Into<String>,
        initial: S,
        mut step_fn: impl FnMut(&mut S, &I) -> O + 'static,
        reset_fn: impl Fn(&mut S) + 'static,
    ) -> NodeId
    where
        I: 'static,
        O: 'static,
        S: DeepSizeOf + 'static,
    {
        let state = Rc::new(RefCell::new(initial));

        let state_compute = state.clone();
        let compute = move |args: &[&dyn Any]| -> Box<dyn Any> {
            let i = args[0].downcast_ref::<I>().expect("stateful_op1: input type mismatch");
            let mut s = state_compute.borrow_mut();
            Box::new(step_fn(&mut s, i)) as Box<dyn Any>
        };

        let state_reset = state.clone();
        let reset = move || reset_fn(&mut state_reset.borrow_mut());

        let state_size = state;
        let size = move || state_size.borrow().deep_size_of();

        self.push_node(
            name.into(),
            vec![input],
            Role::Stateful {
                compute: Box::new(compute),
                reset: Box::new(reset),
                size: Box::new(size),
            },
        )
    }

    /// A stateful node with two inputs.
    pub fn stateful_op2<A, B, O, S>(
        &mut self,
        a: NodeId,
        b: NodeId,
        name: impl Into<String>,
        initial: S,
        mut step_fn: impl FnMut(&mut S, &A, &B) -> O + 'static,
        reset_fn: impl Fn(&mut S) + 'static,
    ) -> NodeId
    where
        A: 'static,
        B: 'static,
        O: 'static,
        S: DeepSizeOf + 'static,
    {
        let state = Rc::new(RefCell::new(initial));

        let state_compute = state.clone();
        let compute = move |args: &[&dyn Any]| -> Box<dyn Any> {
            let x = args[0].downcast_ref::<A>().expect("stateful_op2: left type mismatch");
            let y = args[1].downcast_ref::<B>().expect("stateful_op2: right type mismatch");
            let mut s = state_compute.borrow_mut();
            Box::new(step_fn(&mut s, x, y)) as Box<dyn Any>
        };

        let state_reset = state.clone();
        let reset = move || reset_fn(&mut state_reset.borrow_mut());

        let state_size = state;
        let size = move || state_size.borrow().deep_size_of();

        self.push_node(
            name.into(),
            vec![a, b],
            Role::Stateful {
                compute: Box::new(compute),
                reset: Box::new(reset),
                size: Box::new(size),
            },
        )
    }

    /// Registers a sink invoked with `node`'s current value after every
    /// step.
    pub fn output<T: 'static>(&mut self, node: NodeId, name: impl Into<String>, mut callback: impl FnMut(&T) + 'static) -> NodeId {
        let cb = move |v: &dyn Any| {
            let t = v.downcast_ref::<T>().expect("output: type mismatch");
            callback(t);
        };
        self.push_node(name.into(), vec![node], Role::Output { callback: Box::new(cb) })
    }

    fn push_node(&mut self, name: String, parents: Vec<NodeId>, role: Role) -> NodeId {
        let kind = match role {
            Role::Input { .. } => "input",
            Role::Stateless { .. } => "op",
            Role::Stateful { .. } => "stateful_op",
            Role::Output { .. } => "output",
        };
        trace!("registering node {name:?} [{kind}] with {} parent(s)", parents.len());
        let idx = self.graph.add_node(NodeMeta {
            name,
            parents: parents.clone(),
            role,
        });
        for parent in parents {
            self.graph.add_edge(parent, idx, ());
        }
        idx
    }

    /// Freezes the topology: computes the step order once. Returns
    /// [`BuildError::CyclicTopology`] if the graph isn't a DAG.
    pub fn build(self) -> Result<Circuit, BuildError> {
        let order = toposort(&self.graph, None).map_err(|_| BuildError::CyclicTopology)?;
        let inputs_by_name: HashMap<String, NodeId> = self
            .graph
            .node_indices()
            .filter(|&idx| matches!(self.graph[idx].role, Role::Input { .. }))
            .map(|idx| (self.graph[idx].name.clone(), idx))
            .collect();
        debug!(
            "circuit built: {} node(s), {} input(s)",
            order.len(),
            inputs_by_name.len()
        );
        Ok(Circuit {
            graph: self.graph,
            order,
            inputs_by_name,
            step_count: 0,
        })
    }
}

/// A built, immutable-topology circuit.
pub struct Circuit {
    graph: DiGraph<NodeMeta, ()>,
    order: Vec<NodeId>,
    inputs_by_name: HashMap<String, NodeId>,
    step_count: u64,
}

impl Circuit {
    /// Runs one step. Missing entries in `inputs` default to that
    /// input's group zero. Nodes execute in topological order; if any
    /// operator panics the step is aborted and [`StepError::OperatorFailed`]
    /// is returned, with earlier node mutations in this step left as-is
    /// until [`Circuit::reset`].
    pub fn step(&mut self, mut inputs: HashMap<String, Box<dyn Any>>) -> Result<(), StepError> {
        let mut arena: HashMap<NodeId, Box<dyn Any>> = HashMap::with_capacity(self.order.len());

        for &idx in &self.order {
            let parents = self.graph[idx].parents.clone();
            let parent_values: Vec<&Box<dyn Any>> = parents
                .iter()
                .map(|p| arena.get(p).expect("parent computed before child in topo order"))
                .collect();
            let name = self.graph[idx].name.clone();

            let node = &mut self.graph[idx];
            match &mut node.role {
                Role::Input { zero } => {
                    let value = inputs.remove(&name).unwrap_or_else(|| zero());
                    arena.insert(idx, value);
                }
                Role::Stateless { compute } => {
                    let args: Vec<&dyn Any> = parent_values.iter().map(|b| b.as_ref()).collect();
                    let result = panic::catch_unwind(AssertUnwindSafe(|| compute(&args)));
                    match result {
                        Ok(v) => {
                            arena.insert(idx, v);
                        }
                        Err(e) => {
                            let err = StepError::from_panic(self.step_count, name, e);
                            warn!("step {} aborted: {err}", self.step_count);
                            return Err(err);
                        }
                    }
                }
                Role::Stateful { compute, .. } => {
                    let args: Vec<&dyn Any> = parent_values.iter().map(|b| b.as_ref()).collect();
                    let result = panic::catch_unwind(AssertUnwindSafe(|| compute(&args)));
                    match result {
                        Ok(v) => {
                            arena.insert(idx, v);
                        }
                        Err(e) => {
                            let err = StepError::from_panic(self.step_count, name, e);
                            warn!("step {} aborted: {err}", self.step_count);
                            return Err(err);
                        }
                    }
                }
                Role::Output { callback } => {
                    let arg = parent_values[0].as_ref();
                    let result = panic::catch_unwind(AssertUnwindSafe(|| callback(arg)));
                    if let Err(e) = result {
                        let err = StepError::from_panic(self.step_count, name, e);
                        warn!("step {} aborted: {err}", self.step_count);
                        return Err(err);
                    }
                }
            }
        }

        trace!("step {} completed, {} node(s) evaluated", self.step_count, self.order.len());
        self.step_count += 1;
        Ok(())
    }

    /// Visits every stateful node's reset hook, clears nothing else
    /// (the value cache is already transient, rebuilt fresh on the next
    /// `step`), and resets the step counter.
    pub fn reset(&mut self) {
        for idx in self.graph.node_indices().collect::<Vec<_>>() {
            if let Role::Stateful { reset, .. } = &mut self.graph[idx].role {
                reset();
            }
        }
        self.step_count = 0;
    }

    /// Monotonically increasing across the circuit's lifetime, reset to
    /// zero by [`Circuit::reset`].
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Sum of every stateful node's estimated heap footprint, via
    /// `deepsize`.
    pub fn state_size(&self) -> usize {
        self.graph
            .node_weights()
            .filter_map(|node| match &node.role {
                Role::Stateful { size, .. } => Some(size()),
                _ => None,
            })
            .sum()
    }

    /// Renders the node list and their dependency edges as indented
    /// text, in topological order, for debugging a built topology.
    pub fn explain(&self) -> String {
        let mut lines = Vec::with_capacity(self.order.len());
        for &idx in &self.order {
            let node = &self.graph[idx];
            let kind = match node.role {
                Role::Input { .. } => "input",
                Role::Stateless { .. } => "op",
                Role::Stateful { .. } => "stateful_op",
                Role::Output { .. } => "output",
            };
            let parent_names: Vec<String> = node.parents.iter().map(|p| self.graph[*p].name.clone()).collect();
            lines.push(if parent_names.is_empty() {
                format!("{} [{}]", node.name, kind)
            } else {
                format!("{} [{}] <- {}", node.name, kind, parent_names.join(", "))
            });
        }
        textwrap::indent(&lines.join("\n"), "  ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::ZSet;
    use crate::operator::aggregate::GroupSum;
    use crate::operator::delay::IntegrateState;
    use crate::operator::delay::StatefulStep;
    fn input_map(pairs: Vec<(&str, Box<dyn Any>)>) -> HashMap<String, Box<dyn Any>> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn filter_linearity_scenario() {
        let mut builder = CircuitBuilder::new();
        let nums = builder.input::<ZSet<i64>>("nums").unwrap();
        let filtered = builder.op1(nums, "filter", |z: &ZSet<i64>| z.filter(|&x| x > 5));
        let integrated = builder.stateful_op1(
            filtered,
            "integrate",
            IntegrateState::<ZSet<i64>>::new(),
            |state, delta: &ZSet<i64>| state.step(delta),
            |state| state.reset(),
        );

        let captured: Rc<RefCell<Vec<i64>>> = Rc::new(RefCell::new(Vec::new()));
        let captured_sink = captured.clone();
        builder.output(integrated, "sink", move |z: &ZSet<i64>| {
            let mut values: Vec<i64> = z.iter().filter(|(_, w)| *w > 0).map(|(v, _)| *v).collect();
            values.sort_unstable();
            *captured_sink.borrow_mut() = values;
        });

        let mut circuit = builder.build().unwrap();

        let mut d1 = ZSet::new();
        d1.insert(3, 1);
        d1.insert(7, 1);
        d1.insert(10, 1);
        circuit.step(input_map(vec![("nums", Box::new(d1))])).unwrap();
        assert_eq!(*captured.borrow(), vec![7, 10]);

        let mut d2 = ZSet::new();
        d2.insert(8, 1);
        d2.insert(2, 1);
        circuit.step(input_map(vec![("nums", Box::new(d2))])).unwrap();
        assert_eq!(*captured.borrow(), vec![7, 8, 10]);

        let mut d3 = ZSet::new();
        d3.insert(7, -1);
        d3.insert(15, 1);
        circuit.step(input_map(vec![("nums", Box::new(d3))])).unwrap();
        assert_eq!(*captured.borrow(), vec![8, 10, 15]);
    }

    #[test]
    fn group_by_sum_scenario_via_circuit() {
        // Same scenario as operator::aggregate's test, driven through the
        // circuit builder rather than calling `GroupSum` directly.
        let mut builder = CircuitBuilder::new();
        let sales = builder.input::<ZSet<(String, i64)>>("sales").unwrap();
        let grouped = builder.stateful_op1(
            sales,
            "group_sum",
            GroupSum::<String>::new(),
            |state, delta: &ZSet<(String, i64)>| state.step(delta),
            |state| state.reset(),
        );

        let captured: Rc<RefCell<ZSet<(String, i64)>>> = Rc::new(RefCell::new(ZSet::new()));
        let captured_sink = captured.clone();
        builder.output(grouped, "sink", move |delta: &ZSet<(String, i64)>| {
            let mut acc = captured_sink.borrow_mut();
            *acc = acc.add(delta);
        });

        let mut circuit = builder.build().unwrap();

        let mut d1 = ZSet::new();
        d1.insert(("NA".to_string(), 100), 1);
        d1.insert(("NA".to_string(), 200), 1);
        d1.insert(("EU".to_string(), 150), 1);
        circuit.step(input_map(vec![("sales", Box::new(d1))])).unwrap();
        assert_eq!(captured.borrow().weight(&("NA".to_string(), 300)), 1);
        assert_eq!(captured.borrow().weight(&("EU".to_string(), 150)), 1);

        let mut d2 = ZSet::new();
        d2.insert(("NA".to_string(), 50), 1);
        circuit.step(input_map(vec![("sales", Box::new(d2))])).unwrap();
        assert_eq!(captured.borrow().weight(&("NA".to_string(), 300)), 0);
        assert_eq!(captured.borrow().weight(&("NA".to_string(), 350)), 1);
        assert_eq!(captured.borrow().weight(&("EU".to_string(), 150)), 1);
    }

    #[test]
    fn missing_input_defaults_to_zero() {
        let mut builder = CircuitBuilder::new();
        let nums = builder.input::<ZSet<i64>>("nums").unwrap();
        let counted = builder.op1(nums, "count", |z: &ZSet<i64>| z.count());
        let captured: Rc<RefCell<i64>> = Rc::new(RefCell::new(-1));
        let captured_sink = captured.clone();
        builder.output(counted, "sink", move |c: &i64| *captured_sink.borrow_mut() = *c);

        let mut circuit = builder.build().unwrap();
        circuit.step(HashMap::new()).unwrap();
        assert_eq!(*captured.borrow(), 0);
    }

    #[test]
    fn operator_panic_aborts_step_with_operator_failed() {
        let mut builder = CircuitBuilder::new();
        let nums = builder.input::<ZSet<i64>>("nums").unwrap();
        let _boom = builder.op1(nums, "boom", |_: &ZSet<i64>| -> i64 { panic!("kaboom") });

        let mut circuit = builder.build().unwrap();
        let err = circuit.step(HashMap::new()).unwrap_err();
        match err {
            StepError::OperatorFailed { node, .. } => assert_eq!(node, "boom"),
            other => panic!("expected OperatorFailed, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_input_name_rejected() {
        let mut builder = CircuitBuilder::new();
        builder.input::<ZSet<i64>>("nums").unwrap();
        let err = builder.input::<ZSet<i64>>("nums").unwrap_err();
        assert!(matches!(err, BuildError::DuplicateInputName(name) if name == "nums"));
    }

    #[test]
    fn reset_restores_stateful_nodes_and_step_counter() {
        let mut builder = CircuitBuilder::new();
        let nums = builder.input::<ZSet<i64>>("nums").unwrap();
        let integrated = builder.stateful_op1(
            nums,
            "integrate",
            IntegrateState::<ZSet<i64>>::new(),
            |state, delta: &ZSet<i64>| state.step(delta),
            |state| state.reset(),
        );
        let captured: Rc<RefCell<i64>> = Rc::new(RefCell::new(0));
        let captured_sink = captured.clone();
        builder.output(integrated, "sink", move |z: &ZSet<i64>| {
            *captured_sink.borrow_mut() = z.count();
        });

        let mut circuit = builder.build().unwrap();
        let mut d = ZSet::new();
        d.insert(1, 1);
        circuit.step(input_map(vec![("nums", Box::new(d))])).unwrap();
        assert_eq!(circuit.step_count(), 1);

        circuit.reset();
        assert_eq!(circuit.step_count(), 0);
        circuit.step(HashMap::new()).unwrap();
        assert_eq!(*captured.borrow(), 0);
    }
}
