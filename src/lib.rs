//! An incremental view-maintenance core: Z-sets and indexed Z-sets as the
//! value domain, streams and the `delay`/`integrate`/`differentiate` group
//! as the time dimension, a `petgraph`-backed circuit runtime to wire
//! operators into a dataflow graph, and a join family, freshness queue, and
//! window-function library built on top.
//!
//! # Layout
//!
//! - [`algebra`] — `ZSet`/`IndexedZSet`, the `Group`/`HasZero` capability
//!   traits, and checked weight arithmetic.
//! - [`stream`] — `Stream<T>`, pointwise lifting.
//! - [`operator`] — `delay`/`integrate`/`differentiate`, incremental
//!   `distinct`, grouped `SUM`, the join family, window functions.
//! - [`circuit`] — the builder and step runtime that assembles operators
//!   into a DAG and runs it one delta at a time.
//! - [`freshness`] — the bounded, cooperative-blocking output queue.
//! - [`config`] — construction-time knobs (`FreshnessQueueConfig`).
//! - [`error`] — `BuildError`/`StepError`, the circuit's error taxonomy.
//!
//! Logging throughout the crate goes through the `log` facade; a binary
//! embedding this crate picks the subscriber (`env_logger`, `tracing`'s
//! compat shim, or otherwise).

pub mod algebra;
pub mod circuit;
pub mod config;
pub mod error;
pub mod freshness;
pub mod operator;
pub mod stream;
