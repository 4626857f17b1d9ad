//! Step dependency graphs and their valid orders.
//!
//! - [`DependencyGraph`]: nodes are step ids, edges point from a dependency to
//!   the step that cites it
//! - [`TopologicalEnumerator`]: every linear extension, lowest id first

mod dependency;
mod enumerate;
#[cfg(test)]
mod proptest;

pub use dependency::{DependencyGraph, StepNode};
pub use enumerate::TopologicalEnumerator;
