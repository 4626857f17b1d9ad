//! Exhaustive enumeration of linear extensions (all valid step orders).
//!
//! # Algorithm
//!
//! Backtracking over an indegree table and a frontier of zero-indegree nodes:
//!
//! 1. For each frontier node, in ascending step id order:
//!    a. remove it from the frontier and append it to the partial order
//!    b. decrement its successors' indegrees, adding any that reach zero
//!    c. recurse
//!    d. undo b and a exactly
//! 2. A partial order covering every node is recorded.
//!
//! The frontier is an ordered set, so the first order produced is always the
//! lexicographically smallest one.
//!
//! The number of orders is factorial in the number of unconstrained steps, so
//! enumeration is bounded by a node limit and a sequence limit; exceeding
//! either fails with [`Error::Capacity`].

use std::collections::BTreeSet;
use tracing::debug;

use super::DependencyGraph;
use crate::config::{AugmentConfig, DEFAULT_MAX_NODES, DEFAULT_MAX_SEQUENCES};
use crate::error::{Error, Result};
use crate::types::{Sequence, StepId};

/// Enumerates every linear extension of a [`DependencyGraph`].
#[derive(Debug, Clone)]
pub struct TopologicalEnumerator {
    max_nodes: usize,
    max_sequences: usize,
}

impl Default for TopologicalEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologicalEnumerator {
    pub fn new() -> Self {
        Self {
            max_nodes: DEFAULT_MAX_NODES,
            max_sequences: DEFAULT_MAX_SEQUENCES,
        }
    }

    /// Use the bounds from an [`AugmentConfig`].
    pub fn from_config(config: &AugmentConfig) -> Self {
        Self {
            max_nodes: config.max_nodes.max(1),
            max_sequences: config.max_sequences.max(1),
        }
    }

    pub fn with_max_nodes(mut self, max: usize) -> Self {
        self.max_nodes = max.max(1);
        self
    }

    pub fn with_max_sequences(mut self, max: usize) -> Self {
        self.max_sequences = max.max(1);
        self
    }

    /// All valid orders of `graph`, canonical (lowest id first) order first.
    ///
    /// Fails with [`Error::CycleDetected`] on a cyclic graph and with
    /// [`Error::Capacity`] when a bound is exceeded.
    pub fn enumerate(&self, graph: &DependencyGraph) -> Result<Vec<Sequence>> {
        if graph.node_count() > self.max_nodes {
            return Err(Error::capacity("nodes", self.max_nodes));
        }
        graph.validate_acyclic()?;

        let mut state = EnumerationState::new(graph);
        let mut sequences = Vec::new();
        state.visit(&mut sequences, self.max_sequences)?;

        debug!(
            "Enumerated {} sequences over {} nodes",
            sequences.len(),
            graph.node_count()
        );
        Ok(sequences)
    }
}

/// Mutable search state, threaded by `&mut` through the recursion.
///
/// Nodes are addressed by their index in the ascending id list, so index
/// order and id order coincide.
struct EnumerationState {
    ids: Vec<StepId>,
    successors: Vec<Vec<usize>>,
    indegree: Vec<usize>,
    frontier: BTreeSet<usize>,
    path: Vec<usize>,
}

impl EnumerationState {
    fn new(graph: &DependencyGraph) -> Self {
        let ids = graph.step_ids();
        let index_of = |id: &StepId| ids.binary_search(id).ok();

        let mut successors = vec![Vec::new(); ids.len()];
        let mut indegree = vec![0; ids.len()];
        for (i, node) in graph.nodes().enumerate() {
            successors[i] = node.successors().iter().filter_map(index_of).collect();
            indegree[i] = node.in_degree();
        }

        let frontier = (0..ids.len()).filter(|&i| indegree[i] == 0).collect();

        Self {
            path: Vec::with_capacity(ids.len()),
            ids,
            successors,
            indegree,
            frontier,
        }
    }

    fn visit(&mut self, out: &mut Vec<Sequence>, limit: usize) -> Result<()> {
        if self.path.len() == self.ids.len() {
            if out.len() >= limit {
                return Err(Error::capacity("sequences", limit));
            }
            out.push(Sequence::new(
                self.path.iter().map(|&i| self.ids[i]).collect(),
            ));
            return Ok(());
        }

        let candidates: Vec<usize> = self.frontier.iter().copied().collect();
        for v in candidates {
            self.choose(v);
            let result = self.visit(out, limit);
            self.undo(v);
            result?;
        }
        Ok(())
    }

    fn choose(&mut self, v: usize) {
        self.frontier.remove(&v);
        self.path.push(v);
        for &s in &self.successors[v] {
            self.indegree[s] -= 1;
            if self.indegree[s] == 0 {
                self.frontier.insert(s);
            }
        }
    }

    fn undo(&mut self, v: usize) {
        for &s in &self.successors[v] {
            if self.indegree[s] == 0 {
                self.frontier.remove(&s);
            }
            self.indegree[s] += 1;
        }
        self.path.pop();
        self.frontier.insert(v);
    }
}
