//! Dependency graph over step identifiers.
//!
//! The graph keeps both edge directions per node:
//! - `successors`: steps that cite this step (outgoing edges)
//! - `predecessors`: steps this step cites (incoming edges)
//!
//! Nodes live in a `BTreeMap`, so every iteration is in ascending step id
//! order regardless of declaration order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::extract::StepDependencies;
use crate::types::StepId;

/// A node of the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepNode {
    id: StepId,
    /// Whether the step was declared in the trace (and so owns a text block).
    declared: bool,
    /// Premises the step cites; metadata only.
    premises: Vec<u32>,
    predecessors: Vec<StepId>,
    successors: Vec<StepId>,
}

impl StepNode {
    fn new(id: StepId, declared: bool) -> Self {
        Self {
            id,
            declared,
            premises: Vec::new(),
            predecessors: Vec::new(),
            successors: Vec::new(),
        }
    }

    pub fn id(&self) -> StepId {
        self.id
    }

    /// Whether this step owns a text block. Steps that are only ever
    /// referenced are placeholders.
    pub fn is_declared(&self) -> bool {
        self.declared
    }

    pub fn premises(&self) -> &[u32] {
        &self.premises
    }

    /// Steps that must come before this one.
    pub fn predecessors(&self) -> &[StepId] {
        &self.predecessors
    }

    /// Steps that must come after this one.
    pub fn successors(&self) -> &[StepId] {
        &self.successors
    }

    pub fn in_degree(&self) -> usize {
        self.predecessors.len()
    }
}

/// Directed graph with an edge `dependency -> dependent` for every step reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    nodes: BTreeMap<StepId, StepNode>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for one trace from its extracted dependency lists.
    ///
    /// Every listed step becomes a declared node first, so a forward
    /// reference to a step declared later is not mistaken for a dangling one.
    pub fn from_dependencies(steps: &[StepDependencies]) -> Self {
        let mut graph = Self::new();

        for deps in steps {
            graph.declare_step(deps.step);
        }

        for deps in steps {
            for premise in deps.premise_references() {
                graph.add_premise(deps.step, premise);
            }
            for dependency in deps.step_references() {
                graph.add_dependency(dependency, deps.step);
            }
        }

        debug!(
            "Built dependency graph: {} nodes ({} declared), {} edges",
            graph.node_count(),
            graph.declared_count(),
            graph.edge_count()
        );
        graph
    }

    /// Declare a step that owns a text block.
    ///
    /// Declaring an existing id marks it as declared; repeated declarations
    /// are merged into one node.
    pub fn declare_step(&mut self, id: StepId) {
        match self.nodes.get_mut(&id) {
            Some(node) if node.declared => {
                warn!("{} is declared more than once; merging its dependencies", id);
            }
            Some(node) => node.declared = true,
            None => {
                self.nodes.insert(id, StepNode::new(id, true));
            }
        }
    }

    /// Record that `step` cites premise `premise`.
    pub fn add_premise(&mut self, step: StepId, premise: u32) {
        let node = self.node_entry(step);
        if !node.premises.contains(&premise) {
            node.premises.push(premise);
        }
    }

    /// Add the edge `dependency -> dependent`. Either endpoint is created on
    /// demand as an undeclared node. Repeated edges are ignored.
    pub fn add_dependency(&mut self, dependency: StepId, dependent: StepId) {
        if !self.nodes.contains_key(&dependency) {
            debug!("{} is referenced but never declared", dependency);
        }

        let from = self.node_entry(dependency);
        if from.successors.contains(&dependent) {
            return;
        }
        from.successors.push(dependent);
        self.node_entry(dependent).predecessors.push(dependency);
    }

    fn node_entry(&mut self, id: StepId) -> &mut StepNode {
        self.nodes
            .entry(id)
            .or_insert_with(|| StepNode::new(id, false))
    }

    /// Number of nodes, declared or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of nodes that own a text block.
    pub fn declared_count(&self) -> usize {
        self.nodes.values().filter(|n| n.declared).count()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.successors.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: StepId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Whether `id` is a declared step (and so owns a text block).
    pub fn is_declared(&self, id: StepId) -> bool {
        self.nodes.get(&id).is_some_and(|n| n.declared)
    }

    pub fn node(&self, id: StepId) -> Option<&StepNode> {
        self.nodes.get(&id)
    }

    /// All nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &StepNode> {
        self.nodes.values()
    }

    /// All node ids in ascending order.
    pub fn step_ids(&self) -> Vec<StepId> {
        self.nodes.keys().copied().collect()
    }

    /// All edges as `(dependency, dependent)` pairs.
    pub fn edges(&self) -> Vec<(StepId, StepId)> {
        self.nodes
            .values()
            .flat_map(|n| n.successors.iter().map(move |s| (n.id, *s)))
            .collect()
    }

    /// Steps with no dependencies.
    pub fn root_steps(&self) -> Vec<StepId> {
        self.nodes
            .values()
            .filter(|n| n.predecessors.is_empty())
            .map(|n| n.id)
            .collect()
    }

    /// Find a cycle using three-colour DFS, returning its path if one exists.
    pub fn find_cycle(&self) -> Option<Vec<StepId>> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        for id in self.nodes.keys() {
            if !visited.contains(id) {
                if let Some(cycle) = self.dfs_cycle(*id, &mut visited, &mut stack) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn dfs_cycle(
        &self,
        node: StepId,
        visited: &mut HashSet<StepId>,
        stack: &mut Vec<StepId>,
    ) -> Option<Vec<StepId>> {
        visited.insert(node);
        stack.push(node);

        if let Some(step_node) = self.nodes.get(&node) {
            for &successor in &step_node.successors {
                if let Some(pos) = stack.iter().position(|s| *s == successor) {
                    // Back edge
                    let mut cycle = stack[pos..].to_vec();
                    cycle.push(successor);
                    return Some(cycle);
                }
                if !visited.contains(&successor) {
                    if let Some(cycle) = self.dfs_cycle(successor, visited, stack) {
                        return Some(cycle);
                    }
                }
            }
        }

        stack.pop();
        None
    }

    pub fn has_cycle(&self) -> bool {
        self.find_cycle().is_some()
    }

    /// Fail with [`Error::CycleDetected`] if the graph is not a DAG.
    pub fn validate_acyclic(&self) -> Result<()> {
        match self.find_cycle() {
            Some(cycle) => {
                let path = cycle
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(" -> ");
                Err(Error::cycle(path))
            }
            None => Ok(()),
        }
    }

    /// Whether `order` is a permutation of the node set honouring every edge.
    pub fn is_linear_extension(&self, order: &[StepId]) -> bool {
        if order.len() != self.nodes.len() {
            return false;
        }
        let mut seen = HashSet::new();
        for id in order {
            let Some(node) = self.nodes.get(id) else {
                return false;
            };
            if !node.predecessors.iter().all(|p| seen.contains(p)) {
                return false;
            }
            if !seen.insert(*id) {
                return false;
            }
        }
        true
    }
}
