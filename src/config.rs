//! Configuration for the augmentation pipeline.

use serde::{Deserialize, Serialize};

/// Default maximum number of graph nodes accepted for enumeration.
pub const DEFAULT_MAX_NODES: usize = 64;

/// Default maximum number of linear extensions enumerated per trace.
pub const DEFAULT_MAX_SEQUENCES: usize = 50_000;

/// Default maximum records processed concurrently by the parallel batch.
pub const DEFAULT_MAX_PARALLEL: usize = 4;

/// Settings controlling how traces are enumerated, selected and rendered.
///
/// Deserializes with defaults for every missing field, so a partial JSON
/// object such as `{"seed": 7}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentConfig {
    /// Traces whose graph has more nodes than this fail with a capacity error.
    pub max_nodes: usize,
    /// Enumeration stops with a capacity error once this many orders are found.
    pub max_sequences: usize,
    /// Prefer alternates that still end on the textually-final step.
    pub prefer_final_step_last: bool,
    /// Base seed for alternate selection (None = drawn from entropy per run).
    pub seed: Option<u64>,
    /// Render `{instruction, input, output}` examples for each renumbered trace.
    pub render_examples: bool,
    /// Maximum records processed at once by the parallel batch.
    pub max_parallel: usize,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            max_nodes: DEFAULT_MAX_NODES,
            max_sequences: DEFAULT_MAX_SEQUENCES,
            prefer_final_step_last: true,
            seed: None,
            render_examples: true,
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }
}

impl AugmentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the node bound.
    pub fn with_max_nodes(mut self, max: usize) -> Self {
        self.max_nodes = max.max(1);
        self
    }

    /// Set the per-trace sequence bound.
    pub fn with_max_sequences(mut self, max: usize) -> Self {
        self.max_sequences = max.max(1);
        self
    }

    /// Set whether alternates ending on the final step are preferred.
    pub fn with_prefer_final_step_last(mut self, prefer: bool) -> Self {
        self.prefer_final_step_last = prefer;
        self
    }

    /// Fix the base seed so runs are reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enable or disable rendering of training examples.
    pub fn with_render_examples(mut self, render: bool) -> Self {
        self.render_examples = render;
        self
    }

    /// Set the parallel batch width.
    pub fn with_max_parallel(mut self, max: usize) -> Self {
        self.max_parallel = max.max(1); // At least 1
        self
    }
}
