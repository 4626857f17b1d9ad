//! Rearranging a trace's step blocks into a selected order.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

use crate::error::{Error, Result};
use crate::graph::DependencyGraph;
use crate::trace::Trace;
use crate::types::Sequence;

/// A trace whose step region has been rearranged, paired with the order used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reorganized {
    /// The order the step blocks now follow, in original step ids.
    pub sequence: Sequence,
    pub trace: Trace,
}

/// Places the original step blocks in the order given by a [`Sequence`].
///
/// The intro and conclusion are copied untouched, and the step region keeps
/// its length. Any sequence that cannot be mapped onto the original blocks
/// rejects the whole candidate; nothing partial is produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepReorganizer;

impl StepReorganizer {
    pub fn new() -> Self {
        Self
    }

    /// Reorganize `trace` so that its step blocks follow `sequence`.
    ///
    /// Errors (all candidate-level):
    /// - [`Error::IndexOutOfRange`]: an id addresses no step block
    /// - [`Error::UnownedStep`]: an id was only referenced, never declared
    /// - [`Error::DuplicateStep`]: an id occurs twice
    /// - [`Error::LengthMismatch`]: the order does not cover every block
    pub fn reorganize(
        &self,
        trace: &Trace,
        sequence: &Sequence,
        graph: &DependencyGraph,
    ) -> Result<Reorganized> {
        let block_count = trace.step_count();
        let mut seen = HashSet::with_capacity(sequence.len());
        let mut steps = Vec::with_capacity(sequence.len());

        for &id in sequence.steps() {
            let block = trace.step_block(id).ok_or(Error::IndexOutOfRange {
                step: id,
                block_count,
            })?;
            if !graph.is_declared(id) {
                return Err(Error::UnownedStep(id));
            }
            if !seen.insert(id) {
                return Err(Error::DuplicateStep(id));
            }
            steps.push(block.to_string());
        }

        if steps.len() != block_count {
            return Err(Error::LengthMismatch {
                sequence_len: steps.len(),
                block_count,
            });
        }

        Ok(Reorganized {
            sequence: sequence.clone(),
            trace: trace.with_steps(steps),
        })
    }

    /// Reorganize `trace` under each order, discarding (and logging) the
    /// orders that cannot be applied.
    pub fn reorganize_all(
        &self,
        trace: &Trace,
        sequences: &[Sequence],
        graph: &DependencyGraph,
    ) -> (Vec<Reorganized>, Vec<Error>) {
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for sequence in sequences {
            match self.reorganize(trace, sequence, graph) {
                Ok(candidate) => accepted.push(candidate),
                Err(e) => {
                    warn!("Discarding candidate order {:?}: {}", sequence.steps(), e);
                    rejected.push(e);
                }
            }
        }

        (accepted, rejected)
    }
}
