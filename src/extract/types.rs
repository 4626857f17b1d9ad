//! Types produced by dependency extraction.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Reference, StepId};

/// The dependencies one step declares, in the order they were written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDependencies {
    pub step: StepId,
    pub references: Vec<Reference>,
}

impl StepDependencies {
    pub fn new(step: StepId, references: Vec<Reference>) -> Self {
        Self { step, references }
    }

    /// Step references only; these become graph edges.
    pub fn step_references(&self) -> impl Iterator<Item = StepId> + '_ {
        self.references.iter().filter_map(Reference::as_step)
    }

    /// Premise numbers only; these are metadata and never graph nodes.
    pub fn premise_references(&self) -> impl Iterator<Item = u32> + '_ {
        self.references.iter().filter_map(|r| match r {
            Reference::Premise(n) => Some(*n),
            Reference::Step(_) => None,
        })
    }
}

/// Why a step sentence contributed no dependency entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    /// The step has no `Premises and steps required:` clause.
    MissingClause,
    /// The clause is never closed by a period.
    UnterminatedClause,
    /// The step header's number does not fit a step id.
    InvalidStepNumber,
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MissingClause => "missing dependency clause",
            Self::UnterminatedClause => "unterminated dependency clause",
            Self::InvalidStepNumber => "invalid step number",
        };
        f.write_str(s)
    }
}

/// A step sentence that did not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseMiss {
    /// The step the sentence belongs to, when its header could be read.
    pub step: Option<StepId>,
    pub reason: MissReason,
    /// Byte offset of the step header in the source text.
    pub offset: usize,
}

/// Result of extracting dependencies from one trace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    /// Matched steps, in the order they appear in the text.
    pub steps: Vec<StepDependencies>,
    /// Step sentences that were dropped.
    pub misses: Vec<ParseMiss>,
}

impl Extraction {
    /// Number of matched step sentences.
    pub fn number_of_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Dependencies declared for a step (the first declaration if repeated).
    pub fn get(&self, step: StepId) -> Option<&StepDependencies> {
        self.steps.iter().find(|s| s.step == step)
    }
}
