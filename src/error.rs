//! Error types for cot-augment.

use thiserror::Error;

use crate::types::StepId;

/// Result type alias using cot-augment's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while augmenting reasoning traces.
///
/// Variants fall into three groups: record-level failures that skip a single
/// trace ([`Error::InsufficientInput`], [`Error::NoSequences`],
/// [`Error::CycleDetected`], [`Error::Capacity`]), candidate-level failures that
/// discard one reordering ([`Error::IndexOutOfRange`], [`Error::UnownedStep`],
/// [`Error::DuplicateStep`], [`Error::LengthMismatch`]), and
/// [`Error::Structural`], which aborts a batch.
#[derive(Error, Debug)]
pub enum Error {
    /// Not enough step blocks to reorder
    #[error("Insufficient input: {0}")]
    InsufficientInput(String),

    /// The dependency graph admits no valid order
    #[error("No valid step sequences for trace")]
    NoSequences,

    /// The declared dependencies form a cycle
    #[error("Cycle detected in step dependencies: {path}")]
    CycleDetected { path: String },

    /// Enumeration would exceed a configured bound
    #[error("Capacity exceeded: {resource} limit is {limit}")]
    Capacity { resource: String, limit: usize },

    /// A sequence element addresses a non-existent step block
    #[error("{step} is outside the step block range 1..={block_count}")]
    IndexOutOfRange { step: StepId, block_count: usize },

    /// A sequence element was referenced but never declared, so it owns no text
    #[error("{0} was referenced but never declared and owns no text block")]
    UnownedStep(StepId),

    /// A sequence element appears more than once
    #[error("{0} appears more than once in the sequence")]
    DuplicateStep(StepId),

    /// The sequence does not cover the step block region exactly
    #[error("Sequence has {sequence_len} steps but the trace has {block_count} step blocks")]
    LengthMismatch {
        sequence_len: usize,
        block_count: usize,
    },

    /// The input container does not have the expected shape
    #[error("Malformed input: {0}")]
    Structural(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an insufficient input error.
    pub fn insufficient_input(message: impl Into<String>) -> Self {
        Self::InsufficientInput(message.into())
    }

    /// Create a cycle detected error.
    pub fn cycle(path: impl Into<String>) -> Self {
        Self::CycleDetected { path: path.into() }
    }

    /// Create a capacity error.
    pub fn capacity(resource: impl Into<String>, limit: usize) -> Self {
        Self::Capacity {
            resource: resource.into(),
            limit,
        }
    }

    /// Create a structural error.
    pub fn structural(message: impl Into<String>) -> Self {
        Self::Structural(message.into())
    }

    /// Whether this error only invalidates one candidate ordering.
    pub fn is_candidate_error(&self) -> bool {
        matches!(
            self,
            Self::IndexOutOfRange { .. }
                | Self::UnownedStep(_)
                | Self::DuplicateStep(_)
                | Self::LengthMismatch { .. }
        )
    }

    /// Whether this error should abort a whole batch rather than skip a record.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Structural(_) | Self::Internal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::UnownedStep(StepId::new(4)).is_candidate_error());
        assert!(!Error::NoSequences.is_candidate_error());
        assert!(Error::structural("missing output_list").is_fatal());
        assert!(!Error::capacity("sequences", 10).is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = Error::IndexOutOfRange {
            step: StepId::new(7),
            block_count: 3,
        };
        assert_eq!(err.to_string(), "Step 7 is outside the step block range 1..=3");
    }
}
