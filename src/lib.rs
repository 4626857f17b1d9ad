//! # cot-augment
//!
//! Augments chain-of-thought training data by reordering reasoning steps.
//!
//! A trace lists numbered steps that each declare the premises and earlier
//! steps they depend on. From those declarations the crate builds a
//! dependency graph, enumerates every order consistent with it, and rewrites
//! the trace in an alternate order with its step numbers made sequential
//! again.
//!
//! ## Core Components
//!
//! - **Extract**: Parse `Premises and steps required:` clauses into dependencies
//! - **Graph**: Dependency DAG and bounded enumeration of its topological orders
//! - **Select**: Pick the canonical order plus one seeded alternate
//! - **Reorganize / Renumber**: Permute step blocks and rewrite step citations
//! - **Pipeline**: Per-record augmentation, sequential or parallel batches
//!
//! ## Example
//!
//! ```rust
//! use cot_augment::{AugmentConfig, Augmenter, TraceRecord};
//!
//! let record = TraceRecord::new(
//!     "Does Tom breathe?",
//!     "Step 1: Tom is a cat. Premises and steps required: Premise 1.\n\
//!      Step 2: Cats breathe. Premises and steps required: Premise 2.\n\
//!      Final Conclusion: True.",
//! );
//!
//! let augmentation = Augmenter::new(AugmentConfig::new().with_seed(0))
//!     .augment(0, &record)
//!     .unwrap();
//! assert_eq!(
//!     augmentation.renumbered[1].output_list[1],
//!     "Step 1: Cats breathe. Premises and steps required: Premise 2."
//! );
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod graph;
pub mod pipeline;
pub mod premises;
pub mod records;
pub mod renumber;
pub mod reorganize;
pub mod select;
pub mod trace;
pub mod types;

// Re-exports for convenience
pub use config::AugmentConfig;
pub use error::{Error, Result};
pub use extract::{DependencyExtractor, Extraction, MissReason, ParseMiss, StepDependencies};
pub use graph::{DependencyGraph, StepNode, TopologicalEnumerator};
pub use pipeline::{
    Augmentation, Augmenter, BatchOutput, BatchReport, Diagnostics, ParallelAugmenter,
    RecordResult,
};
pub use premises::{PremiseShuffler, ShuffledPremises};
pub use records::{
    parse_records, DependencyRecord, OutputListRecord, SequenceRecord, TraceRecord,
    TrainingExample,
};
pub use renumber::{Renumbered, StepRenumberer, UnmappedReference};
pub use reorganize::{Reorganized, StepReorganizer};
pub use select::SequenceSelector;
pub use trace::Trace;
pub use types::{Reference, Sequence, StepId};
