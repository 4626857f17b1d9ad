//! End-to-end augmentation of trace records.
//!
//! [`Augmenter`] runs one record through every stage:
//!
//! ```text
//! model_output ─► extract ─► graph ─► enumerate ─► select ─┐
//! output_list  ─► trace ───────────────────────────────────┴─► reorganize ─► renumber ─► render
//! ```
//!
//! Record-level failures ([`Error::InsufficientInput`], [`Error::NoSequences`],
//! [`Error::CycleDetected`], [`Error::Capacity`]) skip the record; candidate
//! failures only drop the affected order.
//!
//! ## Example
//!
//! ```rust
//! use cot_augment::{AugmentConfig, Augmenter, TraceRecord};
//!
//! let record = TraceRecord::new(
//!     "Is Tom an animal?",
//!     "Step 1: Tom is a cat. Premises and steps required: Premise 1.\n\
//!      Step 2: Cats are animals. Premises and steps required: Premise 2.\n\
//!      Step 3: Tom is an animal. Premises and steps required: Step 1 and Step 2.\n\
//!      Final Conclusion: True.",
//! );
//!
//! let augmenter = Augmenter::new(AugmentConfig::new().with_seed(7));
//! let augmentation = augmenter.augment(0, &record).unwrap();
//! assert_eq!(augmentation.sequences.reasonable.number_of_sequences, 2);
//! assert_eq!(augmentation.renumbered.len(), 2);
//! ```

mod batch;

pub use batch::{BatchOutput, BatchReport, ParallelAugmenter, RecordResult};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::AugmentConfig;
use crate::error::{Error, Result};
use crate::extract::{DependencyExtractor, ParseMiss};
use crate::graph::{DependencyGraph, TopologicalEnumerator};
use crate::records::{
    DependencyRecord, OutputListRecord, SequenceRecord, TraceRecord, TrainingExample,
};
use crate::renumber::{StepRenumberer, UnmappedReference};
use crate::reorganize::StepReorganizer;
use crate::select::SequenceSelector;
use crate::types::Sequence;

/// Problems found while augmenting a record that did not stop it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Step sentences without a well-formed dependency clause.
    pub parse_misses: Vec<ParseMiss>,
    /// Selected orders that could not be applied, with the reason.
    pub rejected_candidates: Vec<String>,
    /// Step numbers left unchanged by renumbering.
    pub unmapped_references: Vec<UnmappedReference>,
}

impl Diagnostics {
    pub fn is_clean(&self) -> bool {
        self.parse_misses.is_empty()
            && self.rejected_candidates.is_empty()
            && self.unmapped_references.is_empty()
    }
}

/// Everything produced from one source record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Augmentation {
    /// Digest of the source record (see [`TraceRecord::digest`]).
    pub source_digest: String,
    pub dependencies: DependencyRecord,
    pub sequences: SequenceRecord,
    /// The orders chosen for rendering, canonical first.
    pub selected: Vec<Sequence>,
    pub reorganized: Vec<OutputListRecord>,
    pub renumbered: Vec<OutputListRecord>,
    /// Rendered examples, one per renumbered trace (empty when rendering is off).
    pub examples: Vec<TrainingExample>,
    pub diagnostics: Diagnostics,
}

/// Runs trace records through extraction, enumeration, selection,
/// reorganization and renumbering.
#[derive(Debug, Clone)]
pub struct Augmenter {
    config: AugmentConfig,
    base_seed: u64,
    extractor: DependencyExtractor,
    enumerator: TopologicalEnumerator,
    selector: SequenceSelector,
    reorganizer: StepReorganizer,
    renumberer: StepRenumberer,
}

impl Default for Augmenter {
    fn default() -> Self {
        Self::new(AugmentConfig::default())
    }
}

impl Augmenter {
    /// Create an augmenter. Without a configured seed a base seed is drawn
    /// once here; [`Augmenter::base_seed`] reports it for reproduction.
    pub fn new(config: AugmentConfig) -> Self {
        let base_seed = config.seed.unwrap_or_else(rand::random);
        Self {
            extractor: DependencyExtractor::new(),
            enumerator: TopologicalEnumerator::from_config(&config),
            selector: SequenceSelector::new()
                .with_prefer_final_step_last(config.prefer_final_step_last),
            reorganizer: StepReorganizer::new(),
            renumberer: StepRenumberer::new(),
            base_seed,
            config,
        }
    }

    /// Replace the dependency extractor (e.g. for a different clause marker).
    /// The renumberer follows its clause marker.
    pub fn with_extractor(mut self, extractor: DependencyExtractor) -> Self {
        self.renumberer = StepRenumberer::new().with_clause_marker(extractor.clause_marker());
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &AugmentConfig {
        &self.config
    }

    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// The random source for the record at `index` in a batch.
    ///
    /// Seeds depend only on the base seed and the index, so a record gets
    /// the same choices whether batches run sequentially or in parallel.
    pub fn rng_for(&self, index: usize) -> StdRng {
        StdRng::seed_from_u64(self.base_seed.wrapping_add(index as u64))
    }

    /// Augment the record at `index` of a batch.
    pub fn augment(&self, index: usize, record: &TraceRecord) -> Result<Augmentation> {
        let mut rng = self.rng_for(index);
        self.augment_with_rng(record, &mut rng)
    }

    /// Augment one record drawing alternates from `rng`.
    #[instrument(skip(self, record, rng), fields(instruction_len = record.instruction.len()))]
    pub fn augment_with_rng<R: Rng + ?Sized>(
        &self,
        record: &TraceRecord,
        rng: &mut R,
    ) -> Result<Augmentation> {
        let trace = record.trace()?;
        if trace.step_count() < 2 {
            return Err(Error::insufficient_input(format!(
                "trace has {} step block(s), need at least 2",
                trace.step_count()
            )));
        }

        let extraction = self.extractor.extract(&record.model_output);
        if extraction.is_empty() {
            return Err(Error::insufficient_input(
                "no step sentence declares its dependencies",
            ));
        }

        let graph = DependencyGraph::from_dependencies(&extraction.steps);
        let sequences = self.enumerator.enumerate(&graph)?;
        let sequence_record = SequenceRecord::new(sequences.clone());
        let selected = self.selector.select(sequences, rng)?;

        let (reorganized, rejected) = self.reorganizer.reorganize_all(&trace, &selected, &graph);
        if reorganized.is_empty() {
            warn!("No selected order could be applied to the trace");
        }

        let renumbered: Vec<_> = reorganized
            .iter()
            .map(|candidate| self.renumberer.renumber(candidate))
            .collect();

        let examples = if self.config.render_examples {
            renumbered
                .iter()
                .map(|r| TrainingExample::new(&record.instruction, &r.trace))
                .collect()
        } else {
            Vec::new()
        };

        let diagnostics = Diagnostics {
            parse_misses: extraction.misses.clone(),
            rejected_candidates: rejected.iter().map(|e| e.to_string()).collect(),
            unmapped_references: renumbered
                .iter()
                .flat_map(|r| r.unmapped.iter().cloned())
                .collect(),
        };

        debug!(
            "Augmented record: {} sequences, {} selected, {} variants",
            sequence_record.reasonable.number_of_sequences,
            selected.len(),
            renumbered.len()
        );

        Ok(Augmentation {
            source_digest: record.digest(),
            dependencies: DependencyRecord::from_extraction(&extraction),
            sequences: sequence_record,
            reorganized: reorganized
                .iter()
                .map(|r| OutputListRecord::new(&record.instruction, &r.trace))
                .collect(),
            renumbered: renumbered
                .iter()
                .map(|r| OutputListRecord::new(&record.instruction, &r.trace))
                .collect(),
            selected,
            examples,
            diagnostics,
        })
    }

    /// Augment a batch sequentially.
    ///
    /// Records failing with a record-level error are skipped and reported;
    /// a fatal error ([`Error::is_fatal`]) aborts the batch.
    pub fn augment_batch(&self, records: &[TraceRecord]) -> Result<BatchOutput> {
        let started_at = chrono::Utc::now();
        let results = records
            .iter()
            .enumerate()
            .map(|(index, record)| (index, self.augment(index, record)))
            .collect();
        BatchOutput::collect(results, started_at, self.base_seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StepId;
    use pretty_assertions::assert_eq;

    const INSTRUCTION: &str = "Determine whether Tom breathes.";

    fn output(clauses: &[(&str, &str)]) -> String {
        let mut text = String::from("Let's think step by step.\n");
        for (i, (body, clause)) in clauses.iter().enumerate() {
            text.push_str(&format!(
                "Step {}: {} Premises and steps required: {}.\n",
                i + 1,
                body,
                clause
            ));
        }
        text.push_str("Final Conclusion: True.");
        text
    }

    fn augmenter() -> Augmenter {
        Augmenter::new(AugmentConfig::new().with_seed(42))
    }

    #[test]
    fn test_linear_chain_is_idempotent() {
        let text = output(&[
            ("Tom is a cat.", "Premise 1"),
            ("Tom is an animal.", "Premise 2 and Step 1"),
            ("Tom breathes.", "Premise 3 and Step 2"),
        ]);
        let record = TraceRecord::new(INSTRUCTION, text);
        let original = record.trace().unwrap().to_output_list();

        let augmentation = augmenter().augment(0, &record).unwrap();
        assert_eq!(augmentation.sequences.reasonable.number_of_sequences, 1);
        assert_eq!(augmentation.selected, vec![Sequence::from(vec![1, 2, 3])]);
        assert_eq!(augmentation.reorganized[0].output_list, original);
        assert_eq!(augmentation.renumbered[0].output_list, original);
        assert!(augmentation.diagnostics.is_clean());
    }

    #[test]
    fn test_end_to_end_example() {
        let text = output(&[
            ("A.", "None"),
            ("B.", "Step 1"),
            ("C.", "Step 1, Step 2"),
        ]);
        let record = TraceRecord::new(INSTRUCTION, text);
        let augmentation = augmenter().augment(0, &record).unwrap();

        let used = serde_json::to_value(&augmentation.dependencies).unwrap();
        assert_eq!(
            used,
            serde_json::json!({
                "Number of Steps": 3,
                "Used": [{"Step 1": []}, {"Step 2": ["Step 1"]}, {"Step 3": ["Step 1", "Step 2"]}]
            })
        );
        assert_eq!(
            augmentation.sequences.sequences(),
            &[Sequence::from(vec![1, 2, 3])]
        );
        assert_eq!(
            augmentation.reorganized[0].output_list,
            record.trace().unwrap().to_output_list()
        );
    }

    #[test]
    fn test_independent_steps_are_reordered_and_renumbered() {
        let text = output(&[
            ("Tom is a cat.", "Premise 1"),
            ("Cats are animals.", "Premise 2"),
            ("Animals breathe.", "Premise 3"),
            ("Tom breathes.", "Steps 1, 2 and 3"),
        ]);
        let record = TraceRecord::new(INSTRUCTION, text);
        let augmentation = augmenter().augment(0, &record).unwrap();

        assert_eq!(augmentation.sequences.reasonable.number_of_sequences, 6);
        assert_eq!(augmentation.selected.len(), 2);
        assert_eq!(augmentation.selected[0], Sequence::from(vec![1, 2, 3, 4]));
        let alternate = &augmentation.selected[1];
        assert_eq!(alternate.last(), Some(StepId::new(4)));

        // Renumbered steps read Step 1..4 in order again
        let renumbered = &augmentation.renumbered[1].output_list;
        for (i, block) in renumbered[1..5].iter().enumerate() {
            assert!(block.starts_with(&format!("Step {}:", i + 1)), "{}", block);
        }
        assert_eq!(renumbered[0], "Let's think step by step.");
        assert_eq!(renumbered[5], "Final Conclusion: True.");
        assert_eq!(augmentation.examples.len(), 2);
        assert_eq!(augmentation.examples[0].input, "");
    }

    #[test]
    fn test_dangling_reference_rejects_candidates_without_error() {
        // Step 2 cites Step 5, which is never declared
        let text = output(&[("A.", "Premise 1"), ("B.", "Step 5")]);
        let record = TraceRecord::new(INSTRUCTION, text);
        let augmentation = augmenter().augment(0, &record).unwrap();

        for seq in augmentation.sequences.sequences() {
            assert!(seq.steps().contains(&StepId::new(5)));
        }
        assert!(augmentation.reorganized.is_empty());
        assert!(!augmentation.diagnostics.rejected_candidates.is_empty());
    }

    #[test]
    fn test_parse_misses_are_reported() {
        let text = "Intro\nStep 1: A. Premises and steps required: Premise 1.\n\
            Step 2: B without a clause.\n\
            Step 3: C. Premises and steps required: Step 1.\nFinal Conclusion: x";
        let record = TraceRecord::new(INSTRUCTION, text);
        let augmentation = augmenter().augment(0, &record).unwrap();
        assert_eq!(augmentation.dependencies.number_of_steps, 2);
        assert_eq!(augmentation.diagnostics.parse_misses.len(), 1);
    }

    #[test]
    fn test_inline_step_label_does_not_split_the_step() {
        let text = output(&[
            ("A holds.", "Premise 1"),
            ("B holds.", "Premise 2"),
            ("Recall Step 1: A holds, so C.", "Step 1"),
        ]);
        let record = TraceRecord::new(INSTRUCTION, text);
        let augmentation = augmenter().augment(0, &record).unwrap();

        assert!(augmentation.diagnostics.parse_misses.is_empty());
        assert_eq!(augmentation.dependencies.number_of_steps, 3);
        assert_eq!(
            augmentation.sequences.sequences(),
            &[
                Sequence::from(vec![1, 2, 3]),
                Sequence::from(vec![1, 3, 2]),
                Sequence::from(vec![2, 1, 3]),
            ]
        );
        assert_eq!(augmentation.selected[1], Sequence::from(vec![2, 1, 3]));
        // In the swapped order the recalled step is now Step 2
        assert_eq!(
            augmentation.renumbered[1].output_list[3],
            "Step 3: Recall Step 2: A holds, so C. Premises and steps required: Step 2."
        );
    }

    #[test]
    fn test_lowercase_citation_follows_the_reordering() {
        let text = output(&[("A.", "Premise 1"), ("B.", "Premise 2"), ("C.", "step 1")]);
        let record = TraceRecord::new(INSTRUCTION, text);
        let augmentation = augmenter().augment(0, &record).unwrap();

        assert_eq!(augmentation.selected[1], Sequence::from(vec![2, 1, 3]));
        assert_eq!(
            augmentation.renumbered[1].output_list[3],
            "Step 3: C. Premises and steps required: step 2."
        );
        assert!(augmentation.diagnostics.unmapped_references.is_empty());
    }

    #[test]
    fn test_custom_clause_marker_reaches_renumbering() {
        let text = "Intro\nStep 1: A. Uses: Premise 1.\nStep 2: B. Uses: Premise 2.\n\
            Step 3: C. Uses: step 1, 2.\nFinal Conclusion: x";
        let record = TraceRecord::new(INSTRUCTION, text);
        let augmentation = augmenter()
            .with_extractor(DependencyExtractor::new().with_clause_marker("Uses:"))
            .augment(0, &record)
            .unwrap();

        assert_eq!(
            augmentation.renumbered[1].output_list[3],
            "Step 3: C. Uses: step 2, 1."
        );
    }

    #[test]
    fn test_single_step_is_insufficient() {
        let record = TraceRecord::new(INSTRUCTION, output(&[("A.", "Premise 1")]));
        assert!(matches!(
            augmenter().augment(0, &record),
            Err(Error::InsufficientInput(_))
        ));
    }

    #[test]
    fn test_cycle_is_record_level_error() {
        let text = output(&[("A.", "Step 2"), ("B.", "Step 1")]);
        let record = TraceRecord::new(INSTRUCTION, text);
        assert!(matches!(
            augmenter().augment(0, &record),
            Err(Error::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_output_list_takes_precedence_over_segmentation() {
        let text = output(&[("A.", "Premise 1"), ("B.", "Premise 2")]);
        let list = vec![
            "Intro".to_string(),
            "Step 1: A.".to_string(),
            "Step 2: B.".to_string(),
            "Final Conclusion: x".to_string(),
        ];
        let record = TraceRecord::new(INSTRUCTION, text).with_output_list(list);
        let augmentation = augmenter().augment(0, &record).unwrap();
        assert_eq!(augmentation.renumbered.len(), 2);
        assert_eq!(
            augmentation.renumbered[1].output_list,
            vec!["Intro", "Step 1: B.", "Step 2: A.", "Final Conclusion: x"]
        );
    }

    #[test]
    fn test_same_seed_same_augmentation() {
        let text = output(&[("A.", "Premise 1"), ("B.", "Premise 2"), ("C.", "Premise 3")]);
        let record = TraceRecord::new(INSTRUCTION, text);
        let a = augmenter().augment(3, &record).unwrap();
        let b = augmenter().augment(3, &record).unwrap();
        assert_eq!(a, b);
    }
}
