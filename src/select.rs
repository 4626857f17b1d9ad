//! Choosing which valid orders to render.
//!
//! From all linear extensions of a trace the selector keeps the canonical
//! (first-produced) order and, when there is real choice, one alternate.
//! The alternate is drawn from an injected random source so callers control
//! reproducibility.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::Sequence;

/// Selects the canonical order plus at most one alternate.
#[derive(Debug, Clone)]
pub struct SequenceSelector {
    prefer_final_step_last: bool,
}

impl Default for SequenceSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceSelector {
    pub fn new() -> Self {
        Self {
            prefer_final_step_last: true,
        }
    }

    /// Whether alternates that still end on the textually-final step are
    /// preferred over the rest.
    pub fn with_prefer_final_step_last(mut self, prefer: bool) -> Self {
        self.prefer_final_step_last = prefer;
        self
    }

    /// Select the orders to render for one trace.
    ///
    /// - No sequences: [`Error::NoSequences`]; the caller skips the trace.
    /// - One or two sequences: all of them, unchanged.
    /// - More: the first plus one alternate, taken uniformly from the
    ///   non-canonical sequences ending on the final step when any exist,
    ///   otherwise from all non-canonical sequences.
    pub fn select<R: Rng + ?Sized>(
        &self,
        mut sequences: Vec<Sequence>,
        rng: &mut R,
    ) -> Result<Vec<Sequence>> {
        if sequences.is_empty() {
            return Err(Error::NoSequences);
        }
        if sequences.len() <= 2 {
            return Ok(sequences);
        }

        let rest = sequences.split_off(1);
        let preferred: Vec<&Sequence> = if self.prefer_final_step_last {
            rest.iter().filter(|s| s.ends_on_final_step()).collect()
        } else {
            Vec::new()
        };

        let alternate = if preferred.is_empty() {
            rest.choose(rng)
        } else {
            preferred.choose(rng).copied()
        };

        debug!(
            "Selected alternate from {} candidates ({} end on the final step)",
            rest.len(),
            preferred.len()
        );

        // `rest` is non-empty here, so an alternate always exists.
        let alternate = alternate
            .cloned()
            .ok_or_else(|| Error::Internal("no alternate sequence to choose".to_string()))?;
        sequences.push(alternate);
        Ok(sequences)
    }
}
