//! Shuffling the numbered premise list of an instruction.
//!
//! Evaluation instructions list their premises as numbered lines after a
//! fixed prompt, followed by two lines stating the conclusion to judge:
//!
//! ```text
//! ...based on these premises.
//!
//! Premises:
//! 1. All cats are animals.
//! 2. Tom is a cat.
//! Conclusion:
//! Tom is an animal.
//! ```
//!
//! [`PremiseShuffler`] permutes the premise lines and renumbers them from 1,
//! leaving the prompt and the final two lines untouched. This perturbs the
//! premise order of a test set independently of any step reordering.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Prompt text after which the numbered premises begin.
pub const PREMISES_MARKER: &str = "Please determine whether the conclusion is true, false, or uncertain based on these premises.\n\nPremises:\n";

/// Number of trailing lines that state the conclusion and stay in place.
const TRAILING_LINES: usize = 2;

/// An instruction with its premises permuted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuffledPremises {
    pub instruction: String,
    /// `order[i]` is the original number of the premise now numbered `i + 1`.
    pub order: Vec<usize>,
}

/// Permutes and renumbers the premises of an instruction.
#[derive(Debug, Clone)]
pub struct PremiseShuffler {
    marker: String,
}

impl Default for PremiseShuffler {
    fn default() -> Self {
        Self::new()
    }
}

impl PremiseShuffler {
    pub fn new() -> Self {
        Self {
            marker: PREMISES_MARKER.to_string(),
        }
    }

    /// Use a different prompt marker.
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Shuffle the premises of `instruction`.
    ///
    /// Returns `None` when the instruction has no marker or no premise lines,
    /// in which case it should be used unchanged.
    pub fn shuffle<R: Rng + ?Sized>(
        &self,
        instruction: &str,
        rng: &mut R,
    ) -> Option<ShuffledPremises> {
        let split = instruction.find(&self.marker)? + self.marker.len();
        let (intro, remaining) = instruction.split_at(split);

        let parts: Vec<&str> = remaining.split('\n').collect();
        if parts.len() <= TRAILING_LINES {
            return None;
        }
        let (body, tail) = parts.split_at(parts.len() - TRAILING_LINES);

        let mut premises: Vec<(usize, &str)> = body
            .iter()
            .enumerate()
            .map(|(i, line)| (i + 1, strip_number(line)))
            .collect();
        premises.shuffle(rng);

        let numbered: Vec<String> = premises
            .iter()
            .enumerate()
            .map(|(i, (_, text))| format!("{}. {}", i + 1, text))
            .collect();

        Some(ShuffledPremises {
            instruction: format!("{}{}\n{}", intro, numbered.join("\n"), tail.join("\n")),
            order: premises.iter().map(|(n, _)| *n).collect(),
        })
    }

    /// Shuffle when possible, otherwise return the instruction as is.
    pub fn shuffle_or_keep<R: Rng + ?Sized>(&self, instruction: &str, rng: &mut R) -> String {
        self.shuffle(instruction, rng)
            .map(|s| s.instruction)
            .unwrap_or_else(|| instruction.to_string())
    }
}

/// Drop a leading `N. ` label.
fn strip_number(line: &str) -> &str {
    line.split_once(". ").map(|(_, rest)| rest).unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn instruction() -> String {
        format!(
            "Read the premises.\n{}1. All cats are animals.\n2. Tom is a cat.\n3. Animals breathe.\nConclusion:\nTom breathes.",
            PREMISES_MARKER
        )
    }

    #[test]
    fn test_shuffle_preserves_premises_and_tail() {
        let mut rng = StdRng::seed_from_u64(3);
        let shuffled = PremiseShuffler::new().shuffle(&instruction(), &mut rng).unwrap();

        assert!(shuffled.instruction.starts_with("Read the premises.\n"));
        assert!(shuffled.instruction.ends_with("\nConclusion:\nTom breathes."));

        let mut sorted = shuffled.order.clone();
        sorted.sort();
        assert_eq!(sorted, vec![1, 2, 3]);

        let originals = ["All cats are animals.", "Tom is a cat.", "Animals breathe."];
        for (i, n) in shuffled.order.iter().enumerate() {
            let line = format!("{}. {}", i + 1, originals[n - 1]);
            assert!(shuffled.instruction.contains(&line), "missing {}", line);
        }
    }

    #[test]
    fn test_same_seed_same_shuffle() {
        let shuffle = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            PremiseShuffler::new().shuffle(&instruction(), &mut rng).unwrap()
        };
        assert_eq!(shuffle(11), shuffle(11));
    }

    #[test]
    fn test_without_marker_is_unchanged() {
        let mut rng = StdRng::seed_from_u64(0);
        let shuffler = PremiseShuffler::new();
        assert!(shuffler.shuffle("No premises here", &mut rng).is_none());
        assert_eq!(
            shuffler.shuffle_or_keep("No premises here", &mut rng),
            "No premises here"
        );
    }

    #[test]
    fn test_only_trailing_lines_is_unchanged() {
        let mut rng = StdRng::seed_from_u64(0);
        let text = format!("{}Conclusion:\nX.", PREMISES_MARKER);
        assert!(PremiseShuffler::new().shuffle(&text, &mut rng).is_none());
    }
}
