//! Core identifier and reference types shared across the pipeline.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Identifier of a reasoning step, as written in the trace (`Step 3` is `StepId(3)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub u32);

impl StepId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// The numeric value of this id.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Parse a `Step k` label (as used for keys in dependency records).
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().parse::<Reference>() {
            Ok(Reference::Step(id)) => Some(id),
            _ => None,
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step {}", self.0)
    }
}

/// A dependency declared by a step: either a given premise or an earlier step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Reference {
    /// A given fact. Premises are terminal and never become graph nodes.
    Premise(u32),
    /// Another reasoning step that must precede the citing step.
    Step(StepId),
}

impl Reference {
    /// The step this reference points at, if it is a step reference.
    pub fn as_step(&self) -> Option<StepId> {
        match self {
            Self::Step(id) => Some(*id),
            Self::Premise(_) => None,
        }
    }

    pub fn is_premise(&self) -> bool {
        matches!(self, Self::Premise(_))
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Premise(n) => write!(f, "Premise {}", n),
            Self::Step(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for Reference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let kind = parts.next().ok_or_else(|| "empty reference".to_string())?;
        let number = parts
            .next()
            .and_then(|n| n.parse::<u32>().ok())
            .ok_or_else(|| format!("reference '{}' has no number", s))?;
        if parts.next().is_some() {
            return Err(format!("unexpected trailing text in reference '{}'", s));
        }
        match kind {
            "Premise" => Ok(Self::Premise(number)),
            "Step" => Ok(Self::Step(StepId(number))),
            other => Err(format!("unknown reference kind '{}'", other)),
        }
    }
}

impl TryFrom<String> for Reference {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Reference> for String {
    fn from(value: Reference) -> Self {
        value.to_string()
    }
}

/// A linear extension of the dependency graph: every node exactly once, each
/// dependency ahead of its dependents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sequence(pub Vec<StepId>);

impl Sequence {
    pub fn new(steps: Vec<StepId>) -> Self {
        Self(steps)
    }

    pub fn steps(&self) -> &[StepId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The step placed last in this order.
    pub fn last(&self) -> Option<StepId> {
        self.0.last().copied()
    }

    /// Whether this order still ends on the textually-final step, i.e. its last
    /// element equals the number of steps it orders.
    pub fn ends_on_final_step(&self) -> bool {
        self.last()
            .map(|id| id.get() as usize == self.len())
            .unwrap_or(false)
    }

    /// Map each original step id to its new 1-based position in this order.
    pub fn position_map(&self) -> HashMap<StepId, u32> {
        self.0
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i as u32 + 1))
            .collect()
    }
}

impl From<Vec<u32>> for Sequence {
    fn from(ids: Vec<u32>) -> Self {
        Self(ids.into_iter().map(StepId).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_parse_and_display() {
        assert_eq!("Premise 4".parse::<Reference>(), Ok(Reference::Premise(4)));
        assert_eq!(
            "Step 12".parse::<Reference>(),
            Ok(Reference::Step(StepId::new(12)))
        );
        assert!("Lemma 2".parse::<Reference>().is_err());
        assert!("Step".parse::<Reference>().is_err());
        assert_eq!(Reference::Step(StepId::new(3)).to_string(), "Step 3");
    }

    #[test]
    fn test_reference_serde_as_string() {
        let refs = vec![Reference::Premise(1), Reference::Step(StepId::new(2))];
        let json = serde_json::to_string(&refs).unwrap();
        assert_eq!(json, r#"["Premise 1","Step 2"]"#);
        let back: Vec<Reference> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, refs);
    }

    #[test]
    fn test_sequence_helpers() {
        let seq = Sequence::from(vec![2, 1, 3]);
        assert!(seq.ends_on_final_step());
        assert_eq!(seq.position_map()[&StepId::new(2)], 1);
        assert_eq!(serde_json::to_string(&seq).unwrap(), "[2,1,3]");

        let seq = Sequence::from(vec![1, 3, 2]);
        assert!(!seq.ends_on_final_step());
        assert!(!Sequence::new(Vec::new()).ends_on_final_step());
    }

    #[test]
    fn test_step_label() {
        assert_eq!(StepId::parse_label("Step 9"), Some(StepId::new(9)));
        assert_eq!(StepId::parse_label("Premise 9"), None);
    }
}
