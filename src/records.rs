//! Structured records exchanged with the surrounding data layer.
//!
//! Field names follow the dataset files the pipeline reads and writes, e.g.
//!
//! ```json
//! {"Number of Steps": 2, "Used": [{"Step 1": ["Premise 1"]}, {"Step 2": ["Step 1"]}]}
//! {"Reasonable sequence of steps": {"Number of sequences": 1, "Sequences": [[1, 2]]}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::extract::{Extraction, StepDependencies};
use crate::trace::Trace;
use crate::types::{Reference, Sequence, StepId};

/// One source trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub instruction: String,
    /// Model output containing the `Step k: ... Premises and steps required: ...` sentences.
    #[serde(alias = "output")]
    pub model_output: String,
    /// Pre-split blocks `[intro, steps..., conclusion]`. When absent the
    /// blocks are segmented from `model_output`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_list: Option<Vec<String>>,
}

impl TraceRecord {
    pub fn new(instruction: impl Into<String>, model_output: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            model_output: model_output.into(),
            output_list: None,
        }
    }

    pub fn with_output_list(mut self, output_list: Vec<String>) -> Self {
        self.output_list = Some(output_list);
        self
    }

    /// The block structure of this record's trace.
    pub fn trace(&self) -> Result<Trace> {
        match &self.output_list {
            Some(list) => Trace::from_output_list(list),
            None => Ok(Trace::segment(&self.model_output)),
        }
    }

    /// SHA-256 digest identifying this record, carried by everything derived from it.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"instruction:");
        hasher.update(self.instruction.as_bytes());
        hasher.update(b"\nmodel_output:");
        hasher.update(self.model_output.as_bytes());
        if let Some(list) = &self.output_list {
            for block in list {
                hasher.update(b"\nblock:");
                hasher.update(block.as_bytes());
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Parse a JSON array of trace records.
///
/// Anything that is not an array of records is a [`Error::Structural`] error.
pub fn parse_records(value: Value) -> Result<Vec<TraceRecord>> {
    let Value::Array(items) = value else {
        return Err(Error::structural("expected an array of trace records"));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item)
                .map_err(|e| Error::structural(format!("record {}: {}", i, e)))
        })
        .collect()
}

/// One `{"Step k": [references]}` entry of a dependency record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Vec<Reference>>",
    into = "BTreeMap<String, Vec<Reference>>"
)]
pub struct UsedEntry(pub StepDependencies);

impl TryFrom<BTreeMap<String, Vec<Reference>>> for UsedEntry {
    type Error = String;

    fn try_from(map: BTreeMap<String, Vec<Reference>>) -> std::result::Result<Self, Self::Error> {
        let mut entries = map.into_iter();
        let (label, references) = entries
            .next()
            .ok_or_else(|| "empty dependency entry".to_string())?;
        if entries.next().is_some() {
            return Err("dependency entry must have exactly one step".to_string());
        }
        let step =
            StepId::parse_label(&label).ok_or_else(|| format!("invalid step label '{}'", label))?;
        Ok(Self(StepDependencies::new(step, references)))
    }
}

impl From<UsedEntry> for BTreeMap<String, Vec<Reference>> {
    fn from(entry: UsedEntry) -> Self {
        let mut map = BTreeMap::new();
        map.insert(entry.0.step.to_string(), entry.0.references);
        map
    }
}

/// Per-trace dependency summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRecord {
    #[serde(rename = "Number of Steps")]
    pub number_of_steps: usize,
    #[serde(rename = "Used")]
    pub used: Vec<UsedEntry>,
}

impl DependencyRecord {
    pub fn from_extraction(extraction: &Extraction) -> Self {
        Self {
            number_of_steps: extraction.number_of_steps(),
            used: extraction.steps.iter().cloned().map(UsedEntry).collect(),
        }
    }

    /// The per-step dependency lists, in record order.
    pub fn dependencies(&self) -> Vec<StepDependencies> {
        self.used.iter().map(|e| e.0.clone()).collect()
    }
}

/// Inner object of a [`SequenceRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSet {
    #[serde(rename = "Number of sequences")]
    pub number_of_sequences: usize,
    #[serde(rename = "Sequences")]
    pub sequences: Vec<Sequence>,
}

/// Per-trace record of every valid step order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRecord {
    #[serde(rename = "Reasonable sequence of steps")]
    pub reasonable: SequenceSet,
}

impl SequenceRecord {
    pub fn new(sequences: Vec<Sequence>) -> Self {
        Self {
            reasonable: SequenceSet {
                number_of_sequences: sequences.len(),
                sequences,
            },
        }
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.reasonable.sequences
    }
}

/// A trace laid out as blocks, as produced by reorganization and renumbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputListRecord {
    pub instruction: String,
    pub output_list: Vec<String>,
}

impl OutputListRecord {
    pub fn new(instruction: impl Into<String>, trace: &Trace) -> Self {
        Self {
            instruction: instruction.into(),
            output_list: trace.to_output_list(),
        }
    }
}

/// A rendered instruction-tuning example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub instruction: String,
    pub input: String,
    pub output: String,
}

impl TrainingExample {
    pub fn new(instruction: impl Into<String>, trace: &Trace) -> Self {
        Self {
            instruction: instruction.into(),
            input: String::new(),
            output: trace.render(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dependency_record_shape() {
        let record = DependencyRecord {
            number_of_steps: 2,
            used: vec![
                UsedEntry(StepDependencies::new(StepId::new(1), vec![Reference::Premise(1)])),
                UsedEntry(StepDependencies::new(
                    StepId::new(2),
                    vec![Reference::Step(StepId::new(1))],
                )),
            ],
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "Number of Steps": 2,
                "Used": [{"Step 1": ["Premise 1"]}, {"Step 2": ["Step 1"]}]
            })
        );

        let back: DependencyRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_used_entry_rejects_bad_labels() {
        assert!(serde_json::from_value::<UsedEntry>(json!({"Premise 1": []})).is_err());
        assert!(serde_json::from_value::<UsedEntry>(json!({})).is_err());
        assert!(serde_json::from_value::<UsedEntry>(json!({"Step 1": [], "Step 2": []})).is_err());
    }

    #[test]
    fn test_sequence_record_shape() {
        let record = SequenceRecord::new(vec![Sequence::from(vec![1, 2]), Sequence::from(vec![2, 1])]);
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "Reasonable sequence of steps": {
                    "Number of sequences": 2,
                    "Sequences": [[1, 2], [2, 1]]
                }
            })
        );
    }

    #[test]
    fn test_parse_records() {
        let records = parse_records(json!([
            {"instruction": "Q1", "model_output": "Step 1: x."},
            {"instruction": "Q2", "output": "Step 1: y.", "output_list": ["I", "Step 1: y."]}
        ]))
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].model_output, "Step 1: y.");
        assert!(records[1].output_list.is_some());
    }

    #[test]
    fn test_parse_records_structural_errors() {
        assert!(matches!(
            parse_records(json!({"instruction": "Q"})),
            Err(Error::Structural(_))
        ));
        assert!(matches!(
            parse_records(json!([{"model_output": "Step 1: x."}])),
            Err(Error::Structural(_))
        ));
    }

    #[test]
    fn test_digest_is_stable_and_content_sensitive() {
        let a = TraceRecord::new("Q", "Step 1: x.");
        let b = TraceRecord::new("Q", "Step 1: y.");
        assert_eq!(a.digest(), a.clone().digest());
        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }
}
