//! The block structure of a reasoning trace.
//!
//! A trace is an intro block, an ordered run of step blocks and an optional
//! conclusion block starting with `Final Conclusion`. As an `output_list` it
//! is laid out as `[intro, step 1, ..., step N, conclusion]`, so step `k`
//! lives at index `k`. Only the step blocks are ever reordered.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::extract::STEP_HEADER_RE;
use crate::types::StepId;

/// Marker that opens the conclusion block.
pub const CONCLUSION_MARKER: &str = "Final Conclusion";

/// A trace split into intro, step blocks and conclusion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub intro: String,
    pub steps: Vec<String>,
    pub conclusion: Option<String>,
}

impl Trace {
    pub fn new(intro: impl Into<String>, steps: Vec<String>, conclusion: Option<String>) -> Self {
        Self {
            intro: intro.into(),
            steps,
            conclusion,
        }
    }

    /// Read a trace from an `output_list`.
    ///
    /// Element 0 is the intro. The last element is the conclusion when it
    /// starts with [`CONCLUSION_MARKER`]; everything in between is a step block.
    pub fn from_output_list(list: &[String]) -> Result<Self> {
        let Some((intro, rest)) = list.split_first() else {
            return Err(Error::insufficient_input("output_list is empty"));
        };

        let (steps, conclusion) = match rest.split_last() {
            Some((last, middle)) if last.trim_start().starts_with(CONCLUSION_MARKER) => {
                (middle.to_vec(), Some(last.clone()))
            }
            _ => (rest.to_vec(), None),
        };

        Ok(Self {
            intro: intro.clone(),
            steps,
            conclusion,
        })
    }

    /// Lay the trace out as an `output_list`.
    pub fn to_output_list(&self) -> Vec<String> {
        let mut list = Vec::with_capacity(self.steps.len() + 2);
        list.push(self.intro.clone());
        list.extend(self.steps.iter().cloned());
        if let Some(conclusion) = &self.conclusion {
            list.push(conclusion.clone());
        }
        list
    }

    /// Split a model output into blocks at every `Step <k>:` header that
    /// opens a line or a sentence.
    ///
    /// Text before the first header becomes the intro, and everything from
    /// the first `Final Conclusion` on becomes the conclusion.
    pub fn segment(output: &str) -> Self {
        let (body, conclusion) = match output.find(CONCLUSION_MARKER) {
            Some(pos) => (&output[..pos], Some(output[pos..].trim().to_string())),
            None => (output, None),
        };

        let starts: Vec<usize> = STEP_HEADER_RE
            .captures_iter(body)
            .filter_map(|cap| cap.get(1))
            .map(|header| header.start())
            .collect();

        let intro_end = starts.first().copied().unwrap_or(body.len());
        let steps = starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = starts.get(i + 1).copied().unwrap_or(body.len());
                body[start..end].trim().to_string()
            })
            .filter(|block| !block.is_empty())
            .collect();

        Self {
            intro: body[..intro_end].trim().to_string(),
            steps,
            conclusion,
        }
    }

    /// Join the blocks into one output text: the intro and first step on
    /// adjacent lines, later steps separated by blank lines, and the
    /// conclusion on its own line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut steps = self.steps.iter();

        if let Some(first) = steps.next() {
            if !self.intro.is_empty() {
                out.push_str(&self.intro);
                out.push('\n');
            }
            out.push_str(first);
        } else {
            out.push_str(&self.intro);
        }

        for step in steps {
            out.push_str("\n\n");
            out.push_str(step);
        }

        if let Some(conclusion) = &self.conclusion {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(conclusion);
        }

        out
    }

    /// Number of step blocks.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// The block of step `id` in the original numbering (step k is block k).
    pub fn step_block(&self, id: StepId) -> Option<&str> {
        let index = (id.get() as usize).checked_sub(1)?;
        self.steps.get(index).map(String::as_str)
    }

    /// A copy of this trace with a different step region.
    pub fn with_steps(&self, steps: Vec<String>) -> Self {
        Self {
            intro: self.intro.clone(),
            steps,
            conclusion: self.conclusion.clone(),
        }
    }
}
