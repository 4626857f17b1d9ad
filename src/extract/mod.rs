//! Dependency extraction from chain-of-thought text.
//!
//! A trace declares its steps with sentences of the form
//!
//! ```text
//! Step 2: Since all dogs are mammals, Rex is a mammal. Premises and steps required: Premise 1 and Step 1.
//! ```
//!
//! [`DependencyExtractor`] segments the text at every `Step <k>:` header, looks
//! for the dependency clause inside each segment and parses it with the
//! clause grammar in [`tokenizer`]. A segment without a well-formed clause
//! contributes no entry and is reported as a [`ParseMiss`].
//!
//! ## Example
//!
//! ```rust
//! use cot_augment::extract::DependencyExtractor;
//!
//! let text = "Step 1: A. Premises and steps required: Premise 1.\n\
//!             Step 2: B. Premises and steps required: Premise 2 and Step 1.";
//! let extraction = DependencyExtractor::new().extract(text);
//! assert_eq!(extraction.number_of_steps(), 2);
//! ```

pub mod tokenizer;
mod types;

pub use types::{Extraction, MissReason, ParseMiss, StepDependencies};

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::types::StepId;

/// Matches a step header (`Step 3:`) opening a line or following the end of
/// a sentence. Group 1 is the header itself, group 2 its number; a `Step k:`
/// in the middle of a sentence is body text.
pub(crate) static STEP_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(?:^|[.!?:]\s+)[ \t]*(Step\s+(\d+)\s*:)").expect("Invalid regex")
});

/// Literal that introduces the dependency clause of a step sentence.
pub const CLAUSE_MARKER: &str = "Premises and steps required:";

/// Extracts per-step dependency lists from trace text.
#[derive(Debug, Clone)]
pub struct DependencyExtractor {
    clause_marker: String,
}

impl Default for DependencyExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyExtractor {
    pub fn new() -> Self {
        Self {
            clause_marker: CLAUSE_MARKER.to_string(),
        }
    }

    /// Use a different clause marker (for traces prompted with other wording).
    pub fn with_clause_marker(mut self, marker: impl Into<String>) -> Self {
        self.clause_marker = marker.into();
        self
    }

    pub fn clause_marker(&self) -> &str {
        &self.clause_marker
    }

    /// Extract the dependencies of every well-formed step sentence in `text`.
    pub fn extract(&self, text: &str) -> Extraction {
        let headers: Vec<_> = STEP_HEADER_RE.captures_iter(text).collect();
        let mut extraction = Extraction::default();

        for (idx, cap) in headers.iter().enumerate() {
            let Some(header) = cap.get(1) else {
                continue;
            };
            let body_end = headers
                .get(idx + 1)
                .and_then(|next| next.get(1))
                .map(|m| m.start())
                .unwrap_or(text.len());
            let body = &text[header.end()..body_end];

            match self.parse_step(&cap[2], body) {
                Ok(deps) => extraction.steps.push(deps),
                Err((step, reason)) => {
                    warn!(
                        "Dropping step sentence at byte {}: {} ({})",
                        header.start(),
                        reason,
                        step.map(|s| s.to_string()).unwrap_or_else(|| cap[2].to_string())
                    );
                    extraction.misses.push(ParseMiss {
                        step,
                        reason,
                        offset: header.start(),
                    });
                }
            }
        }

        debug!(
            "Extracted {} step dependency lists ({} dropped)",
            extraction.steps.len(),
            extraction.misses.len()
        );
        extraction
    }

    fn parse_step(
        &self,
        number: &str,
        body: &str,
    ) -> std::result::Result<StepDependencies, (Option<StepId>, MissReason)> {
        let step = number
            .parse::<u32>()
            .map(StepId::new)
            .map_err(|_| (None, MissReason::InvalidStepNumber))?;

        let clause_start = body
            .find(&self.clause_marker)
            .map(|pos| pos + self.clause_marker.len())
            .ok_or((Some(step), MissReason::MissingClause))?;
        let rest = &body[clause_start..];
        let clause_end = rest
            .find('.')
            .ok_or((Some(step), MissReason::UnterminatedClause))?;

        let references = tokenizer::parse_clause(&rest[..clause_end]);
        Ok(StepDependencies::new(step, references))
    }
}
