//! Rewriting literal step numbers after a reorganization.
//!
//! After step blocks move, every step number written in a step block must
//! name the step's new position. Two citation forms are recognised, both
//! case-insensitively:
//!
//! - Inside the dependency clause, the clause grammar of
//!   [`crate::extract::tokenizer`]: `step 3`, `Steps 1, 2 and 4`, `Step 1, 2`.
//! - Elsewhere (headers and prose), `Step k` on its own or a plural
//!   `Steps 1, 2 and 4`. A number after `Step 1,` in prose is not a citation.
//!
//! Each number is matched as a whole digit run and only that span is
//! replaced, so `Step 10` is never read as `Step 1` followed by a `0`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::warn;

use crate::extract::CLAUSE_MARKER;
use crate::reorganize::Reorganized;
use crate::trace::Trace;
use crate::types::{Sequence, StepId};

/// A step group of the dependency clause: a `step`/`steps` keyword, a number,
/// and numbers following one or more separators.
static CLAUSE_CITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bsteps?\s*\d+(?:(?:\s*(?:[,;]|\band\b))+\s*\d+)*").expect("Invalid regex")
});

/// A step citation in prose: `Step 3`, or `Steps 1, 2 and 4`.
static PROSE_CITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:steps\s+\d+(?:\s*(?:,|\band\b)\s*\d+)*|step\s+\d+)").expect("Invalid regex")
});

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("Invalid regex"));

/// A step number that has no new position and was left as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmappedReference {
    /// 1-based index of the step block containing the reference.
    pub block: usize,
    /// The number as written.
    pub literal: String,
}

/// A reorganized trace with its step numbers rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renumbered {
    pub sequence: Sequence,
    pub trace: Trace,
    pub unmapped: Vec<UnmappedReference>,
}

/// Rewrites step-number references to match a new step order.
#[derive(Debug, Clone)]
pub struct StepRenumberer {
    clause_marker: String,
}

impl Default for StepRenumberer {
    fn default() -> Self {
        Self::new()
    }
}

impl StepRenumberer {
    pub fn new() -> Self {
        Self {
            clause_marker: CLAUSE_MARKER.to_string(),
        }
    }

    /// Use the clause marker the dependencies were extracted with.
    pub fn with_clause_marker(mut self, marker: impl Into<String>) -> Self {
        self.clause_marker = marker.into();
        self
    }

    /// Renumber every step block of a reorganized trace.
    ///
    /// The old-to-new map comes from the order used to reorganize: the step
    /// at position `i` (1-based) was originally `sequence[i - 1]`. The intro
    /// and conclusion are left as they are.
    pub fn renumber(&self, reorganized: &Reorganized) -> Renumbered {
        let map = reorganized.sequence.position_map();
        let mut unmapped = Vec::new();

        let steps = reorganized
            .trace
            .steps
            .iter()
            .enumerate()
            .map(|(i, block)| {
                let (text, missing) = self.renumber_block(block, &map);
                for literal in missing {
                    warn!("Step number {} in block {} has no new position", literal, i + 1);
                    unmapped.push(UnmappedReference {
                        block: i + 1,
                        literal,
                    });
                }
                text
            })
            .collect();

        Renumbered {
            sequence: reorganized.sequence.clone(),
            trace: reorganized.trace.with_steps(steps),
            unmapped,
        }
    }

    /// Rewrite every step citation in one block through `map`.
    ///
    /// The clause runs from the marker to the first `.` after it, as in
    /// extraction. Returns the new text and the literals of numbers absent
    /// from the map, which are left verbatim.
    pub fn renumber_block(&self, block: &str, map: &HashMap<StepId, u32>) -> (String, Vec<String>) {
        let mut out = String::with_capacity(block.len());
        let mut unmapped = Vec::new();

        let clause = block.find(&self.clause_marker).map(|pos| {
            let start = pos + self.clause_marker.len();
            let end = block[start..].find('.').map_or(block.len(), |e| start + e);
            (start, end)
        });

        match clause {
            Some((start, end)) => {
                rewrite(&block[..start], &PROSE_CITATION_RE, map, &mut out, &mut unmapped);
                rewrite(&block[start..end], &CLAUSE_CITATION_RE, map, &mut out, &mut unmapped);
                rewrite(&block[end..], &PROSE_CITATION_RE, map, &mut out, &mut unmapped);
            }
            None => rewrite(block, &PROSE_CITATION_RE, map, &mut out, &mut unmapped),
        }

        (out, unmapped)
    }
}

/// Append `text` to `out` with the numbers of every `citation` match mapped.
fn rewrite(
    text: &str,
    citation: &Regex,
    map: &HashMap<StepId, u32>,
    out: &mut String,
    unmapped: &mut Vec<String>,
) {
    let mut last = 0;

    for found in citation.find_iter(text) {
        out.push_str(&text[last..found.start()]);

        let span = found.as_str();
        let mut span_last = 0;
        for number in NUMBER_RE.find_iter(span) {
            out.push_str(&span[span_last..number.start()]);
            let new_number = number
                .as_str()
                .parse::<u32>()
                .ok()
                .and_then(|n| map.get(&StepId::new(n)));
            match new_number {
                Some(n) => out.push_str(&n.to_string()),
                None => {
                    out.push_str(number.as_str());
                    unmapped.push(number.as_str().to_string());
                }
            }
            span_last = number.end();
        }
        out.push_str(&span[span_last..]);

        last = found.end();
    }
    out.push_str(&text[last..]);
}
