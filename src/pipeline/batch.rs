//! Batch augmentation with per-record outcomes and a run report.
//!
//! Records are independent, so a batch can be processed sequentially
//! ([`Augmenter::augment_batch`]) or concurrently with [`ParallelAugmenter`]:
//! - Configurable concurrency limit
//! - Record-level failures are reported without aborting the batch
//! - Order-preserving result collection
//!
//! Both paths seed each record from its index, so they produce the same
//! output for the same base seed.
//!
//! # Example
//!
//! ```rust,ignore
//! use cot_augment::{AugmentConfig, Augmenter, ParallelAugmenter};
//!
//! let augmenter = Augmenter::new(AugmentConfig::new().with_seed(1));
//! let output = ParallelAugmenter::new(augmenter)
//!     .with_max_parallel(8)
//!     .execute(records)
//!     .await?;
//! println!("{} variants", output.report.variants);
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

use super::{Augmentation, Augmenter};
use crate::error::{Error, Result};
use crate::records::TraceRecord;

/// Outcome of one record in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordResult {
    /// Index of this record in the original batch.
    pub index: usize,
    /// Whether the record was augmented.
    pub success: bool,
    pub augmentation: Option<Augmentation>,
    /// Why the record was skipped.
    pub error: Option<String>,
}

impl RecordResult {
    /// Create a successful result.
    pub fn success(index: usize, augmentation: Augmentation) -> Self {
        Self {
            index,
            success: true,
            augmentation: Some(augmentation),
            error: None,
        }
    }

    /// Create a skipped result.
    pub fn skipped(index: usize, error: String) -> Self {
        Self {
            index,
            success: false,
            augmentation: None,
            error: Some(error),
        }
    }
}

/// Summary of one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Base seed the per-record random sources were derived from.
    pub base_seed: u64,
    pub total: usize,
    pub augmented: usize,
    pub skipped: usize,
    /// Renumbered traces produced across the batch.
    pub variants: usize,
    pub rejected_candidates: usize,
    pub parse_misses: usize,
    pub unmapped_references: usize,
}

/// Results of a batch, in original record order, with its report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    pub results: Vec<RecordResult>,
    pub report: BatchReport,
}

impl BatchOutput {
    /// Assemble the output from raw per-record results.
    ///
    /// Fails with the first fatal error (by record index); every other
    /// error becomes a skipped record.
    pub(crate) fn collect(
        mut raw: Vec<(usize, Result<Augmentation>)>,
        started_at: DateTime<Utc>,
        base_seed: u64,
    ) -> Result<Self> {
        // Sort by index to ensure original order
        raw.sort_by_key(|(index, _)| *index);

        let mut results = Vec::with_capacity(raw.len());
        for (index, outcome) in raw {
            match outcome {
                Ok(augmentation) => results.push(RecordResult::success(index, augmentation)),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Skipping record {}: {}", index, e);
                    results.push(RecordResult::skipped(index, e.to_string()));
                }
            }
        }

        let augmentations = || results.iter().filter_map(|r| r.augmentation.as_ref());
        let report = BatchReport {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            base_seed,
            total: results.len(),
            augmented: augmentations().count(),
            skipped: results.iter().filter(|r| !r.success).count(),
            variants: augmentations().map(|a| a.renumbered.len()).sum(),
            rejected_candidates: augmentations()
                .map(|a| a.diagnostics.rejected_candidates.len())
                .sum(),
            parse_misses: augmentations()
                .map(|a| a.diagnostics.parse_misses.len())
                .sum(),
            unmapped_references: augmentations()
                .map(|a| a.diagnostics.unmapped_references.len())
                .sum(),
        };

        info!(
            "Batch {}: {} of {} records augmented, {} variants",
            report.run_id, report.augmented, report.total, report.variants
        );

        Ok(Self { results, report })
    }

    /// Augmentations of the successful records, in order.
    pub fn augmentations(&self) -> Vec<&Augmentation> {
        self.results
            .iter()
            .filter_map(|r| r.augmentation.as_ref())
            .collect()
    }

    /// Indices and reasons of skipped records.
    pub fn skipped(&self) -> Vec<(usize, &str)> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .filter_map(|r| r.error.as_deref().map(|e| (r.index, e)))
            .collect()
    }
}

/// Processes batch records concurrently on tokio's blocking pool.
///
/// Uses a semaphore to bound the number of records in flight.
pub struct ParallelAugmenter {
    augmenter: Arc<Augmenter>,
    max_parallel: usize,
}

impl ParallelAugmenter {
    /// Create a parallel augmenter using the augmenter's configured width.
    pub fn new(augmenter: Augmenter) -> Self {
        Self::from_arc(Arc::new(augmenter))
    }

    /// Create from an Arc'd augmenter.
    pub fn from_arc(augmenter: Arc<Augmenter>) -> Self {
        let max_parallel = augmenter.config().max_parallel.max(1);
        Self {
            augmenter,
            max_parallel,
        }
    }

    /// Set the maximum records in flight.
    pub fn with_max_parallel(mut self, max: usize) -> Self {
        self.max_parallel = max.max(1);
        self
    }

    /// Augment every record, returning results in the original order.
    pub async fn execute(&self, records: Vec<TraceRecord>) -> Result<BatchOutput> {
        let started_at = Utc::now();
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));

        let tasks: Vec<_> = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                let augmenter = Arc::clone(&self.augmenter);
                let semaphore = Arc::clone(&semaphore);

                async move {
                    let outcome = match semaphore.acquire().await {
                        Ok(_permit) => {
                            tokio::task::spawn_blocking(move || augmenter.augment(index, &record))
                                .await
                                .map_err(|e| {
                                    Error::Internal(format!("record {} task failed: {}", index, e))
                                })
                                .and_then(|result| result)
                        }
                        Err(e) => Err(Error::Internal(format!("semaphore closed: {}", e))),
                    };
                    (index, outcome)
                }
            })
            .collect();

        let raw: Vec<(usize, Result<Augmentation>)> = join_all(tasks).await;

        BatchOutput::collect(raw, started_at, self.augmenter.base_seed())
    }
}
