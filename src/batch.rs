//! Batch orchestration.
//!
//! [`Converter::run_batch`] drives the conversion engine across every
//! registered source, strictly one item at a time:
//!
//! ```text
//! acquire run guard ── Busy if already held
//! lock registry, reset results
//! for each source (1-indexed):
//!     cancelled?  → stop
//!     convert_one (optionally under a timeout)
//!         Ok   → append result
//!         Err  → log, count, continue
//!     emit Progress
//!     pace (not after the last item)
//! emit Finished, release guard
//! ```
//!
//! A failing item never aborts the run, and a fully failed run is still an
//! `Ok` summary. The guard is released on every exit path, including a panic
//! unwinding through the run.

use crate::convert::ConvertError;
use crate::converter::Converter;
use crate::imaging::ImageBackend;
use crate::output::progress_label;
use crate::types::{ConversionConfig, RecordId, ResultRecord, SourceRecord};
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("a batch is already running")]
    Busy,
}

/// Aggregate outcome of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
    /// The run stopped early at a cancellation request.
    pub cancelled: bool,
}

impl BatchSummary {
    /// Sources were registered but none converted.
    pub fn is_total_failure(&self) -> bool {
        self.total > 0 && self.succeeded == 0
    }

    /// Items that were never attempted because of cancellation.
    pub fn skipped(&self) -> usize {
        self.total - self.succeeded - self.failed
    }
}

/// What happened to one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Converted { result_id: RecordId },
    Failed { reason: String },
}

/// Emitted after each item, success or failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub completed: usize,
    pub total: usize,
    /// 1-based position of the item just processed.
    pub current_index: usize,
    /// `Converting <i> of <total>`.
    pub label: String,
    pub name: String,
    pub outcome: ItemOutcome,
}

impl ProgressEvent {
    /// Completion as a whole percentage.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        (self.completed as f64 * 100.0 / self.total as f64).round() as u8
    }
}

/// Events sent to the presentation layer during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Started { total: usize },
    Progress(ProgressEvent),
    Finished(BatchSummary),
}

/// Run exclusion and cancellation in one atomic word, so a cancel request
/// can only land on a run that is actually in progress.
#[derive(Debug, Default)]
pub(crate) struct RunState(AtomicU8);

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const CANCELLING: u8 = 2;

impl RunState {
    /// Start a run, or `None` if one is already in progress.
    pub(crate) fn try_start(&self) -> Option<RunGuard<'_>> {
        self.0
            .compare_exchange(IDLE, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RunGuard(self))
    }

    pub(crate) fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst) != IDLE
    }

    /// Mark the current run cancelled. Returns `false` when idle.
    pub(crate) fn request_cancel(&self) -> bool {
        match self
            .0
            .compare_exchange(RUNNING, CANCELLING, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => true,
            Err(current) => current == CANCELLING,
        }
    }
}

/// Holds the run for its lifetime. Dropping it (normal return, early
/// return, panic unwind, or the run future being dropped) returns to idle.
pub(crate) struct RunGuard<'a>(&'a RunState);

impl RunGuard<'_> {
    fn cancel_requested(&self) -> bool {
        (self.0).0.load(Ordering::SeqCst) == CANCELLING
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        (self.0).0.store(IDLE, Ordering::SeqCst);
    }
}

fn emit(progress: &Option<Sender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = progress {
        // A dropped receiver only means nobody is watching.
        let _ = tx.send(event);
    }
}

impl<B: ImageBackend> Converter<B> {
    /// Convert every registered source under `config`.
    ///
    /// Previous results are released before the first item. Returns
    /// [`BatchError::Busy`] without touching the registry if a run is
    /// already in progress.
    pub async fn run_batch(
        &self,
        config: &ConversionConfig,
        progress: Option<Sender<BatchEvent>>,
    ) -> Result<BatchSummary, BatchError> {
        let guard = self.run_state.try_start().ok_or(BatchError::Busy)?;

        let mut registry = self.registry.lock().await;
        registry.reset_results();

        let total = registry.sources().len();
        let pacing = self.settings.batch.pacing();
        info!(total, format = %config.output_format, "batch started");
        emit(&progress, BatchEvent::Started { total });

        let mut summary = BatchSummary {
            total,
            ..BatchSummary::default()
        };
        for index in 0..total {
            if guard.cancel_requested() {
                info!(remaining = total - index, "batch cancelled");
                summary.cancelled = true;
                break;
            }

            let source = &registry.sources()[index];
            let name = source.original_name.clone();
            let converted = self.convert_item(source, config).await;
            let outcome = match converted {
                Ok(result) => {
                    debug!(%name, output = %result.name, size_bytes = result.size_bytes, "converted");
                    summary.succeeded += 1;
                    let result_id = result.id;
                    registry.append_result(result);
                    ItemOutcome::Converted { result_id }
                }
                Err(e) => {
                    warn!(%name, error = %e, "conversion failed, skipping");
                    summary.failed += 1;
                    ItemOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            let current_index = index + 1;
            emit(
                &progress,
                BatchEvent::Progress(ProgressEvent {
                    completed: current_index,
                    total,
                    current_index,
                    label: progress_label(current_index, total),
                    name,
                    outcome,
                }),
            );

            if current_index < total && !pacing.is_zero() {
                tokio::time::sleep(pacing).await;
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            total = summary.total,
            cancelled = summary.cancelled,
            "batch finished"
        );
        emit(&progress, BatchEvent::Finished(summary));
        Ok(summary)
    }

    async fn convert_item(
        &self,
        source: &SourceRecord,
        config: &ConversionConfig,
    ) -> Result<ResultRecord, ConvertError> {
        let work = self.engine.convert_one(source, config);
        match self.settings.batch.item_timeout() {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .unwrap_or_else(|_| {
                    Err(ConvertError::Timeout {
                        name: source.original_name.clone(),
                        limit,
                    })
                }),
            None => work.await,
        }
    }
}
