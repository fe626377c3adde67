//! Sequential batch processing with progress reporting.
//!
//! Files are processed one after another; a failure is recorded in the
//! report and the batch moves on.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use smeta_engine::DialectConfig;

use crate::archive::InputFile;
use crate::error::ProcessError;
use crate::processor::{process_bytes, Processed};

// ============================================================================
// Progress
// ============================================================================

/// Receives progress events from [`run_batch`].
pub trait ProgressSink {
    fn started(&self, _total: usize) {}
    fn file_started(&self, _index: usize, _name: &str) {}
    fn file_finished(&self, _index: usize, _name: &str, _ok: bool) {}
}

/// Ignores every event.
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Atomic counters a polling reader (another thread, a status line) can
/// observe while the batch runs.
#[derive(Debug, Default)]
pub struct ProgressCounter {
    total: AtomicUsize,
    processed: AtomicUsize,
    failed: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total.load(Ordering::Acquire),
            processed: self.processed.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
        }
    }

    pub fn is_finished(&self) -> bool {
        let s = self.snapshot();
        s.processed + s.failed >= s.total
    }
}

impl ProgressSink for ProgressCounter {
    fn started(&self, total: usize) {
        self.total.store(total, Ordering::Release);
        self.processed.store(0, Ordering::Release);
        self.failed.store(0, Ordering::Release);
    }

    fn file_finished(&self, _index: usize, _name: &str, ok: bool) {
        if ok {
            self.processed.fetch_add(1, Ordering::AcqRel);
        } else {
            self.failed.fetch_add(1, Ordering::AcqRel);
        }
    }
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug)]
pub struct FileOutcome {
    pub name: String,
    pub result: Result<Processed, ProcessError>,
}

#[derive(Debug)]
pub struct BatchReport {
    pub dialect: String,
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<FileOutcome>,
}

/// Serializable per-file line of a report.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeSummary {
    pub file: String,
    pub ok: bool,
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &Processed> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &ProcessError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.name.as_str(), e)))
    }

    pub fn success_count(&self) -> usize {
        self.succeeded().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.success_count() == 0
    }

    pub fn is_partial(&self) -> bool {
        self.success_count() > 0 && self.failure_count() > 0
    }

    pub fn total_rows(&self) -> usize {
        self.succeeded().map(|p| p.extraction.rows.len()).sum()
    }

    pub fn summaries(&self) -> Vec<OutcomeSummary> {
        self.outcomes
            .iter()
            .map(|o| match &o.result {
                Ok(p) => OutcomeSummary {
                    file: o.name.clone(),
                    ok: true,
                    rows: p.extraction.rows.len(),
                    error: None,
                },
                Err(e) => OutcomeSummary {
                    file: o.name.clone(),
                    ok: false,
                    rows: 0,
                    error: Some(e.to_string()),
                },
            })
            .collect()
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        let mut s = format!(
            "{} of {} file(s) processed, {} row(s)",
            self.success_count(),
            self.outcomes.len(),
            self.total_rows()
        );
        if self.is_partial() {
            s.push_str("; some files failed");
        }
        s
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Process every input with one dialect, strictly in order.
pub fn run_batch(inputs: Vec<InputFile>, dialect: &DialectConfig, progress: &dyn ProgressSink) -> BatchReport {
    let started_at = Utc::now();
    let total = inputs.len();
    progress.started(total);

    let mut outcomes = Vec::with_capacity(total);
    for (index, input) in inputs.into_iter().enumerate() {
        info!("processing file {} of {}: {}", index + 1, total, input.name);
        progress.file_started(index, &input.name);

        let result = process_bytes(&input.name, &input.bytes, dialect);
        if let Err(e) = &result {
            warn!("{}: {}", input.name, e);
        }
        progress.file_finished(index, &input.name, result.is_ok());
        outcomes.push(FileOutcome { name: input.name, result });
    }

    BatchReport { dialect: dialect.name.clone(), started_at, outcomes }
}
