use crate::engine::{FileOutcome, IngestReport};
use crate::reconcile::ReconcileReport;
use std::path::Path;

/// Trait for reporting run progress.
///
/// Handed to the engines at run time instead of being looked up globally.
/// Called from worker threads. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_ingest_start(&self, _source: &Path, _destination: &Path) {}
    fn on_file_discovered(&self, _files_found: usize, _path: &Path) {}
    fn on_file_done(&self, _source: &Path, _outcome: &FileOutcome) {}
    fn on_ingest_complete(&self, _report: &IngestReport, _duration_secs: f64) {}
    fn on_reconcile_start(&self, _destination: &Path) {}
    fn on_file_hashed(&self, _files_hashed: usize, _path: &Path) {}
    fn on_reconcile_complete(&self, _report: &ReconcileReport, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
