use indicatif::{ProgressBar, ProgressStyle};
use photo_tidy_core::{FileOutcome, IngestReport, ProgressReporter, ReconcileReport};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using an indicatif spinner.
///
/// The total file count is unknown while the walker runs, so both passes
/// show a spinner with running counts instead of a bar.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
    done: AtomicUsize,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            done: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_spinner(&self, message: String) {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars(TICK_CHARS);
        pb.set_style(style);
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));

        self.done.store(0, Ordering::Relaxed);
        let mut guard = self.lock();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn set_message(&self, message: String) {
        if let Some(pb) = self.lock().as_ref() {
            pb.set_message(message);
        }
    }

    fn finish(&self) {
        if let Some(pb) = self.lock().take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_ingest_start(&self, source: &Path, destination: &Path) {
        self.start_spinner(format!(
            "Copying {} -> {}",
            source.display(),
            destination.display()
        ));
    }

    fn on_file_done(&self, source: &Path, outcome: &FileOutcome) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        let verb = match outcome {
            FileOutcome::Unsupported => "skipped",
            FileOutcome::Duplicate => "duplicate",
            FileOutcome::AlreadyExists(_) => "exists",
            FileOutcome::Copied { .. } => "copied",
        };
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.set_message(format!("{} files processed ({} {})", done, verb, name));
    }

    fn on_ingest_complete(&self, report: &IngestReport, duration_secs: f64) {
        self.finish();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Copy complete: {} of {} files copied in {:.2}s",
            report.copied, report.discovered, duration_secs
        );
    }

    fn on_reconcile_start(&self, destination: &Path) {
        self.start_spinner(format!("Hashing {}", destination.display()));
    }

    fn on_file_hashed(&self, files_hashed: usize, _path: &Path) {
        self.set_message(format!("Hashing... {} files", files_hashed));
    }

    fn on_reconcile_complete(&self, report: &ReconcileReport, duration_secs: f64) {
        self.finish();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Scan complete: {} files hashed in {:.2}s",
            report.hashed, duration_secs
        );
    }
}
