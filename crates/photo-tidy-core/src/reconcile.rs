use crate::candidate::Candidate;
use crate::classify::{self, Classification};
use crate::error::Error;
use crate::hasher;
use crate::pipeline;
use crate::progress::ProgressReporter;
use crate::scanner::Walker;
use crate::storage::{Database, InsertOutcome};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub discovered: usize,
    pub unsupported: usize,
    pub hashed: usize,
    pub inserted: usize,
    pub already_recorded: usize,
}

#[derive(Default)]
struct Tally {
    discovered: AtomicUsize,
    unsupported: AtomicUsize,
    hashed: AtomicUsize,
    inserted: AtomicUsize,
    already_recorded: AtomicUsize,
}

/// Rebuilds the hash index from what is already in the archive.
///
/// Every supported file under the destination root is hashed and recorded
/// with its path relative to that root. Content that is already indexed is
/// counted, not treated as an error.
pub struct Reconciler {
    destination_dir: PathBuf,
    db_file: PathBuf,
    workers: usize,
    ignore_patterns: Vec<String>,
    cancel_token: Arc<AtomicBool>,
}

impl Reconciler {
    pub fn new(destination_dir: impl Into<PathBuf>, db_file: impl Into<PathBuf>) -> Self {
        Self {
            destination_dir: destination_dir.into(),
            db_file: db_file.into(),
            workers: crate::config::DEFAULT_WORKERS,
            ignore_patterns: Vec::new(),
            cancel_token: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel_token)
    }

    pub fn reconcile(&self, reporter: &dyn ProgressReporter) -> Result<ReconcileReport, Error> {
        let root = fs::canonicalize(&self.destination_dir).map_err(|e| {
            Error::Other(format!(
                "Cannot read destination directory {}: {}",
                self.destination_dir.display(),
                e
            ))
        })?;
        info!(
            "Recording hashes under {} into {}",
            root.display(),
            self.db_file.display()
        );
        reporter.on_reconcile_start(&root);

        let db = Mutex::new(Database::open(&self.db_file)?);
        let walker = Walker::new(&root).with_ignore_patterns(&self.ignore_patterns);
        let tally = Tally::default();
        let started = Instant::now();

        let result = pipeline::fan_out(
            self.workers,
            &self.cancel_token,
            |emit| {
                walker.walk(|candidate| {
                    tally.discovered.fetch_add(1, Ordering::Relaxed);
                    emit(candidate)
                })?;
                Ok(())
            },
            |candidate: Candidate| {
                let path = candidate.path;
                if classify::classify(&path)? == Classification::Unsupported {
                    debug!("Skipping unsupported file: {}", path.display());
                    tally.unsupported.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                }

                let hash = hasher::content_hash(&path)?;
                let hashed = tally.hashed.fetch_add(1, Ordering::Relaxed) + 1;
                reporter.on_file_hashed(hashed, &path);

                let relative = relative_key(&root, &path);
                let outcome = db
                    .lock()
                    .map_err(|e| Error::Other(format!("Failed to lock hash index: {}", e)))?
                    .insert_hash(&relative, &hash)?;
                match outcome {
                    InsertOutcome::Inserted => {
                        debug!("Recorded {} {}", hash, relative);
                        tally.inserted.fetch_add(1, Ordering::Relaxed);
                    }
                    InsertOutcome::AlreadyRecorded => {
                        debug!("Hash already recorded: {} {}", hash, relative);
                        tally.already_recorded.fetch_add(1, Ordering::Relaxed);
                    }
                }
                Ok(())
            },
        );

        let report = ReconcileReport {
            discovered: tally.discovered.load(Ordering::Relaxed),
            unsupported: tally.unsupported.load(Ordering::Relaxed),
            hashed: tally.hashed.load(Ordering::Relaxed),
            inserted: tally.inserted.load(Ordering::Relaxed),
            already_recorded: tally.already_recorded.load(Ordering::Relaxed),
        };
        let elapsed = started.elapsed().as_secs_f64();
        result?;

        info!(
            "Reconcile finished in {:.2}s: {} hashed, {} inserted, {} already recorded",
            elapsed, report.hashed, report.inserted, report.already_recorded
        );
        reporter.on_reconcile_complete(&report, elapsed);
        Ok(report)
    }
}

/// Index key for `path`: relative to `root`, `/`-separated.
fn relative_key(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_key() {
        let root = Path::new("/archive");
        assert_eq!(
            relative_key(root, Path::new("/archive/2023/06/alice/misc/a.jpg")),
            "2023/06/alice/misc/a.jpg"
        );
    }
}
