use crate::candidate::{Candidate, FileRecord};
use crate::classify::{self, Classification};
use crate::config::AppConfig;
use crate::copier::{self, CopyOutcome, DEFAULT_BUFFER_SIZE};
use crate::dedupe::{DuplicateCheck, DuplicateDetector, Verdict};
use crate::error::Error;
use crate::layout::{DeviceNameMap, PathBuilder};
use crate::metadata::{ExifReader, MetadataReader};
use crate::pipeline;
use crate::progress::ProgressReporter;
use crate::scanner::Walker;
use crate::storage::Database;
use crate::timestamp::TimestampResolver;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Everything one ingestion run needs, already merged from config and flags.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub source_dir: PathBuf,
    pub destination_dir: PathBuf,
    pub devices: DeviceNameMap,
    pub workers: usize,
    pub duplicate_check: DuplicateCheck,
    pub db_file: Option<PathBuf>,
    pub ignore_patterns: Vec<String>,
    pub buffer_size: usize,
}

impl IngestSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            source_dir: PathBuf::from(&config.source_dir),
            destination_dir: PathBuf::from(&config.destination_dir),
            devices: DeviceNameMap::new(&config.device_names),
            workers: config.workers,
            duplicate_check: config.duplicate_check,
            db_file: (!config.db_file.is_empty()).then(|| PathBuf::from(&config.db_file)),
            ignore_patterns: config.ignore_patterns.clone(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// What happened to one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Unsupported,
    Duplicate,
    AlreadyExists(PathBuf),
    Copied { destination: PathBuf, bytes: u64 },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub discovered: usize,
    pub copied: usize,
    pub already_existing: usize,
    pub duplicates: usize,
    pub unsupported: usize,
    pub bytes_copied: u64,
}

#[derive(Default)]
struct Tally {
    discovered: AtomicUsize,
    copied: AtomicUsize,
    already_existing: AtomicUsize,
    duplicates: AtomicUsize,
    unsupported: AtomicUsize,
    bytes_copied: AtomicU64,
}

impl Tally {
    fn record(&self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Unsupported => self.unsupported.fetch_add(1, Ordering::Relaxed),
            FileOutcome::Duplicate => self.duplicates.fetch_add(1, Ordering::Relaxed),
            FileOutcome::AlreadyExists(_) => self.already_existing.fetch_add(1, Ordering::Relaxed),
            FileOutcome::Copied { bytes, .. } => {
                self.bytes_copied.fetch_add(*bytes, Ordering::Relaxed);
                self.copied.fetch_add(1, Ordering::Relaxed)
            }
        };
    }

    fn report(&self) -> IngestReport {
        IngestReport {
            discovered: self.discovered.load(Ordering::Relaxed),
            copied: self.copied.load(Ordering::Relaxed),
            already_existing: self.already_existing.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            unsupported: self.unsupported.load(Ordering::Relaxed),
            bytes_copied: self.bytes_copied.load(Ordering::Relaxed),
        }
    }
}

/// Per-file steps shared by every worker of one run.
struct FilePipeline<'a> {
    devices: &'a DeviceNameMap,
    builder: PathBuilder,
    resolver: TimestampResolver,
    detector: DuplicateDetector,
    buffer_size: usize,
}

impl FilePipeline<'_> {
    fn process(&self, candidate: Candidate) -> Result<FileOutcome, Error> {
        let kind = match classify::classify(&candidate.path)? {
            Classification::Supported(kind) => kind,
            Classification::Unsupported => {
                debug!("Skipping unsupported file: {}", candidate.path.display());
                return Ok(FileOutcome::Unsupported);
            }
        };

        let record = FileRecord::new(candidate, kind);
        let timestamp = self.resolver.resolve(&record);
        let device = self.devices.resolve(record.path());
        let destination = self.builder.build(
            timestamp,
            device,
            &record.candidate().album(),
            &record.candidate().extension(),
            record.suffix(),
        );

        let month_dir = self.builder.month_dir(timestamp);
        if self.detector.check(&record, &destination, &month_dir)? == Verdict::Duplicate {
            return Ok(FileOutcome::Duplicate);
        }

        match copier::copy_file(record.path(), &destination, self.buffer_size)? {
            CopyOutcome::Copied(bytes) => Ok(FileOutcome::Copied { destination, bytes }),
            CopyOutcome::AlreadyExists => {
                debug!("File already exists: {}", destination.display());
                Ok(FileOutcome::AlreadyExists(destination))
            }
        }
    }
}

/// Copies new media from a source tree into the dated archive layout.
pub struct IngestEngine {
    settings: IngestSettings,
    metadata: Arc<dyn MetadataReader>,
    cancel_token: Arc<AtomicBool>,
}

impl IngestEngine {
    pub fn new(settings: IngestSettings) -> Self {
        Self {
            settings,
            metadata: Arc::new(ExifReader),
            cancel_token: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_metadata_reader(mut self, reader: Arc<dyn MetadataReader>) -> Self {
        self.metadata = reader;
        self
    }

    /// Returns a clone of the cancellation token.
    /// Set it to `true` from another thread to stop an in-progress run.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel_token)
    }

    /// Run one ingestion pass over the source tree.
    ///
    /// Unsupported files, duplicates and existing destinations are counted,
    /// not errors. The first fatal error stops all workers and is returned.
    pub fn ingest(&self, reporter: &dyn ProgressReporter) -> Result<IngestReport, Error> {
        let settings = &self.settings;
        let source = fs::canonicalize(&settings.source_dir).map_err(|e| {
            Error::Other(format!(
                "Cannot read source directory {}: {}",
                settings.source_dir.display(),
                e
            ))
        })?;
        let destination = settings.destination_dir.clone();
        info!(
            "Ingesting {} into {} ({} workers, duplicate check: {})",
            source.display(),
            destination.display(),
            settings.workers,
            settings.duplicate_check
        );
        reporter.on_ingest_start(&source, &destination);

        let detector = self.open_detector()?;
        let file_pipeline = FilePipeline {
            devices: &settings.devices,
            builder: PathBuilder::new(&destination),
            resolver: TimestampResolver::new(Arc::clone(&self.metadata)),
            detector,
            buffer_size: settings.buffer_size,
        };

        let walker = Walker::new(&source).with_ignore_patterns(&settings.ignore_patterns);
        let tally = Tally::default();
        let started = Instant::now();

        let result = pipeline::fan_out(
            settings.workers,
            &self.cancel_token,
            |emit| {
                walker.walk(|candidate| {
                    let found = tally.discovered.fetch_add(1, Ordering::Relaxed) + 1;
                    reporter.on_file_discovered(found, &candidate.path);
                    emit(candidate)
                })?;
                Ok(())
            },
            |candidate: Candidate| {
                let source_path = candidate.path.clone();
                let outcome = file_pipeline.process(candidate)?;
                tally.record(&outcome);
                reporter.on_file_done(&source_path, &outcome);
                Ok(())
            },
        );

        let report = tally.report();
        let elapsed = started.elapsed().as_secs_f64();
        result?;

        info!(
            "Ingest finished in {:.2}s: {} discovered, {} copied, {} existing, {} duplicates, {} unsupported",
            elapsed,
            report.discovered,
            report.copied,
            report.already_existing,
            report.duplicates,
            report.unsupported
        );
        reporter.on_ingest_complete(&report, elapsed);
        Ok(report)
    }

    fn open_detector(&self) -> Result<DuplicateDetector, Error> {
        match self.settings.duplicate_check {
            DuplicateCheck::Off => Ok(DuplicateDetector::Off),
            DuplicateCheck::DestinationScan => Ok(DuplicateDetector::DestinationScan),
            DuplicateCheck::HashIndex => {
                let db_file = self.settings.db_file.as_deref().ok_or_else(|| {
                    Error::Other("db_file is required for the hash-index duplicate check".into())
                })?;
                Ok(DuplicateDetector::hash_index(open_index(db_file)?))
            }
        }
    }
}

fn open_index(db_file: &Path) -> Result<Database, Error> {
    if !db_file.exists() {
        return Err(Error::Other(format!(
            "Hash index {} does not exist, run `init` first",
            db_file.display()
        )));
    }
    Database::open_existing(db_file)
}
