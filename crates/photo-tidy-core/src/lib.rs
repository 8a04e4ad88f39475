pub mod atom;
pub mod candidate;
pub mod classify;
pub mod config;
pub mod copier;
pub mod dedupe;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod layout;
pub mod metadata;
mod pipeline;
pub mod progress;
pub mod raw_pairs;
pub mod reconcile;
pub mod scanner;
pub mod storage;
pub mod timestamp;

pub use config::AppConfig;
pub use dedupe::DuplicateCheck;
pub use engine::{FileOutcome, IngestEngine, IngestReport, IngestSettings};
pub use error::Error;
pub use metadata::{ExifReader, MetadataReader, TagMap};
pub use progress::{ProgressReporter, SilentReporter};
pub use raw_pairs::{prune_raw_pairs, RawPairReport};
pub use reconcile::{ReconcileReport, Reconciler};
