use crate::classify::MediaKind;
use chrono::{DateTime, Local, NaiveDateTime};
use std::cell::OnceCell;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A filesystem entry discovered by the walker.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
    pub is_regular: bool,
}

impl Candidate {
    pub fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        Self {
            path,
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            is_regular: metadata.is_file(),
        }
    }

    /// Modification time as local wall-clock time.
    pub fn modified_local(&self) -> NaiveDateTime {
        DateTime::<Local>::from(self.modified).naive_local()
    }

    /// Name of the directory that directly contains the file.
    pub fn album(&self) -> String {
        album_of(&self.path)
    }

    /// Extension including its leading dot, or an empty string.
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default()
    }
}

pub fn album_of(path: &Path) -> String {
    path.parent()
        .and_then(|p| p.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Per-worker view of a candidate with lazily resolved fields.
///
/// Owned by exactly one worker for the duration of its pipeline step. The
/// timestamp and hash cells are written at most once.
#[derive(Debug)]
pub struct FileRecord {
    candidate: Candidate,
    kind: MediaKind,
    suffix: Option<String>,
    timestamp: OnceCell<NaiveDateTime>,
    hash: OnceCell<String>,
}

impl FileRecord {
    pub fn new(candidate: Candidate, kind: MediaKind) -> Self {
        Self {
            candidate,
            kind,
            suffix: None,
            timestamp: OnceCell::new(),
            hash: OnceCell::new(),
        }
    }

    /// Tag generated variants so they land next to the original without colliding.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        self.suffix = (!suffix.is_empty()).then_some(suffix);
        self
    }

    pub fn candidate(&self) -> &Candidate {
        &self.candidate
    }

    pub fn path(&self) -> &Path {
        &self.candidate.path
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    pub fn timestamp_or_init(&self, resolve: impl FnOnce() -> NaiveDateTime) -> NaiveDateTime {
        *self.timestamp.get_or_init(resolve)
    }

    pub fn resolved_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp.get().copied()
    }

    pub fn hash_or_try_init<E>(
        &self,
        compute: impl FnOnce() -> Result<String, E>,
    ) -> Result<&str, E> {
        if let Some(hash) = self.hash.get() {
            return Ok(hash);
        }
        let hash = compute()?;
        Ok(self.hash.get_or_init(|| hash))
    }
}
