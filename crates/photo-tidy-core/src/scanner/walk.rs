use crate::candidate::Candidate;
use crate::error::Error;
use glob::Pattern;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tracing::{error, trace};
use walkdir::{DirEntry, WalkDir};

/// Thumbnail caches written by phones and file managers.
pub const THUMBNAILS_DIR: &str = ".thumbnails";

/// Sequential directory traversal that yields regular, visible files in
/// file-name order.
///
/// Skips symlinks, files whose name starts with `.`, anything directly inside
/// a `.thumbnails` directory, and paths matching one of the ignore globs.
#[derive(Debug, Clone)]
pub struct Walker {
    root: PathBuf,
    ignore_patterns: Vec<Pattern>,
}

impl Walker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ignore_patterns: Vec::new(),
        }
    }

    /// Invalid globs are logged and dropped.
    pub fn with_ignore_patterns(mut self, globs: &[String]) -> Self {
        self.ignore_patterns = globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Feed every accepted file to `emit` until it returns `Break`.
    /// Returns how many candidates were emitted.
    pub fn walk<F>(&self, mut emit: F) -> Result<usize, Error>
    where
        F: FnMut(Candidate) -> ControlFlow<()>,
    {
        let mut emitted = 0usize;
        let entries = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_ignored(entry.path()));

        for entry in entries {
            let entry = entry?;
            if !self.accepts(&entry) {
                continue;
            }

            let metadata = entry.metadata()?;
            let candidate = Candidate::from_metadata(entry.into_path(), &metadata);
            trace!("Discovered {}", candidate.path.display());
            emitted += 1;
            if emit(candidate).is_break() {
                break;
            }
        }
        Ok(emitted)
    }

    fn accepts(&self, entry: &DirEntry) -> bool {
        if !entry.file_type().is_file() {
            return false;
        }
        if is_hidden(entry.path()) {
            return false;
        }
        let in_thumbnails = entry
            .path()
            .parent()
            .and_then(|p| p.file_name())
            .is_some_and(|dir| dir.to_string_lossy().to_lowercase() == THUMBNAILS_DIR);
        !in_thumbnails
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(path))
    }
}

pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('.'))
}
