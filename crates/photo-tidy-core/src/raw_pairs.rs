//! Cleanup of camera RAW+JPEG pairs: when a `.cr2` shares its path stem with
//! a JPEG, the RAW half is removed.

use crate::error::Error;
use crate::scanner::Walker;
use std::collections::HashMap;
use std::fs;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const PAIRED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "cr2"];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RawPairReport {
    /// RAW files deleted, or that would be deleted on a dry run.
    pub removed: Vec<PathBuf>,
    /// Same-stem pairs with no RAW half to drop.
    pub unresolved: Vec<(PathBuf, PathBuf)>,
}

/// Walk `dir` and delete the `.cr2` half of every RAW+JPEG pair.
///
/// Hidden and empty files are ignored. Extensions compare case-insensitively.
/// With `dry_run` nothing is deleted but the report is the same.
pub fn prune_raw_pairs(dir: &Path, dry_run: bool) -> Result<RawPairReport, Error> {
    let mut candidates = Vec::new();
    Walker::new(dir).walk(|candidate| {
        if candidate.size > 0 && paired_extension(&candidate.path).is_some() {
            candidates.push(candidate.path);
        }
        ControlFlow::Continue(())
    })?;

    let mut report = RawPairReport::default();
    let mut by_stem: HashMap<PathBuf, PathBuf> = HashMap::new();

    for path in candidates {
        let stem = path.with_extension("");
        let Some(existing) = by_stem.get(&stem).cloned() else {
            by_stem.insert(stem, path);
            continue;
        };

        match (is_raw(&existing), is_raw(&path)) {
            (true, false) => {
                remove(&existing, dry_run)?;
                report.removed.push(existing);
                by_stem.insert(stem, path);
            }
            (false, true) => {
                remove(&path, dry_run)?;
                report.removed.push(path);
            }
            _ => {
                warn!(
                    "Need to resolve by hand: {}, {}",
                    existing.display(),
                    path.display()
                );
                report.unresolved.push((existing, path));
            }
        }
    }

    Ok(report)
}

fn paired_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    PAIRED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

fn is_raw(path: &Path) -> bool {
    paired_extension(path).as_deref() == Some("cr2")
}

fn remove(path: &Path, dry_run: bool) -> Result<(), Error> {
    if dry_run {
        info!("Would delete {}", path.display());
        return Ok(());
    }
    info!("Deleting {}", path.display());
    fs::remove_file(path)
        .map_err(|e| Error::Other(format!("Failed deleting {}: {}", path.display(), e)))
}
