use crate::candidate::FileRecord;
use crate::error::Error;
use crate::hasher;
use crate::storage::Database;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;
use walkdir::WalkDir;

/// Which duplicate check a run uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateCheck {
    /// Only the copier's refuse-to-overwrite rule applies.
    #[default]
    Off,
    /// Look the content hash up in the hash index.
    HashIndex,
    /// Look for a same-named, same-sized file in the destination month.
    DestinationScan,
}

impl fmt::Display for DuplicateCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DuplicateCheck::Off => "off",
            DuplicateCheck::HashIndex => "hash-index",
            DuplicateCheck::DestinationScan => "destination-scan",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Duplicate,
    NotDuplicate,
}

pub enum DuplicateDetector {
    Off,
    HashIndex(Mutex<Database>),
    DestinationScan,
}

impl DuplicateDetector {
    pub fn hash_index(db: Database) -> Self {
        DuplicateDetector::HashIndex(Mutex::new(db))
    }

    /// Decide whether `record`, headed for `destination`, is already archived.
    ///
    /// `month_dir` is the `root/YYYY/MM` directory of `destination`.
    pub fn check(
        &self,
        record: &FileRecord,
        destination: &Path,
        month_dir: &Path,
    ) -> Result<Verdict, Error> {
        match self {
            DuplicateDetector::Off => Ok(Verdict::NotDuplicate),
            DuplicateDetector::HashIndex(db) => {
                let hash = record.hash_or_try_init(|| hasher::content_hash(record.path()))?;
                let db = db
                    .lock()
                    .map_err(|e| Error::Other(format!("Failed to lock hash index: {}", e)))?;
                if db.contains_hash(hash)? {
                    debug!("Hash found in index: {}, {}", record.path().display(), hash);
                    return Ok(Verdict::Duplicate);
                }
                Ok(Verdict::NotDuplicate)
            }
            DuplicateDetector::DestinationScan => {
                let Some(file_name) = destination.file_name() else {
                    return Ok(Verdict::NotDuplicate);
                };
                match find_same_file(month_dir, file_name, record.candidate().size)? {
                    Some(existing) => {
                        debug!(
                            "Duplicate found, not copying: {}, {}",
                            record.path().display(),
                            existing.display()
                        );
                        Ok(Verdict::Duplicate)
                    }
                    None => Ok(Verdict::NotDuplicate),
                }
            }
        }
    }
}

/// Walk `month_dir` for a regular file called `file_name` with `size` bytes.
/// A month that does not exist yet holds no duplicates.
pub fn find_same_file(
    month_dir: &Path,
    file_name: &OsStr,
    size: u64,
) -> Result<Option<std::path::PathBuf>, Error> {
    if !month_dir.is_dir() {
        return Ok(None);
    }

    for entry in WalkDir::new(month_dir) {
        let entry = entry?;
        if !entry.file_type().is_file() || entry.file_name() != file_name {
            continue;
        }
        if entry.metadata()?.len() == size {
            return Ok(Some(entry.into_path()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Candidate;
    use crate::classify::MediaKind;
    use std::fs;
    use std::path::PathBuf;
    use std::time::SystemTime;
    use tempfile::tempdir;

    fn record_for(path: PathBuf) -> FileRecord {
        let size = fs::metadata(&path).unwrap().len();
        let candidate = Candidate {
            path,
            size,
            modified: SystemTime::now(),
            is_regular: true,
        };
        FileRecord::new(candidate, MediaKind::Jpeg)
    }

    #[test]
    fn test_destination_scan_matches_name_and_size() {
        let dest = tempdir().unwrap();
        let month = dest.path().join("2023").join("06");
        let album = month.join("alice").join("misc");
        fs::create_dir_all(&album).unwrap();
        fs::write(album.join("photo.jpg"), vec![1u8; 1000]).unwrap();

        let src = tempdir().unwrap();
        let same = src.path().join("same.jpg");
        fs::write(&same, vec![2u8; 1000]).unwrap();
        let smaller = src.path().join("smaller.jpg");
        fs::write(&smaller, vec![2u8; 999]).unwrap();

        let detector = DuplicateDetector::DestinationScan;
        let target = month.join("bob").join("Recents").join("photo.jpg");
        assert_eq!(
            detector.check(&record_for(same), &target, &month).unwrap(),
            Verdict::Duplicate
        );
        assert_eq!(
            detector.check(&record_for(smaller), &target, &month).unwrap(),
            Verdict::NotDuplicate
        );
    }

    #[test]
    fn test_destination_scan_directly_under_month() {
        let dest = tempdir().unwrap();
        let month = dest.path().join("2023").join("06");
        fs::create_dir_all(&month).unwrap();
        fs::write(month.join("photo.jpg"), vec![0u8; 1000]).unwrap();

        let found = find_same_file(&month, OsStr::new("photo.jpg"), 1000).unwrap();
        assert_eq!(found, Some(month.join("photo.jpg")));
        assert!(find_same_file(&month, OsStr::new("other.jpg"), 1000)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_destination_scan_missing_month() {
        let dest = tempdir().unwrap();
        let month = dest.path().join("1999").join("01");
        assert!(find_same_file(&month, OsStr::new("photo.jpg"), 1).unwrap().is_none());
    }

    #[test]
    fn test_hash_index_lookup() {
        let src = tempdir().unwrap();
        let known = src.path().join("known.jpg");
        fs::write(&known, b"already archived bytes").unwrap();
        let fresh = src.path().join("fresh.jpg");
        fs::write(&fresh, b"brand new bytes").unwrap();

        let db = Database::open_in_memory().unwrap();
        let hash = hasher::content_hash(&known).unwrap();
        db.insert_hash("2020/01/x/y/20200101-000000000.jpg", &hash)
            .unwrap();
        let detector = DuplicateDetector::hash_index(db);

        let target = Path::new("/archive/2023/06/a/b/c.jpg");
        let month = Path::new("/archive/2023/06");
        let known_record = record_for(known);
        assert_eq!(
            detector.check(&known_record, target, month).unwrap(),
            Verdict::Duplicate
        );
        assert_eq!(
            detector.check(&record_for(fresh), target, month).unwrap(),
            Verdict::NotDuplicate
        );
    }

    #[test]
    fn test_off_never_reports_duplicates() {
        let src = tempdir().unwrap();
        let path = src.path().join("a.jpg");
        fs::write(&path, b"x").unwrap();
        let detector = DuplicateDetector::Off;
        assert_eq!(
            detector
                .check(&record_for(path), Path::new("/x/a.jpg"), Path::new("/x"))
                .unwrap(),
            Verdict::NotDuplicate
        );
    }
}
