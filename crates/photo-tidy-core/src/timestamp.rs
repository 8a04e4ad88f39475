use crate::atom;
use crate::candidate::FileRecord;
use crate::metadata::{MetadataReader, TagMap};
use chrono::{Duration, Local, NaiveDateTime};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};

const DATE_TIME_ORIGINAL: &str = "DateTimeOriginal";
const SUB_SEC_TIME_ORIGINAL: &str = "SubSecTimeOriginal";

/// Works out when a file was captured.
///
/// Images use EXIF `DateTimeOriginal` (+ `SubSecTimeOriginal`), videos the
/// `mvhd` creation time, and anything that fails falls back to the file's
/// modification time. The result is memoized on the record.
#[derive(Clone)]
pub struct TimestampResolver {
    metadata: Arc<dyn MetadataReader>,
}

impl TimestampResolver {
    pub fn new(metadata: Arc<dyn MetadataReader>) -> Self {
        Self { metadata }
    }

    pub fn resolve(&self, record: &FileRecord) -> NaiveDateTime {
        record.timestamp_or_init(|| self.compute(record))
    }

    fn compute(&self, record: &FileRecord) -> NaiveDateTime {
        let path = record.path();
        let kind = record.kind();

        let embedded = if kind.is_image() {
            self.from_exif(path)
        } else if kind.is_video() {
            from_container(path)
        } else {
            None
        };

        embedded.unwrap_or_else(|| {
            debug!("Using modification time for {}", path.display());
            record.candidate().modified_local()
        })
    }

    fn from_exif(&self, path: &Path) -> Option<NaiveDateTime> {
        match self.metadata.read_tags(path) {
            Ok(tags) => exif_timestamp(&tags),
            Err(e) => {
                trace!("No EXIF for {}: {}", path.display(), e);
                None
            }
        }
    }
}

fn from_container(path: &Path) -> Option<NaiveDateTime> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            trace!("Cannot open {}: {}", path.display(), e);
            return None;
        }
    };
    match atom::creation_time(&mut BufReader::new(file)) {
        Ok(created) => Some(created.with_timezone(&Local).naive_local()),
        Err(e) => {
            trace!("No movie creation time for {}: {}", path.display(), e);
            None
        }
    }
}

/// Combine `DateTimeOriginal` and `SubSecTimeOriginal` into one instant.
pub fn exif_timestamp(tags: &TagMap) -> Option<NaiveDateTime> {
    let original = parse_exif_datetime(tags.get(DATE_TIME_ORIGINAL)?)?;
    let millis = match tags.get(SUB_SEC_TIME_ORIGINAL) {
        Some(subsec) => parse_subsec_millis(subsec)?,
        None => 0,
    };
    original.checked_add_signed(Duration::milliseconds(millis))
}

/// Parse the EXIF `YYYY:MM:DD HH:MM:SS` form. Dashes are accepted in the date.
pub fn parse_exif_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y:%m:%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

/// Sub-second value as a whole number of milliseconds ("45" is 45ms).
/// Empty or non-numeric values give `None`.
pub fn parse_subsec_millis(value: &str) -> Option<i64> {
    value.parse().ok()
}
