use chrono::{Datelike, NaiveDateTime};
use regex::Regex;
use std::path::PathBuf;

pub const RECENTS_ALBUM: &str = "Recents";

/// Camera-generated folder names that collapse into the "Recents" album, in
/// the order they are tried.
const CAMERA_ALBUM_PATTERNS: [&str; 3] = [
    r"^1\d{2}APPLE$",
    r"^1\d{2}CANON$",
    r"^\d{4}-\d{2}-\d{2}$",
];

#[derive(Debug, Clone)]
pub struct AlbumRule {
    pattern: Regex,
    album: String,
}

impl AlbumRule {
    pub fn new(pattern: &str, album: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            album: album.into(),
        })
    }
}

/// Ordered album rewrites. The first matching rule wins.
#[derive(Debug, Clone)]
pub struct AlbumRules(Vec<AlbumRule>);

impl AlbumRules {
    pub fn new(rules: Vec<AlbumRule>) -> Self {
        Self(rules)
    }

    pub fn rewrite<'a>(&'a self, album: &'a str) -> &'a str {
        self.0
            .iter()
            .find(|rule| rule.pattern.is_match(album))
            .map_or(album, |rule| rule.album.as_str())
    }
}

impl Default for AlbumRules {
    fn default() -> Self {
        let rules = CAMERA_ALBUM_PATTERNS
            .iter()
            .map(|pattern| {
                AlbumRule::new(pattern, RECENTS_ALBUM).expect("camera album patterns are valid")
            })
            .collect();
        Self(rules)
    }
}

/// Builds destination paths under an archive root. Pure: the same inputs
/// always give the same path.
#[derive(Debug, Clone)]
pub struct PathBuilder {
    root: PathBuf,
    albums: AlbumRules,
}

impl PathBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_album_rules(root, AlbumRules::default())
    }

    pub fn with_album_rules(root: impl Into<PathBuf>, albums: AlbumRules) -> Self {
        Self {
            root: root.into(),
            albums,
        }
    }

    /// `root/YYYY/MM`, the directory the destination-scan check walks.
    pub fn month_dir(&self, timestamp: NaiveDateTime) -> PathBuf {
        self.root
            .join(format!("{:04}", timestamp.year()))
            .join(format!("{:02}", timestamp.month()))
    }

    /// `root/YYYY/MM/device/album/YYYYMMDD-HHMMSSmmm[-suffix]ext`.
    ///
    /// `extension` is appended verbatim and should carry its leading dot.
    /// Empty device labels and albums are left out of the path.
    pub fn build(
        &self,
        timestamp: NaiveDateTime,
        device: &str,
        album: &str,
        extension: &str,
        suffix: Option<&str>,
    ) -> PathBuf {
        let mut path = self.month_dir(timestamp);
        for component in [device, self.albums.rewrite(album)] {
            if !component.is_empty() {
                path.push(component);
            }
        }

        let mut file_name = timestamp.format("%Y%m%d-%H%M%S%3f").to_string();
        if let Some(suffix) = suffix.filter(|s| !s.is_empty()) {
            file_name.push('-');
            file_name.push_str(suffix);
        }
        file_name.push_str(extension);
        path.push(file_name);
        path
    }
}
