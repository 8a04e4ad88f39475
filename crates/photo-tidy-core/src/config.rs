use crate::dedupe::DuplicateCheck;
use crate::error::Error;
use config::{Config, File as ConfigFile, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_WORKERS: usize = 4;
const CONFIG_DIR_NAME: &str = "photo-tidy";
const CONFIG_FILE_NAME: &str = "config.json";

/// Settings read from the JSON config file.
///
/// `device_names` maps a device label to the path fragments (or absolute
/// prefixes) that identify it. A `BTreeMap` keeps label iteration order
/// stable between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub db_file: String,
    #[serde(default)]
    pub source_dir: String,
    #[serde(default)]
    pub destination_dir: String,
    #[serde(default)]
    pub device_names: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub duplicate_check: DuplicateCheck,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_file: String::new(),
            source_dir: String::new(),
            destination_dir: String::new(),
            device_names: BTreeMap::new(),
            workers: DEFAULT_WORKERS,
            duplicate_check: DuplicateCheck::default(),
            ignore_patterns: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.db_file.is_empty() {
            return Err(Error::Other("db_file not set".to_string()));
        }
        if self.workers == 0 {
            return Err(Error::Other("workers must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Write the config back as pretty JSON, creating the parent directory.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                create_private_dir(dir)?;
            }
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Other(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        debug!("Config written to {}", path.display());
        Ok(())
    }
}

/// `$HOME/.config/photo-tidy/config.json`, or a relative `config.json` when
/// `HOME` is unset.
pub fn default_config_path() -> PathBuf {
    match env::var_os("HOME") {
        Some(home) => PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME),
        None => PathBuf::from(CONFIG_FILE_NAME),
    }
}

/// Deserialize the config file without validating it.
pub fn read_configuration(path: &Path) -> Result<AppConfig, Error> {
    let builder = Config::builder()
        .add_source(ConfigFile::from(path).format(FileFormat::Json))
        .build()?;
    let config = builder.try_deserialize::<AppConfig>()?;
    debug!("Config read from {}", path.display());
    Ok(config)
}

pub fn load_configuration(path: &Path) -> Result<AppConfig, Error> {
    let config = read_configuration(path)?;
    config.validate()?;
    Ok(config)
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}
