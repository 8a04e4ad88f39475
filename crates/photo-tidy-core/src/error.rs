use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("{} is not a regular file", .0.display())]
    NotRegularFile(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}
