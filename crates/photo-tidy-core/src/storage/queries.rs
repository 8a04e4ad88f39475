use super::models::HashEntry;
use super::sqlite::Database;
use rusqlite::{params, ErrorCode, OptionalExtension, Result};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The hash is already present; the row was left untouched.
    AlreadyRecorded,
}

impl Database {
    /// Record `hash` for `filepath`. A unique-constraint hit means the
    /// content is already indexed and is not an error.
    pub fn insert_hash(&self, filepath: &str, hash: &str) -> Result<InsertOutcome> {
        match self.connection().execute(
            "INSERT INTO hashes (filepath, hash) VALUES (?1, ?2)",
            params![filepath, hash],
        ) {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                trace!("Hash {} already recorded, skipping {}", hash, filepath);
                Ok(InsertOutcome::AlreadyRecorded)
            }
            Err(e) => Err(e),
        }
    }

    pub fn find_by_hash(&self, hash: &str) -> Result<Option<HashEntry>> {
        self.connection()
            .query_row(
                "SELECT id, filepath, hash FROM hashes WHERE hash = ?1",
                params![hash],
                |row| {
                    Ok(HashEntry {
                        id: row.get(0)?,
                        filepath: row.get(1)?,
                        hash: row.get(2)?,
                    })
                },
            )
            .optional()
    }

    pub fn contains_hash(&self, hash: &str) -> Result<bool> {
        self.connection().query_row(
            "SELECT EXISTS(SELECT 1 FROM hashes WHERE hash = ?1)",
            params![hash],
            |row| row.get(0),
        )
    }

    pub fn count_hashes(&self) -> Result<i64> {
        self.connection()
            .query_row("SELECT COUNT(*) FROM hashes", [], |row| row.get(0))
    }
}
