use crate::error::Error;
use rusqlite::{Connection, OpenFlags, Result};
use std::path::Path;
use tracing::debug;

pub const SCHEMA_VERSION: i64 = 1;

/// The hash index: a single SQLite file recording which content is already
/// in the archive.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) and bring the schema up to date.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    /// Open an index that `init` already created. Never creates the file.
    pub fn open_existing(path: impl AsRef<Path>) -> std::result::Result<Self, Error> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        let db = Database { conn };

        let version = db.schema_version()?;
        if version < SCHEMA_VERSION {
            return Err(Error::Other(format!(
                "Hash index {} is not initialized (schema version {}), run `init` first",
                path.display(),
                version
            )));
        }
        debug!("Opened hash index {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode)");
        Ok(())
    }

    pub fn schema_version(&self) -> Result<i64> {
        self.conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
    }

    fn migrate_schema(&self) -> Result<()> {
        let version = self.schema_version()?;
        if version >= SCHEMA_VERSION {
            debug!("SQLite schema already at version {}", version);
            return Ok(());
        }
        self.conn.execute_batch(include_str!("schema.sql"))?;
        debug!(
            "SQLite schema migrated from version {} to {}",
            version, SCHEMA_VERSION
        );
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
