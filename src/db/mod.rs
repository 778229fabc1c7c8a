use rusqlite::Connection;
use std::path::Path;
use crate::error::{Result, IngestError};

/// Table definitions for summary and breakdown logs
const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

/// Database connection wrapper
///
/// Holds only the path; every call opens its own connection, so a batch
/// never keeps a handle across files.
pub struct Db {
    path: std::path::PathBuf,
}

impl Db {
    /// Create a new database connection manager
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    /// Open a new database connection with the pragmas every writer expects
    pub fn open_connection(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)
            .map_err(IngestError::Database)?;

        // foreign_keys so breakdown rows can only point at stored summaries
        conn.execute_batch(
            "PRAGMA journal_mode = WAL; \
             PRAGMA synchronous = NORMAL; \
             PRAGMA foreign_keys = ON; \
             PRAGMA busy_timeout = 5000;"
        )?;

        Ok(conn)
    }

    /// Execute a closure with a freshly opened connection
    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.open_connection()?;
        f(&mut conn)
    }

    /// Create the log tables if they are missing
    pub fn ensure_schema(&self) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute_batch(SCHEMA_SQL)?;
            Ok(())
        })?;
        log::debug!("Schema ready in {}", self.path.display());
        Ok(())
    }
}
