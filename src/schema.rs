//! # SQLite Schema
//!
//! The record store keeps its whole tree in one table: a row per record,
//! addressed by `(collection, key)`. Payloads are JSON text; the store is
//! schema-less above this layer, exactly like the hosted tree database it
//! stands in for; nothing below the client validates record shapes.
//!
//! ```text
//! records                          classboard_metadata
//! ┌────────────────────────┐       ┌──────────────────┐
//! │ collection  TEXT   ─┐  │       │ key   TEXT (PK)  │
//! │ key         TEXT   ─┴PK│       │ value TEXT       │
//! │ value       TEXT (JSON)│       └──────────────────┘
//! │ updated_ms  INTEGER    │
//! └────────────────────────┘
//! ```
//!
//! The composite primary key doubles as the index for whole-collection scans
//! (`WHERE collection = ? ORDER BY key`), which is the read pattern behind
//! every live snapshot.

use rusqlite::Connection;

use crate::error::{Error, Result};

/// Current schema version. No migrations exist; a mismatch is an error.
const SCHEMA_VERSION: i32 = 1;

/// One row per record. `key` ordering is insertion ordering because generated
/// keys are chronologically sortable.
const CREATE_RECORDS: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    collection TEXT NOT NULL,
    key        TEXT NOT NULL,
    value      TEXT NOT NULL,
    updated_ms INTEGER NOT NULL,
    PRIMARY KEY (collection, key)
)
"#;

/// Key-value metadata, currently just the schema version.
const CREATE_METADATA: &str = r#"
CREATE TABLE IF NOT EXISTS classboard_metadata (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
"#;

/// A SQLite connection with the classboard schema applied.
///
/// `Database` owns its connection; dropping it closes the file. The writer
/// side of the store consumes a `Database` via [`Database::into_connection`],
/// which keeps the single-writer arrangement explicit in the types.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database file, creating and initializing it if necessary.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let mut db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Creates an in-memory database. Contents are lost on drop; intended for
    /// tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Applies pragmas, creates tables and checks the schema version.
    /// Idempotent: safe against an already-initialized file.
    fn initialize(&mut self) -> Result<()> {
        // WAL keeps the file readable while the writer thread holds the
        // connection; NORMAL sync is durable enough for re-creatable records.
        self.conn.execute_batch("PRAGMA journal_mode = WAL")?;
        self.conn.execute_batch("PRAGMA synchronous = NORMAL")?;

        self.conn.execute_batch(CREATE_METADATA)?;
        self.conn.execute_batch(CREATE_RECORDS)?;

        self.verify_or_set_version()?;

        Ok(())
    }

    /// Records the schema version on a fresh database, or verifies it on an
    /// existing one.
    fn verify_or_set_version(&mut self) -> Result<()> {
        let existing: Option<i32> = self
            .conn
            .query_row(
                "SELECT value FROM classboard_metadata WHERE key = 'schema_version'",
                [],
                |row| {
                    let s: String = row.get(0)?;
                    Ok(s.parse().unwrap_or(0))
                },
            )
            .ok();

        match existing {
            None => {
                self.conn.execute(
                    "INSERT INTO classboard_metadata (key, value) VALUES ('schema_version', ?)",
                    [SCHEMA_VERSION.to_string()],
                )?;
            }
            Some(v) if v == SCHEMA_VERSION => {}
            Some(v) => {
                return Err(Error::Schema(format!(
                    "schema version mismatch: database has version {v}, this build requires {SCHEMA_VERSION}"
                )));
            }
        }

        Ok(())
    }

    /// Releases the underlying connection to the component that will own it
    /// (the store's writer thread).
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}
