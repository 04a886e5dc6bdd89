//! # Record Store Engine
//!
//! The synchronous engine behind the async store handle. One instance owns
//! the SQLite connection and runs on the dedicated writer thread; it is not
//! thread-safe and is never shared (see [`crate::actor`]).
//!
//! ## Tree model
//!
//! Records live at two-segment paths `collection/key` under a small fixed set
//! of top-level collections. A path with one segment names a whole collection;
//! reading it assembles a `{key: record}` object, deleting it drops every
//! child. This is the subset of a hierarchical tree database the application
//! actually uses.
//!
//! ## Key generation
//!
//! [`RecordStore::push`] assigns chronologically sortable keys:
//! millisecond timestamp, a per-millisecond sequence number, and a random
//! tail. Within one store, generated keys strictly increase, so ascending key
//! order is insertion order, which is what lets collection snapshots come
//! back already ordered.
//!
//! ## Snapshots
//!
//! Reads return a [`Snapshot`]: path plus optional JSON value. A missing
//! record or an empty collection yields an *empty* snapshot, never an error;
//! existence-checking belongs to the caller.

use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::schema::Database;
use crate::types::RecordKey;

// =============================================================================
// Paths
// =============================================================================

/// A parsed store path: either a whole collection or one record in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRef<'a> {
    /// A single segment, e.g. `updates`.
    Collection(&'a str),
    /// Two segments, e.g. `users/u-42`.
    Record(&'a str, &'a str),
}

/// Parses a path, rejecting empty segments and anything deeper than
/// `collection/key`.
pub fn parse_path(path: &str) -> Result<PathRef<'_>> {
    let mut segments = path.split('/');
    let first = segments.next().unwrap_or("");
    if first.is_empty() {
        return Err(Error::InvalidPath {
            path: path.to_string(),
            reason: "empty collection segment",
        });
    }
    match segments.next() {
        None => Ok(PathRef::Collection(first)),
        Some("") => Err(Error::InvalidPath {
            path: path.to_string(),
            reason: "empty key segment",
        }),
        Some(second) => {
            if segments.next().is_some() {
                Err(Error::InvalidPath {
                    path: path.to_string(),
                    reason: "too many segments",
                })
            } else {
                Ok(PathRef::Record(first, second))
            }
        }
    }
}

// =============================================================================
// Snapshots
// =============================================================================

/// The result of a read: what lived at `path` at the moment of the read.
///
/// An absent record or empty collection is an existing `Snapshot` whose
/// [`exists`](Snapshot::exists) is false. Callers that treat absence as an
/// error convert explicitly; lookups like the registration-number resolve
/// pass the empty snapshot through untouched.
#[derive(Debug, Clone)]
pub struct Snapshot {
    path: String,
    value: Option<Value>,
}

impl Snapshot {
    pub(crate) fn new(path: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            path: path.into(),
            value,
        }
    }

    /// Whether anything existed at the path.
    pub fn exists(&self) -> bool {
        self.value.is_some()
    }

    /// The path this snapshot was taken at.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw JSON value, if any.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Decodes the value into a typed record. Absence is a not-found error
    /// here; call [`exists`](Snapshot::exists) first when absence is valid.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        match &self.value {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Err(Error::NotFound {
                what: "record",
                key: self.path.clone(),
            }),
        }
    }

    /// Decodes a collection snapshot into `(key, record)` pairs, ascending by
    /// key (insertion order for generated keys). An empty snapshot decodes to
    /// an empty list.
    pub fn entries<T: DeserializeOwned>(&self) -> Result<Vec<(RecordKey, T)>> {
        let map = match &self.value {
            None => return Ok(Vec::new()),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(Error::Schema(format!(
                    "collection snapshot at '{}' is not an object",
                    self.path
                )))
            }
        };

        let mut entries = Vec::with_capacity(map.len());
        for (key, value) in map {
            let record = serde_json::from_value(value.clone())?;
            entries.push((RecordKey::new(key.as_str()), record));
        }
        Ok(entries)
    }
}

// =============================================================================
// Engine
// =============================================================================

/// The synchronous record store. Owns the connection; single writer.
pub struct RecordStore {
    conn: Connection,
    /// Millisecond component of the last generated key. Never decreases, even
    /// if the wall clock does.
    last_key_millis: u64,
    /// Sequence number within `last_key_millis`.
    key_seq: u16,
}

impl RecordStore {
    /// Takes ownership of an initialized database.
    pub fn new(db: Database) -> Self {
        Self {
            conn: db.into_connection(),
            last_key_millis: 0,
            key_seq: 0,
        }
    }

    /// Reads the record or collection at `path`.
    pub fn get(&self, path: &str) -> Result<Snapshot> {
        match parse_path(path)? {
            PathRef::Record(collection, key) => {
                let raw: Option<String> = self
                    .conn
                    .query_row(
                        "SELECT value FROM records WHERE collection = ?1 AND key = ?2",
                        params![collection, key],
                        |row| row.get(0),
                    )
                    .optional()?;
                let value = raw.map(|s| serde_json::from_str(&s)).transpose()?;
                Ok(Snapshot::new(path, value))
            }
            PathRef::Collection(collection) => {
                let map = self.collection_map(collection, |_| true)?;
                Ok(Snapshot::new(path, map))
            }
        }
    }

    /// Writes `value` at `collection/key`, replacing any previous record.
    pub fn put(&mut self, path: &str, value: &Value) -> Result<()> {
        let (collection, key) = match parse_path(path)? {
            PathRef::Record(collection, key) => (collection, key),
            PathRef::Collection(_) => {
                return Err(Error::InvalidPath {
                    path: path.to_string(),
                    reason: "point writes need a collection/key path",
                })
            }
        };

        self.conn.execute(
            "INSERT OR REPLACE INTO records (collection, key, value, updated_ms)
             VALUES (?1, ?2, ?3, ?4)",
            params![collection, key, serde_json::to_string(value)?, now_millis()],
        )?;
        Ok(())
    }

    /// Appends `value` under an auto-generated key and returns that key.
    pub fn push(&mut self, collection: &str, value: &Value) -> Result<RecordKey> {
        if !matches!(parse_path(collection)?, PathRef::Collection(_)) {
            return Err(Error::InvalidPath {
                path: collection.to_string(),
                reason: "push targets a collection, not a record",
            });
        }

        let key = self.next_key();
        // Generated keys never repeat, so a plain INSERT suffices.
        self.conn.execute(
            "INSERT INTO records (collection, key, value, updated_ms)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                collection,
                key.as_str(),
                serde_json::to_string(value)?,
                now_millis()
            ],
        )?;
        Ok(key)
    }

    /// Deletes the record at `collection/key`, or every record in a
    /// collection when the path has a single segment. Removing something that
    /// does not exist is a no-op, as in the hosted store.
    pub fn remove(&mut self, path: &str) -> Result<()> {
        match parse_path(path)? {
            PathRef::Record(collection, key) => {
                self.conn.execute(
                    "DELETE FROM records WHERE collection = ?1 AND key = ?2",
                    params![collection, key],
                )?;
            }
            PathRef::Collection(collection) => {
                self.conn.execute(
                    "DELETE FROM records WHERE collection = ?1",
                    params![collection],
                )?;
            }
        }
        Ok(())
    }

    /// Reads the children of `collection` whose `child` field equals
    /// `expected`: the store-side equality query behind filtered
    /// subscriptions.
    pub fn query_eq(&self, collection: &str, child: &str, expected: &Value) -> Result<Snapshot> {
        if !matches!(parse_path(collection)?, PathRef::Collection(_)) {
            return Err(Error::InvalidPath {
                path: collection.to_string(),
                reason: "queries target a collection, not a record",
            });
        }
        let map = self.collection_map(collection, |record| record.get(child) == Some(expected))?;
        Ok(Snapshot::new(collection, map))
    }

    /// Assembles a `{key: record}` object from the matching rows of a
    /// collection, or `None` when nothing matches.
    fn collection_map(
        &self,
        collection: &str,
        keep: impl Fn(&Value) -> bool,
    ) -> Result<Option<Value>> {
        let mut stmt = self.conn.prepare(
            "SELECT key, value FROM records WHERE collection = ?1 ORDER BY key",
        )?;
        let rows = stmt.query_map(params![collection], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut map = Map::new();
        for row in rows {
            let (key, raw) = row?;
            let record: Value = serde_json::from_str(&raw)?;
            if keep(&record) {
                map.insert(key, record);
            }
        }

        if map.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Value::Object(map)))
        }
    }

    /// Generates the next key: 11 hex digits of milliseconds, 4 of sequence,
    /// 4 of random tail. Strictly increasing within this store even across a
    /// backwards clock step.
    fn next_key(&mut self) -> RecordKey {
        let now = now_millis();
        if now > self.last_key_millis {
            self.last_key_millis = now;
            self.key_seq = 0;
        } else if self.key_seq == u16::MAX {
            self.last_key_millis += 1;
            self.key_seq = 0;
        } else {
            self.key_seq += 1;
        }

        let tail: u16 = rand::random();
        RecordKey::new(format!(
            "{:011x}{:04x}{:04x}",
            self.last_key_millis, self.key_seq, tail
        ))
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
