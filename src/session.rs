//! # Session Hint Store
//!
//! A tiny file-backed key-value store for client-side session hints, the
//! local-storage analog. Holds the `studentRegNo` hint: written at login and
//! signup, read at dashboard mount, cleared at logout. Never authoritative;
//! losing the file loses nothing but convenience.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::Result;
use crate::types::RegistrationNumber;

/// Key under which the registration-number hint is stored.
pub const STUDENT_REG_NO: &str = "studentRegNo";

/// File-backed hint store. Every mutation writes through to disk.
pub struct SessionStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl SessionStore {
    /// Opens the store at `path`. An absent file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Reads a hint.
    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Writes a hint and persists.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let mut entries = self.lock();
        entries.insert(key.into(), value.into());
        self.persist(&entries)
    }

    /// Removes a hint and persists. Removing an absent key is a no-op.
    pub fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.lock();
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    /// The stored registration-number hint, if any.
    pub fn student_reg_no(&self) -> Option<RegistrationNumber> {
        self.get(STUDENT_REG_NO).map(RegistrationNumber::new)
    }

    /// Stores the registration-number hint.
    pub fn set_student_reg_no(&self, reg_no: &RegistrationNumber) -> Result<()> {
        self.set(STUDENT_REG_NO, reg_no.as_str())
    }

    /// Clears the registration-number hint.
    pub fn clear_student_reg_no(&self) -> Result<()> {
        self.remove(STUDENT_REG_NO)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().expect("session entries mutex poisoned")
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }
}
