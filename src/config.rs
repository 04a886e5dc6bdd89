//! # Configuration
//!
//! Environment-driven configuration, loaded once and injected explicitly.
//! Missing variables fall back to logged defaults; secrets may be supplied
//! indirectly through a `*_FILE` variable pointing at a file (the usual
//! container-secret arrangement).
//!
//! Admin credentials live here and nowhere else. When they are not
//! configured, admin login is simply unavailable; there is no baked-in
//! fallback pair.

use std::env;
use std::fmt::Display;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{info, warn};

use crate::subscription::DEFAULT_CHANGE_CAPACITY;

/// The admin sign-in pair, compared verbatim at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub email: String,
    pub password: String,
}

/// Crate-wide configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Record-store database file.
    pub database_path: PathBuf,
    /// Session-hint file.
    pub session_file: PathBuf,
    /// Change-feed capacity for live subscriptions.
    pub change_feed_capacity: usize,
    /// Admin credentials, when configured.
    pub admin: Option<AdminCredentials>,
}

impl Config {
    /// Loads configuration from the environment.
    pub fn load() -> Self {
        let admin_email = secret("CLASSBOARD_ADMIN_EMAIL");
        let admin_password = secret("CLASSBOARD_ADMIN_PASSWORD");
        let admin = match (admin_email, admin_password) {
            (Some(email), Some(password)) => Some(AdminCredentials { email, password }),
            _ => {
                info!("admin credentials not configured, admin login disabled");
                None
            }
        };

        Self {
            database_path: PathBuf::from(
                var("CLASSBOARD_DB").unwrap_or_else(|| "classboard.db".to_string()),
            ),
            session_file: PathBuf::from(
                var("CLASSBOARD_SESSION_FILE")
                    .unwrap_or_else(|| ".classboard-session.json".to_string()),
            ),
            change_feed_capacity: try_load("CLASSBOARD_CHANGE_CAPACITY", DEFAULT_CHANGE_CAPACITY),
            admin,
        }
    }
}

impl Default for Config {
    /// The same defaults `load` falls back to, with no environment reads.
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("classboard.db"),
            session_file: PathBuf::from(".classboard-session.json"),
            change_feed_capacity: DEFAULT_CHANGE_CAPACITY,
            admin: None,
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

/// Parses `key`, falling back to `default` (with a warning) on a bad value.
fn try_load<T: FromStr + Display + Copy>(key: &str, default: T) -> T {
    match var(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("invalid {key} value '{raw}', using default {default}");
            default
        }),
    }
}

/// Reads `key` directly, or the contents of the file named by `key_FILE`.
fn secret(key: &str) -> Option<String> {
    if let Some(value) = var(key) {
        return Some(value);
    }
    let file_key = format!("{key}_FILE");
    let path = var(&file_key)?;
    match fs::read_to_string(&path) {
        Ok(contents) => Some(contents.trim().to_string()),
        Err(err) => {
            warn!("failed to read {file_key} at {path}: {err}");
            None
        }
    }
}
