//! # Error Handling
//!
//! A single [`Error`] enum covers every failure mode in the crate, so callers
//! can handle all operations uniformly and function signatures stay small.
//!
//! The variants fall into four categories, and every operation maps its
//! failures onto exactly one of them:
//!
//! | Category    | Variants                                  | Typical response        |
//! |-------------|-------------------------------------------|-------------------------|
//! | Unavailable | [`Error::Unavailable`]                    | Surface to the user     |
//! | Not found   | [`Error::NotFound`]                       | Show "no such …"        |
//! | Validation  | [`Error::Validation`], [`Error::InvalidPath`], [`Error::InvalidCredentials`], [`Error::EmailInUse`] | Reject before any write |
//! | Backend     | [`Error::Sqlite`], [`Error::Json`], [`Error::Io`], [`Error::Schema`] | Surface, never retry    |
//!
//! Nothing in this crate retries: a failed operation leaves the caller in its
//! pre-action state and the error is reported once.

use thiserror::Error;

/// All errors that can occur in classboard operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A service handle has shut down or was never started.
    ///
    /// Returned when a request channel to the record store is closed, or when
    /// an operation requires a collaborator (e.g. admin credentials) that was
    /// not configured.
    #[error("{service} is unavailable")]
    Unavailable {
        /// Human-readable service name ("record store", "admin login", ...).
        service: &'static str,
    },

    /// A required record does not exist.
    ///
    /// Only used where absence is an error for the caller. Lookups that
    /// legitimately miss (an unmapped registration number) return an empty
    /// snapshot instead, and the caller checks `exists()`.
    #[error("no {what} found for '{key}'")]
    NotFound {
        /// What was being looked up ("student", "account", "record").
        what: &'static str,
        /// The key that missed.
        key: String,
    },

    /// Input rejected before any store or auth call was made.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A store path was malformed (empty segment, too deep, ...).
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Sign-in was rejected. Deliberately does not say whether the email was
    /// unknown or the password wrong.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Sign-up attempted with an email that already has an account.
    #[error("email '{0}' is already registered")]
    EmailInUse(String),

    /// SQLite operation failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored record could not be encoded or decoded as JSON.
    #[error("corrupt record: {0}")]
    Json(#[from] serde_json::Error),

    /// Session-hint file could not be read or written.
    #[error("session store i/o: {0}")]
    Io(#[from] std::io::Error),

    /// Schema version mismatch or database-level corruption.
    #[error("schema error: {0}")]
    Schema(String),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with a formatted message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}

/// A `Result` type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    /// Error messages appear in user-facing notifications; keep them readable.
    #[test]
    fn error_display_formats() {
        let unavailable = Error::Unavailable {
            service: "record store",
        };
        assert_eq!(unavailable.to_string(), "record store is unavailable");

        let not_found = Error::NotFound {
            what: "student",
            key: "21CS123".to_string(),
        };
        assert_eq!(not_found.to_string(), "no student found for '21CS123'");

        let invalid = Error::InvalidPath {
            path: "a/b/c".to_string(),
            reason: "too many segments",
        };
        assert_eq!(invalid.to_string(), "invalid path 'a/b/c': too many segments");

        assert_eq!(
            Error::EmailInUse("jo@example.com".into()).to_string(),
            "email 'jo@example.com' is already registered"
        );
    }

    #[test]
    fn sqlite_errors_convert_with_question_mark() {
        let sqlite_err = rusqlite::Error::InvalidParameterName("x".to_string());
        let err: Error = sqlite_err.into();
        assert!(matches!(err, Error::Sqlite(_)));
        assert!(err.to_string().contains("sqlite error"));
    }

    #[test]
    fn json_errors_convert_with_question_mark() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
