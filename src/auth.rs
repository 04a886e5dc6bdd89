//! # Auth Service
//!
//! In-process identity provider standing in for the hosted one: credential
//! sign-up and sign-in, profile field updates, and password-reset issuance.
//! Accounts are keyed by a random auth-assigned uid; email lookup is
//! case-insensitive.
//!
//! Passwords are stored only as salted SHA-256 digests and are never
//! returned. Reset emails are not actually sent; they land in an
//! outbox the caller (and the tests) can inspect.
//!
//! The service holds no reference to the record store. Profile *records*
//! (`users/{uid}`) are the data layer's business; this service only owns
//! credentials and the auth-side profile fields.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{Error, Result};
use crate::types::Uid;

/// Length of generated uids.
const UID_LEN: usize = 28;

/// Minimum accepted password length.
const MIN_PASSWORD_LEN: usize = 6;

/// The caller-visible view of an account.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub uid: Uid,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Profile fields settable after account creation. `None` leaves a field
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// A password-reset email captured in the outbox.
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordReset {
    pub email: String,
    pub requested_at: DateTime<Utc>,
}

/// One stored account. The digest is over salt ‖ password.
struct Account {
    uid: Uid,
    email: String,
    display_name: Option<String>,
    photo_url: Option<String>,
    salt: [u8; 16],
    digest: [u8; 32],
}

impl Account {
    fn as_user(&self) -> AuthUser {
        AuthUser {
            uid: self.uid.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            photo_url: self.photo_url.clone(),
        }
    }
}

#[derive(Default)]
struct AuthState {
    /// Accounts keyed by lowercased email.
    by_email: HashMap<String, Account>,
    /// Issued reset emails, oldest first.
    resets: Vec<PasswordReset>,
}

/// The identity provider.
pub struct AuthService {
    state: RwLock<AuthState>,
}

impl AuthService {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(AuthState::default()),
        }
    }

    /// Creates an account and returns the new user.
    ///
    /// Rejects an empty or malformed email, a password shorter than
    /// [`MIN_PASSWORD_LEN`], and an email that already has an account.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::validation("a valid email address is required"));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(Error::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let key = email.to_lowercase();
        let mut state = self.state.write().await;
        if state.by_email.contains_key(&key) {
            return Err(Error::EmailInUse(email.to_string()));
        }

        let mut rng = rand::thread_rng();
        let mut salt = [0u8; 16];
        rng.fill(&mut salt[..]);

        let account = Account {
            uid: random_uid(&mut rng),
            email: email.to_string(),
            display_name: None,
            photo_url: None,
            salt,
            digest: digest(&salt, password),
        };
        let user = account.as_user();
        info!(uid = %user.uid, "account created");
        state.by_email.insert(key, account);
        Ok(user)
    }

    /// Verifies credentials and returns the user.
    ///
    /// An unknown email and a wrong password are indistinguishable to the
    /// caller.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let key = email.trim().to_lowercase();
        let state = self.state.read().await;
        let account = state.by_email.get(&key).ok_or(Error::InvalidCredentials)?;

        if digest(&account.salt, password) != account.digest {
            return Err(Error::InvalidCredentials);
        }
        Ok(account.as_user())
    }

    /// Applies profile changes to an existing account.
    pub async fn update_profile(&self, uid: &Uid, changes: ProfileChanges) -> Result<AuthUser> {
        let mut state = self.state.write().await;
        let account = state
            .by_email
            .values_mut()
            .find(|account| &account.uid == uid)
            .ok_or_else(|| Error::NotFound {
                what: "account",
                key: uid.to_string(),
            })?;

        if let Some(display_name) = changes.display_name {
            account.display_name = Some(display_name);
        }
        if let Some(photo_url) = changes.photo_url {
            account.photo_url = Some(photo_url);
        }
        Ok(account.as_user())
    }

    /// Looks up an account by uid.
    pub async fn user(&self, uid: &Uid) -> Option<AuthUser> {
        let state = self.state.read().await;
        state
            .by_email
            .values()
            .find(|account| &account.uid == uid)
            .map(Account::as_user)
    }

    /// Issues a password-reset email for an existing account.
    pub async fn send_password_reset(&self, email: &str) -> Result<()> {
        let key = email.trim().to_lowercase();
        let mut state = self.state.write().await;
        let account = state.by_email.get(&key).ok_or_else(|| Error::NotFound {
            what: "account",
            key: email.to_string(),
        })?;

        let reset = PasswordReset {
            email: account.email.clone(),
            requested_at: Utc::now(),
        };
        info!(email = %reset.email, "password reset issued");
        state.resets.push(reset);
        Ok(())
    }

    /// The reset emails issued so far, oldest first.
    pub async fn password_resets(&self) -> Vec<PasswordReset> {
        self.state.read().await.resets.clone()
    }
}

impl Default for AuthService {
    fn default() -> Self {
        Self::new()
    }
}

fn digest(salt: &[u8; 16], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

fn random_uid(rng: &mut impl Rng) -> Uid {
    let raw: String = rng
        .sample_iter(&Alphanumeric)
        .take(UID_LEN)
        .map(char::from)
        .collect();
    Uid::new(raw)
}
