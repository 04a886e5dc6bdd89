//! # Account Flows
//!
//! The signup, login and password-reset orchestration: the glue between the
//! auth service, the data layer and the session-hint store. Each flow is a
//! straight sequence of the collaborator calls; on failure the error
//! surfaces to the caller and nothing is retried.
//!
//! Admin login never touches the auth service: it is a verbatim comparison
//! against credentials from [`Config`](crate::config::Config). Student
//! identity, by contrast, always goes through the registration-number
//! lookup and then the auth service.

use std::sync::Arc;

use tracing::info;

use crate::auth::{AuthService, AuthUser, ProfileChanges};
use crate::config::AdminCredentials;
use crate::data::DataAccess;
use crate::error::{Error, Result};
use crate::session::SessionStore;
use crate::types::{RegistrationNumber, Uid, UserProfile};

/// The signup form, as submitted.
#[derive(Debug, Clone)]
pub struct StudentSignup {
    pub full_name: String,
    pub email: String,
    pub registration_number: String,
    pub password: String,
}

/// The account-flow service. All collaborators are injected.
pub struct Accounts {
    auth: Arc<AuthService>,
    data: DataAccess,
    session: SessionStore,
    admin: Option<AdminCredentials>,
}

impl Accounts {
    pub fn new(
        auth: Arc<AuthService>,
        data: DataAccess,
        session: SessionStore,
        admin: Option<AdminCredentials>,
    ) -> Self {
        Self {
            auth,
            data,
            session,
            admin,
        }
    }

    /// Creates a student account end to end: auth account, display name on
    /// the auth profile, the `users/{uid}` record, the registration-number
    /// index entry, and the session hint. Signup does not sign the student
    /// in; they log in afterwards with their new credentials.
    ///
    /// The index write is last-writer-wins: re-using an existing
    /// registration number silently repoints it.
    pub async fn sign_up_student(&self, form: StudentSignup) -> Result<UserProfile> {
        let full_name = form.full_name.trim().to_string();
        let reg_no_raw = form.registration_number.trim().to_string();
        if full_name.is_empty() || reg_no_raw.is_empty() {
            return Err(Error::validation(
                "full name and registration number are required",
            ));
        }
        let reg_no = RegistrationNumber::new(reg_no_raw);

        let user = self.auth.sign_up(&form.email, &form.password).await?;
        self.auth
            .update_profile(
                &user.uid,
                ProfileChanges {
                    display_name: Some(full_name.clone()),
                    photo_url: None,
                },
            )
            .await?;

        let profile = UserProfile {
            uid: user.uid.clone(),
            display_name: full_name,
            email: user.email,
            registration_number: reg_no.clone(),
            photo_url: None,
        };
        self.data.save_user_profile(&profile).await?;
        self.data
            .index_registration_number(&reg_no, &user.uid)
            .await?;
        self.session.set_student_reg_no(&reg_no)?;

        info!(uid = %user.uid, reg_no = %reg_no, "student signed up");
        Ok(profile)
    }

    /// Logs a student in by registration number: resolve to an email, sign in
    /// with the password, remember the hint.
    pub async fn log_in_student(
        &self,
        reg_no: &RegistrationNumber,
        password: &str,
    ) -> Result<AuthUser> {
        if reg_no.as_str().trim().is_empty() || password.is_empty() {
            return Err(Error::validation(
                "registration number and password are required",
            ));
        }

        let snapshot = self.data.user_by_registration_number(reg_no).await?;
        if !snapshot.exists() {
            return Err(Error::NotFound {
                what: "student",
                key: reg_no.to_string(),
            });
        }
        let profile: UserProfile = snapshot.decode()?;

        let user = self.auth.sign_in(&profile.email, password).await?;
        self.session.set_student_reg_no(reg_no)?;
        Ok(user)
    }

    /// Issues a password-reset email for the account behind a registration
    /// number. Returns the email address the reset was sent to.
    pub async fn forgot_password(&self, reg_no: &RegistrationNumber) -> Result<String> {
        if reg_no.as_str().trim().is_empty() {
            return Err(Error::validation(
                "enter your registration number to reset your password",
            ));
        }

        let snapshot = self.data.user_by_registration_number(reg_no).await?;
        if !snapshot.exists() {
            return Err(Error::NotFound {
                what: "student",
                key: reg_no.to_string(),
            });
        }
        let profile: UserProfile = snapshot.decode()?;

        self.auth.send_password_reset(&profile.email).await?;
        Ok(profile.email)
    }

    /// Admin login: a verbatim comparison against the configured pair. With
    /// no pair configured, admin login is unavailable.
    pub fn log_in_admin(&self, email: &str, password: &str) -> Result<()> {
        let admin = self.admin.as_ref().ok_or(Error::Unavailable {
            service: "admin login",
        })?;
        if admin.email == email && admin.password == password {
            Ok(())
        } else {
            Err(Error::InvalidCredentials)
        }
    }

    /// Clears the session hint.
    pub fn log_out(&self) -> Result<()> {
        self.session.clear_student_reg_no()
    }

    /// The registration number remembered from the last login or signup.
    pub fn current_registration_number(&self) -> Option<RegistrationNumber> {
        self.session.student_reg_no()
    }

    /// Sets a profile photo on both the auth profile and the `users/{uid}`
    /// record, keeping the two in step.
    pub async fn set_profile_photo(&self, uid: &Uid, photo_url: String) -> Result<()> {
        let snapshot = self.data.user_by_uid(uid).await?;
        let mut profile: UserProfile = snapshot.decode()?;
        profile.photo_url = Some(photo_url.clone());
        self.data.save_user_profile(&profile).await?;

        self.auth
            .update_profile(
                uid,
                ProfileChanges {
                    display_name: None,
                    photo_url: Some(photo_url),
                },
            )
            .await?;
        Ok(())
    }
}
