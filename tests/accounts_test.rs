mod common;

use classboard::{Error, RegistrationNumber, UserProfile};
use common::{signup_form, TestApp, ADMIN_EMAIL, ADMIN_PASSWORD};

#[tokio::test]
async fn signup_writes_profile_index_and_session_hint() {
    let app = TestApp::new();

    let profile = app
        .accounts
        .sign_up_student(signup_form("Priya Nair", "priya@example.com", "21CS123"))
        .await
        .unwrap();

    // Profile record is resolvable through the registration-number index.
    let reg_no = RegistrationNumber::new("21CS123");
    let snapshot = app.data.user_by_registration_number(&reg_no).await.unwrap();
    assert!(snapshot.exists());
    let stored: UserProfile = snapshot.decode().unwrap();
    assert_eq!(stored, profile);
    assert_eq!(stored.display_name, "Priya Nair");
    assert_eq!(stored.photo_url, None);

    // The auth profile carries the display name.
    let auth_user = app.auth.user(&profile.uid).await.unwrap();
    assert_eq!(auth_user.display_name.as_deref(), Some("Priya Nair"));

    // The hint is remembered for the next dashboard mount.
    assert_eq!(app.accounts.current_registration_number(), Some(reg_no));

    app.shutdown().await;
}

#[tokio::test]
async fn students_log_in_by_registration_number() {
    let app = TestApp::new();
    app.accounts
        .sign_up_student(signup_form("Priya Nair", "priya@example.com", "21CS123"))
        .await
        .unwrap();

    let reg_no = RegistrationNumber::new("21CS123");
    let user = app
        .accounts
        .log_in_student(&reg_no, "hunter42")
        .await
        .unwrap();
    assert_eq!(user.email, "priya@example.com");

    let wrong = app
        .accounts
        .log_in_student(&reg_no, "wrong-pass")
        .await
        .unwrap_err();
    assert!(matches!(wrong, Error::InvalidCredentials));

    let unknown = app
        .accounts
        .log_in_student(&RegistrationNumber::new("99XX999"), "hunter42")
        .await
        .unwrap_err();
    assert!(matches!(unknown, Error::NotFound { .. }));

    app.shutdown().await;
}

#[tokio::test]
async fn unknown_registration_number_lookup_is_empty_not_an_error() {
    let app = TestApp::new();

    let snapshot = app
        .data
        .user_by_registration_number(&RegistrationNumber::new("00AA000"))
        .await
        .unwrap();
    assert!(!snapshot.exists());

    app.shutdown().await;
}

#[tokio::test]
async fn forgot_password_issues_a_reset_to_the_account_email() {
    let app = TestApp::new();
    app.accounts
        .sign_up_student(signup_form("Priya Nair", "priya@example.com", "21CS123"))
        .await
        .unwrap();

    let email = app
        .accounts
        .forgot_password(&RegistrationNumber::new("21CS123"))
        .await
        .unwrap();
    assert_eq!(email, "priya@example.com");

    let resets = app.auth.password_resets().await;
    assert_eq!(resets.len(), 1);
    assert_eq!(resets[0].email, "priya@example.com");

    let err = app
        .accounts
        .forgot_password(&RegistrationNumber::new("99XX999"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));

    app.shutdown().await;
}

#[tokio::test]
async fn admin_login_accepts_exactly_the_configured_pair() {
    let app = TestApp::new();

    assert!(app.accounts.log_in_admin(ADMIN_EMAIL, ADMIN_PASSWORD).is_ok());

    let err = app
        .accounts
        .log_in_admin(ADMIN_EMAIL, "guessed-password")
        .unwrap_err();
    assert!(matches!(err, Error::InvalidCredentials));

    app.shutdown().await;
}

#[tokio::test]
async fn logout_clears_the_session_hint() {
    let app = TestApp::new();
    app.accounts
        .sign_up_student(signup_form("Priya Nair", "priya@example.com", "21CS123"))
        .await
        .unwrap();
    assert!(app.accounts.current_registration_number().is_some());

    app.accounts.log_out().unwrap();
    assert_eq!(app.accounts.current_registration_number(), None);

    app.shutdown().await;
}

#[tokio::test]
async fn reusing_a_registration_number_repoints_the_index() {
    let app = TestApp::new();
    app.accounts
        .sign_up_student(signup_form("Priya Nair", "priya@example.com", "21CS123"))
        .await
        .unwrap();

    // Last writer wins: nothing guards the index at signup.
    let second = app
        .accounts
        .sign_up_student(signup_form("Arun Shah", "arun@example.com", "21CS123"))
        .await
        .unwrap();

    let snapshot = app
        .data
        .user_by_registration_number(&RegistrationNumber::new("21CS123"))
        .await
        .unwrap();
    let stored: UserProfile = snapshot.decode().unwrap();
    assert_eq!(stored.uid, second.uid);

    app.shutdown().await;
}

#[tokio::test]
async fn profile_photo_updates_both_record_and_auth_profile() {
    let app = TestApp::new();
    let profile = app
        .accounts
        .sign_up_student(signup_form("Priya Nair", "priya@example.com", "21CS123"))
        .await
        .unwrap();

    let photo = "data:image/png;base64,abc123".to_string();
    app.accounts
        .set_profile_photo(&profile.uid, photo.clone())
        .await
        .unwrap();

    let stored: UserProfile = app
        .data
        .user_by_uid(&profile.uid)
        .await
        .unwrap()
        .decode()
        .unwrap();
    assert_eq!(stored.photo_url, Some(photo.clone()));

    let auth_user = app.auth.user(&profile.uid).await.unwrap();
    assert_eq!(auth_user.photo_url, Some(photo));

    app.shutdown().await;
}
