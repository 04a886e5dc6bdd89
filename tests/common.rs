#![allow(dead_code)]

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use classboard::{
    spawn_store, Accounts, AdminCredentials, AuthService, DataAccess, Database, SessionStore,
    StoreHandle, StudentSignup,
};

pub const ADMIN_EMAIL: &str = "head@school.example";
pub const ADMIN_PASSWORD: &str = "chalk-and-slate";

pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A fully wired application: store thread, data layer, auth, account flows.
/// Dropping it tears everything down (the temp dir goes last).
pub struct TestApp {
    pub dir: TempDir,
    pub store: StoreHandle,
    pub data: DataAccess,
    pub auth: Arc<AuthService>,
    pub accounts: Accounts,
}

impl TestApp {
    pub fn new() -> Self {
        init_tracing();

        let dir = TempDir::new().expect("create temp dir");
        let db = Database::open(dir.path().join("records.db")).expect("initialize database");
        let store = spawn_store(db);
        let data = DataAccess::new(store.clone());
        let auth = Arc::new(AuthService::new());
        let session =
            SessionStore::open(dir.path().join("session.json")).expect("open session store");
        let accounts = Accounts::new(
            auth.clone(),
            data.clone(),
            session,
            Some(AdminCredentials {
                email: ADMIN_EMAIL.to_string(),
                password: ADMIN_PASSWORD.to_string(),
            }),
        );

        Self {
            dir,
            store,
            data,
            auth,
            accounts,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.dir.path().join("records.db")
    }

    pub async fn shutdown(&self) {
        self.store.shutdown().await;
    }
}

/// A ready-made signup form.
pub fn signup_form(name: &str, email: &str, reg_no: &str) -> StudentSignup {
    StudentSignup {
        full_name: name.to_string(),
        email: email.to_string(),
        registration_number: reg_no.to_string(),
        password: "hunter42".to_string(),
    }
}

/// Awaits `fut`, failing the test if it takes longer than five seconds.
/// Push-based feeds resolve promptly; a hang here is a bug, not slowness.
pub async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("operation timed out")
}
