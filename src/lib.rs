//! # classboard: realtime lesson updates and reviews
//!
//! The persistent core of a two-role classroom application: teachers post
//! daily lesson updates, students read them live and submit star-rating
//! reviews. State lives in a path-keyed record store with push-based
//! subscriptions; identity lives in a small auth service.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Account Flows / Data Access                 │
//! │        (typed subscriptions, point writes, login/signup)        │
//! └───────────────┬─────────────────────────────┬───────────────────┘
//!                 │                             │
//!                 ▼                             ▼
//! ┌───────────────────────────────┐   ┌──────────────────────┐
//! │         Store Handle          │   │     Auth Service     │
//! │  (async, cloneable, channels) │   │  (accounts, resets)  │
//! └───────────────┬───────────────┘   └──────────────────────┘
//!                 │
//!                 ▼
//! ┌───────────────────────────────┐
//! │     Store Thread (1 writer)   │──── change feed ───► subscriptions
//! │   RecordStore ── SQLite (WAL) │
//! └───────────────────────────────┘
//! ```
//!
//! ## Core Invariants
//!
//! 1. **Single logical writer**: one thread owns the store connection.
//! 2. **Sortable keys**: generated record keys strictly increase; ascending
//!    key order is insertion order.
//! 3. **Notify after commit**: a change event is never published before its
//!    write is durable.
//! 4. **Whole-state snapshots**: subscribers always receive current state,
//!    so a lagged subscriber heals with a single refresh.
//! 5. **Empty is not an error**: reads of absent records return empty
//!    snapshots; existence-checking belongs to the caller.
//!
//! ## Module Organization
//!
//! - [`error`]: the crate-wide error enum and `Result` alias
//! - [`schema`]: SQLite DDL and database initialization
//! - [`types`]: domain records, identifier newtypes, the subject table
//! - [`store`]: the synchronous record-store engine and snapshots
//! - [`actor`]: the store thread and the async [`StoreHandle`]
//! - [`subscription`]: the change feed and live collection subscriptions
//! - [`data`]: the typed data-access layer
//! - [`auth`]: the in-process identity provider
//! - [`account`]: signup / login / reset orchestration
//! - [`session`]: the file-backed session-hint store
//! - [`config`]: environment-driven configuration

pub mod account;
pub mod actor;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod schema;
pub mod session;
pub mod store;
pub mod subscription;
pub mod types;

pub use account::{Accounts, StudentSignup};
pub use actor::{spawn_store, spawn_store_with_capacity, StoreHandle};
pub use auth::{AuthService, AuthUser, PasswordReset, ProfileChanges};
pub use config::{AdminCredentials, Config};
pub use data::{DataAccess, ReviewedUpdatesFeed, ReviewsFeed, UpdatesFeed};
pub use error::{Error, Result};
pub use schema::Database;
pub use session::SessionStore;
pub use store::Snapshot;
pub use subscription::CollectionSubscription;

pub use types::{
    subject_by_id, subject_by_name, subject_id_for_name, DailyUpdate, NewDailyUpdate, NewReview,
    Rating, RecordKey, RegistrationNumber, Review, Subject, SubjectId, Uid, UserProfile, SUBJECTS,
};
