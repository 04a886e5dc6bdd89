//! # Data-Access Layer
//!
//! Typed operations over the record store: live read subscriptions for the
//! dashboards and point writes for the forms. This layer owns the mapping
//! between raw snapshots and domain types. Every operation is a single trip
//! to the store, never batched and never retried.
//!
//! The store handle is injected at construction. There is no module-level
//! state; two `DataAccess` values over the same handle see the same records.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::actor::StoreHandle;
use crate::error::Result;
use crate::store::Snapshot;
use crate::subscription::CollectionSubscription;
use crate::types::{
    DailyUpdate, NewDailyUpdate, NewReview, RecordKey, RegistrationNumber, Review, SubjectId, Uid,
    UserProfile,
};

/// Collection of teacher-authored daily updates.
pub const UPDATES: &str = "updates";
/// Collection of student reviews.
pub const REVIEWS: &str = "reviews";
/// Collection of user profiles keyed by uid.
pub const USERS: &str = "users";
/// Index from registration number to uid.
pub const REGISTRATION_NUMBERS: &str = "registrationNumbers";

/// The payload of one registration-number index entry.
#[derive(Debug, Serialize, Deserialize)]
struct RegistrationEntry {
    uid: Uid,
}

/// Typed access to the classroom collections.
#[derive(Clone)]
pub struct DataAccess {
    store: StoreHandle,
}

impl DataAccess {
    /// Wraps an injected store handle.
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    // =========================================================================
    // Read subscriptions
    // =========================================================================

    /// All daily updates, newest first, re-pushed on every change.
    ///
    /// Loads the whole collection per snapshot; there is no pagination.
    pub async fn subscribe_updates(&self) -> Result<UpdatesFeed> {
        Ok(UpdatesFeed {
            inner: self.store.watch(UPDATES).await?,
        })
    }

    /// All reviews, optionally filtered store-side by subject.
    pub async fn subscribe_reviews(&self, subject: Option<&SubjectId>) -> Result<ReviewsFeed> {
        let inner = match subject {
            Some(id) => {
                self.store
                    .watch_eq(REVIEWS, "subjectId", json!(id.as_str()))
                    .await?
            }
            None => self.store.watch(REVIEWS).await?,
        };
        Ok(ReviewsFeed { inner })
    }

    /// The update ids a student has already reviewed, used to suppress the
    /// review form. Advisory only: nothing stops a second review racing the
    /// refresh.
    pub async fn subscribe_reviewed_updates(&self, student: &Uid) -> Result<ReviewedUpdatesFeed> {
        Ok(ReviewedUpdatesFeed {
            inner: self
                .store
                .watch_eq(REVIEWS, "studentId", json!(student.as_str()))
                .await?,
        })
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Appends one daily update and returns its assigned key.
    pub async fn add_daily_update(&self, update: NewDailyUpdate) -> Result<RecordKey> {
        self.store.push(UPDATES, serde_json::to_value(&update)?).await
    }

    /// Appends one review and returns its assigned key.
    pub async fn add_review(&self, review: NewReview) -> Result<RecordKey> {
        self.store.push(REVIEWS, serde_json::to_value(&review)?).await
    }

    /// Deletes every review. Irreversible; updates are untouched.
    pub async fn clear_all_reviews(&self) -> Result<()> {
        self.store.remove(REVIEWS).await
    }

    /// Writes the profile record at `users/{uid}`.
    pub async fn save_user_profile(&self, profile: &UserProfile) -> Result<()> {
        self.store
            .put(
                format!("{USERS}/{}", profile.uid),
                serde_json::to_value(profile)?,
            )
            .await
    }

    /// Writes the `registrationNumbers/{regNo}` index entry. Last writer
    /// wins; signup performs no transactional uniqueness check.
    pub async fn index_registration_number(
        &self,
        reg_no: &RegistrationNumber,
        uid: &Uid,
    ) -> Result<()> {
        self.store
            .put(
                format!("{REGISTRATION_NUMBERS}/{reg_no}"),
                json!({ "uid": uid.as_str() }),
            )
            .await
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Reads the profile snapshot at `users/{uid}`.
    pub async fn user_by_uid(&self, uid: &Uid) -> Result<Snapshot> {
        self.store.get(format!("{USERS}/{uid}")).await
    }

    /// Resolves a registration number to the user's profile snapshot.
    ///
    /// Two steps: index entry → uid → `users/{uid}`. When the index entry is
    /// absent the empty index snapshot is returned as-is; the caller checks
    /// [`Snapshot::exists`]; absence is not an error at this layer.
    pub async fn user_by_registration_number(
        &self,
        reg_no: &RegistrationNumber,
    ) -> Result<Snapshot> {
        let index = self
            .store
            .get(format!("{REGISTRATION_NUMBERS}/{reg_no}"))
            .await?;
        if !index.exists() {
            return Ok(index);
        }

        let entry: RegistrationEntry = index.decode()?;
        self.store.get(format!("{USERS}/{}", entry.uid)).await
    }
}

// =============================================================================
// Typed Feeds
// =============================================================================

/// Live feed of all daily updates, sorted descending by date.
pub struct UpdatesFeed {
    inner: CollectionSubscription,
}

impl UpdatesFeed {
    /// Next full snapshot of the updates list, newest first. `None` once the
    /// store has shut down.
    pub async fn next(&mut self) -> Option<Result<Vec<DailyUpdate>>> {
        let snapshot = self.inner.next().await?;
        Some(snapshot.and_then(decode_updates))
    }
}

/// Live feed of reviews, optionally subject-filtered.
pub struct ReviewsFeed {
    inner: CollectionSubscription,
}

impl ReviewsFeed {
    /// Next full snapshot of the review list.
    pub async fn next(&mut self) -> Option<Result<Vec<Review>>> {
        let snapshot = self.inner.next().await?;
        Some(snapshot.and_then(decode_reviews))
    }
}

/// Live feed of the update ids one student has reviewed.
pub struct ReviewedUpdatesFeed {
    inner: CollectionSubscription,
}

impl ReviewedUpdatesFeed {
    /// Next full list of reviewed update ids.
    pub async fn next(&mut self) -> Option<Result<Vec<RecordKey>>> {
        let snapshot = self.inner.next().await?;
        Some(snapshot.and_then(|snap| {
            Ok(decode_reviews(snap)?
                .into_iter()
                .map(|review| review.update_id)
                .collect())
        }))
    }
}

fn decode_updates(snapshot: Snapshot) -> Result<Vec<DailyUpdate>> {
    let mut updates: Vec<DailyUpdate> = snapshot
        .entries::<NewDailyUpdate>()?
        .into_iter()
        .map(|(key, record)| DailyUpdate::from_parts(key, record))
        .collect();
    updates.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(updates)
}

fn decode_reviews(snapshot: Snapshot) -> Result<Vec<Review>> {
    Ok(snapshot
        .entries::<NewReview>()?
        .into_iter()
        .map(|(key, record)| Review::from_parts(key, record))
        .collect())
}
