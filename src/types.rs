//! # Domain Types
//!
//! Core types for the classroom domain: subjects, daily updates, reviews and
//! user profiles, plus the string newtypes that keep their identifiers from
//! being mixed up ([`Uid`], [`RecordKey`], [`SubjectId`],
//! [`RegistrationNumber`]).
//!
//! Records come in two forms, mirroring how they live in the store:
//!
//! - **Input form** ([`NewDailyUpdate`], [`NewReview`]): what gets written.
//!   The store key is not part of the payload.
//! - **Stored form** ([`DailyUpdate`], [`Review`]): input form plus the
//!   auto-generated key, reassembled when a snapshot is decoded.
//!
//! Serialized field names use the store's wire spelling (`subjectId`,
//! `teacherName`, `photoURL`, ...), so records written by this crate are
//! byte-compatible with the collections it reads.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// =============================================================================
// Identifier Newtypes
// =============================================================================

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw string value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the string representation.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id! {
    /// Auth-assigned user identifier.
    Uid
}

string_id! {
    /// A record's key within its collection, assigned by the store on insert.
    ///
    /// Generated keys are chronologically sortable: ascending key order is
    /// insertion order.
    RecordKey
}

string_id! {
    /// Identifier of a subject, either from the fixed table or a slug derived
    /// from a free-form subject name.
    SubjectId
}

string_id! {
    /// Student-chosen registration number, the alternate login key.
    RegistrationNumber
}

// =============================================================================
// Subjects
// =============================================================================

/// One entry of the fixed subject table. Immutable, not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subject {
    pub id: &'static str,
    pub name: &'static str,
}

/// The six subjects known at compile time.
pub const SUBJECTS: [Subject; 6] = [
    Subject { id: "english", name: "English" },
    Subject { id: "cs", name: "Computer Science" },
    Subject { id: "science", name: "Science" },
    Subject { id: "history", name: "History" },
    Subject { id: "business", name: "Business" },
    Subject { id: "mathematics", name: "Mathematics" },
];

/// Looks up a subject by its id.
pub fn subject_by_id(id: &str) -> Option<&'static Subject> {
    SUBJECTS.iter().find(|s| s.id == id)
}

/// Looks up a subject by name, case-insensitively.
pub fn subject_by_name(name: &str) -> Option<&'static Subject> {
    SUBJECTS.iter().find(|s| s.name.eq_ignore_ascii_case(name))
}

/// Resolves a subject name to an id: the fixed table when it matches, a slug
/// (lowercase, whitespace runs collapsed to `-`) otherwise.
pub fn subject_id_for_name(name: &str) -> SubjectId {
    if let Some(subject) = subject_by_name(name) {
        return SubjectId::new(subject.id);
    }
    let slug = name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    SubjectId::new(slug)
}

// =============================================================================
// Ratings
// =============================================================================

/// A star rating in `[1, 5]`, enforced at construction.
///
/// The store itself enforces nothing; this type is the only guard, so an
/// out-of-range value never reaches a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Creates a rating, rejecting values outside `[1, 5]`.
    pub fn new(stars: u8) -> Result<Self> {
        if (1..=5).contains(&stars) {
            Ok(Self(stars))
        } else {
            Err(Error::validation(format!(
                "rating must be between 1 and 5 stars, got {stars}"
            )))
        }
    }

    /// Returns the number of stars.
    pub fn stars(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = Error;

    fn try_from(stars: u8) -> Result<Self> {
        Rating::new(stars)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> u8 {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Daily Updates
// =============================================================================

/// Input form of a daily update: the payload written to `updates/{key}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDailyUpdate {
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub teacher_name: String,
    pub content: String,
    /// Submission time, stamped when the input form is built.
    pub date: DateTime<Utc>,
}

impl NewDailyUpdate {
    /// Builds a daily update from the posting form.
    ///
    /// Trims the fields, rejects any empty one before a write is attempted,
    /// resolves the subject id and stamps the submission time.
    pub fn new(
        subject_name: impl Into<String>,
        teacher_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Self> {
        let subject_name = subject_name.into().trim().to_string();
        let teacher_name = teacher_name.into().trim().to_string();
        let content = content.into().trim().to_string();

        if subject_name.is_empty() || teacher_name.is_empty() || content.is_empty() {
            return Err(Error::validation(
                "subject, teacher and update content are all required",
            ));
        }

        Ok(Self {
            subject_id: subject_id_for_name(&subject_name),
            subject_name,
            teacher_name,
            content,
            date: Utc::now(),
        })
    }
}

/// A stored daily update: a teacher-authored lesson note shown to students.
///
/// Never mutated or deleted in-app.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyUpdate {
    /// The store key under `updates/`.
    pub id: RecordKey,
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub teacher_name: String,
    pub content: String,
    pub date: DateTime<Utc>,
}

impl DailyUpdate {
    /// Reassembles a stored update from its key and decoded payload.
    pub fn from_parts(id: RecordKey, record: NewDailyUpdate) -> Self {
        Self {
            id,
            subject_id: record.subject_id,
            subject_name: record.subject_name,
            teacher_name: record.teacher_name,
            content: record.content,
            date: record.date,
        }
    }
}

// =============================================================================
// Reviews
// =============================================================================

/// Input form of a review: the payload written to `reviews/{key}`.
///
/// Carries denormalized copies of the update's subject fields and the
/// student's display data, exactly as the dashboard submits them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub update_id: RecordKey,
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub student_name: String,
    pub student_id: Uid,
    pub registration_number: RegistrationNumber,
    pub rating: Rating,
    pub comment: String,
    pub date: DateTime<Utc>,
}

impl NewReview {
    /// Builds a review of `update` by the given student, stamping the
    /// submission time. The rating was range-checked at construction.
    pub fn new(
        update: &DailyUpdate,
        student_name: impl Into<String>,
        student_id: Uid,
        registration_number: RegistrationNumber,
        rating: Rating,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            update_id: update.id.clone(),
            subject_id: update.subject_id.clone(),
            subject_name: update.subject_name.clone(),
            student_name: student_name.into(),
            student_id,
            registration_number,
            rating,
            comment: comment.into(),
            date: Utc::now(),
        }
    }
}

/// A stored review: one student's rating and comment on one daily update.
///
/// At most one per (student, update) pair by convention only; nothing
/// enforces uniqueness.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    /// The store key under `reviews/`.
    pub id: RecordKey,
    pub update_id: RecordKey,
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub student_name: String,
    pub student_id: Uid,
    pub registration_number: RegistrationNumber,
    pub rating: Rating,
    pub comment: String,
    pub date: DateTime<Utc>,
}

impl Review {
    /// Reassembles a stored review from its key and decoded payload.
    pub fn from_parts(id: RecordKey, record: NewReview) -> Self {
        Self {
            id,
            update_id: record.update_id,
            subject_id: record.subject_id,
            subject_name: record.subject_name,
            student_name: record.student_name,
            student_id: record.student_id,
            registration_number: record.registration_number,
            rating: record.rating,
            comment: record.comment,
            date: record.date,
        }
    }
}

// =============================================================================
// User Profiles
// =============================================================================

/// The record stored at `users/{uid}`, keyed by the auth-assigned identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: Uid,
    pub display_name: String,
    pub email: String,
    pub registration_number: RegistrationNumber,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_accepts_one_through_five() {
        for stars in 1..=5 {
            assert_eq!(Rating::new(stars).unwrap().stars(), stars);
        }
    }

    #[test]
    fn rating_rejects_out_of_range() {
        assert!(matches!(Rating::new(0), Err(Error::Validation(_))));
        assert!(matches!(Rating::new(6), Err(Error::Validation(_))));
    }

    #[test]
    fn rating_serializes_as_bare_integer() {
        let rating = Rating::new(4).unwrap();
        assert_eq!(serde_json::to_string(&rating).unwrap(), "4");

        let parsed: Rating = serde_json::from_str("5").unwrap();
        assert_eq!(parsed.stars(), 5);
        assert!(serde_json::from_str::<Rating>("9").is_err());
    }

    #[test]
    fn subject_lookup_is_case_insensitive() {
        assert_eq!(subject_by_name("mathematics").unwrap().id, "mathematics");
        assert_eq!(subject_by_name("Computer Science").unwrap().id, "cs");
        assert_eq!(subject_by_name("COMPUTER SCIENCE").unwrap().id, "cs");
        assert!(subject_by_name("Astrology").is_none());
    }

    #[test]
    fn unknown_subject_names_become_slugs() {
        assert_eq!(subject_id_for_name("Science").as_str(), "science");
        assert_eq!(
            subject_id_for_name("Moral  Education").as_str(),
            "moral-education"
        );
    }

    #[test]
    fn new_daily_update_requires_all_fields() {
        let err = NewDailyUpdate::new("Science", "  ", "Covered cells").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let update = NewDailyUpdate::new(" Mathematics ", "Mr. Rao", "Quadratics").unwrap();
        assert_eq!(update.subject_name, "Mathematics");
        assert_eq!(update.subject_id.as_str(), "mathematics");
    }

    #[test]
    fn new_daily_update_stamps_submission_time() {
        let before = Utc::now();
        let update = NewDailyUpdate::new("History", "Ms. Iyer", "The Mauryas").unwrap();
        let after = Utc::now();
        assert!(update.date >= before && update.date <= after);
    }

    #[test]
    fn records_serialize_with_store_field_names() {
        let update = NewDailyUpdate::new("Business", "Mr. Shah", "Balance sheets").unwrap();
        let value = serde_json::to_value(&update).unwrap();
        assert!(value.get("subjectId").is_some());
        assert!(value.get("teacherName").is_some());
        assert!(value.get("subject_id").is_none());

        let profile = UserProfile {
            uid: Uid::new("u-1"),
            display_name: "Priya".to_string(),
            email: "priya@example.com".to_string(),
            registration_number: RegistrationNumber::new("21CS123"),
            photo_url: None,
        };
        let value = serde_json::to_value(&profile).unwrap();
        assert!(value.get("displayName").is_some());
        assert!(value.get("photoURL").is_some());
        assert!(value.get("registrationNumber").is_some());
    }

    #[test]
    fn review_round_trips_through_store_payload() {
        let update = DailyUpdate::from_parts(
            RecordKey::new("k1"),
            NewDailyUpdate::new("Science", "Dr. Bose", "Photosynthesis").unwrap(),
        );
        let review = NewReview::new(
            &update,
            "Arun",
            Uid::new("uid-7"),
            RegistrationNumber::new("21CS007"),
            Rating::new(4).unwrap(),
            "Clear explanation",
        );

        let payload = serde_json::to_value(&review).unwrap();
        assert_eq!(payload["updateId"], "k1");
        assert_eq!(payload["rating"], 4);

        let decoded: NewReview = serde_json::from_value(payload).unwrap();
        let stored = Review::from_parts(RecordKey::new("r1"), decoded);
        assert_eq!(stored.update_id, update.id);
        assert_eq!(stored.rating.stars(), 4);
    }
}
