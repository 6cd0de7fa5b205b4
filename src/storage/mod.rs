//! Storage module: repository traits, adapters and configuration.
//!
//! The engine only talks to the traits below. Each one is a narrow,
//! per-user-namespaced view of a document store:
//! - `get` / `set(merge)` for single records
//! - atomic increments and add-if-absent for ledger fields
//! - compare-and-set for the streak fields
//! - batch writes, atomic within one call
//! - equality and date-range queries
//!
//! Two adapters are provided: [`MemoryStore`] and [`SqliteStore`].

pub mod config;
pub mod database;
pub mod memory;
pub mod schema;

use std::future::Future;

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::carbon::types::{ActivityRecord, LifestyleProfile};
use crate::challenges::types::{ChallengeDefinition, ChallengeEnrollment};
use crate::gamification::types::{CreditOutcome, GamificationProfile, LedgerDelta, StreakState};
use crate::personalized::types::ChallengeCacheEntry;

pub use config::{
    AppConfig, CacheSettings, ConfigError, DatabaseSettings, GeneratorSettings, ScoringSettings,
};
pub use database::SqliteStore;
pub use memory::MemoryStore;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Record already exists: {0}")]
    Conflict(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::QueryFailed(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}

/// Daily activity records, unique per (user, date).
pub trait ActivityStore: Send + Sync {
    /// Insert or replace the record for its (user, date).
    fn upsert_activity(
        &self,
        record: &ActivityRecord,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn get_activity(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Option<ActivityRecord>, StorageError>> + Send;

    /// Records with `from <= date <= to`, oldest first.
    fn activities_between(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> impl Future<Output = Result<Vec<ActivityRecord>, StorageError>> + Send;

    /// Most recent record by date.
    fn latest_activity(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Option<ActivityRecord>, StorageError>> + Send;

    /// Every logged date, ascending.
    fn activity_dates(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Vec<NaiveDate>, StorageError>> + Send;
}

/// Points, badges and streak fields.
///
/// Point changes are atomic increments and badge inserts are add-if-absent, so
/// concurrent writers for the same user never lose updates.
pub trait LedgerStore: Send + Sync {
    /// The user's profile, or the zero state if none exists yet.
    fn read_profile(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<GamificationProfile, StorageError>> + Send;

    /// Merge the streak fields; points and badges are untouched.
    fn save_streak(
        &self,
        user_id: Uuid,
        streak: &StreakState,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Merge the streak fields only if the stored `last_log_date` still equals
    /// `expected_last`. Returns false, writing nothing, when another writer got
    /// there first.
    fn compare_and_save_streak(
        &self,
        user_id: Uuid,
        expected_last: Option<NaiveDate>,
        streak: &StreakState,
    ) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// Increment points and union badges.
    fn apply_delta(
        &self,
        user_id: Uuid,
        delta: &LedgerDelta,
    ) -> impl Future<Output = Result<GamificationProfile, StorageError>> + Send;

    /// Apply the delta only if `credit_key` has never been credited for this
    /// user. The check, the marker and the increment happen in one atomic step.
    fn apply_delta_once(
        &self,
        user_id: Uuid,
        credit_key: &str,
        delta: &LedgerDelta,
    ) -> impl Future<Output = Result<CreditOutcome, StorageError>> + Send;

    fn has_credit(
        &self,
        user_id: Uuid,
        credit_key: &str,
    ) -> impl Future<Output = Result<bool, StorageError>> + Send;
}

/// Challenge definitions and per-user enrollments.
pub trait ChallengeStore: Send + Sync {
    fn get_challenge(
        &self,
        challenge_id: &str,
    ) -> impl Future<Output = Result<Option<ChallengeDefinition>, StorageError>> + Send;

    fn list_challenges(
        &self,
    ) -> impl Future<Output = Result<Vec<ChallengeDefinition>, StorageError>> + Send;

    fn upsert_challenge(
        &self,
        challenge: &ChallengeDefinition,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn enrollments(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Vec<ChallengeEnrollment>, StorageError>> + Send;

    fn get_enrollment(
        &self,
        user_id: Uuid,
        challenge_id: &str,
    ) -> impl Future<Output = Result<Option<ChallengeEnrollment>, StorageError>> + Send;

    /// Create an enrollment; `Conflict` if one already exists.
    fn insert_enrollment(
        &self,
        enrollment: &ChallengeEnrollment,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Delete an incomplete enrollment. Returns false if nothing was deleted
    /// (missing, or completed and therefore permanent).
    fn delete_enrollment(
        &self,
        user_id: Uuid,
        challenge_id: &str,
    ) -> impl Future<Output = Result<bool, StorageError>> + Send;

    /// Write progress for several enrollments as one atomic batch.
    ///
    /// Update-only: an enrollment with no stored row (never joined, or left)
    /// is skipped. Stored rows that are completed, or whose progress is ahead
    /// of the incoming value, are left untouched, so progress never goes down.
    fn write_enrollments(
        &self,
        user_id: Uuid,
        enrollments: &[ChallengeEnrollment],
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Personalized challenge cache entries and generation usage.
pub trait CacheStore: Send + Sync {
    fn get_cache_entry(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Option<ChallengeCacheEntry>, StorageError>> + Send;

    fn put_cache_entry(
        &self,
        entry: &ChallengeCacheEntry,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Atomically bump the generation counter, returning the new value.
    fn increment_generation_count(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<u64, StorageError>> + Send;

    fn generation_count(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<u64, StorageError>> + Send;
}

/// Onboarding lifestyle profiles.
pub trait ProfileStore: Send + Sync {
    fn get_lifestyle_profile(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Option<LifestyleProfile>, StorageError>> + Send;

    fn put_lifestyle_profile(
        &self,
        user_id: Uuid,
        profile: &LifestyleProfile,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Everything the engine needs from storage.
pub trait EcoStore: ActivityStore + LedgerStore + ChallengeStore + CacheStore + ProfileStore {}

impl<T> EcoStore for T where T: ActivityStore + LedgerStore + ChallengeStore + CacheStore + ProfileStore {}
