//! Personalized challenge types and error definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::challenges::types::ChallengeDefinition;

/// Error types for challenge generation.
///
/// None of these reach a caller asking for challenges; every one of them
/// degrades to the static fallback set.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Generative service returned an error
    #[error("Generative API error: {0}")]
    Api(String),

    /// Call exceeded its time budget
    #[error("Generation timed out after {0}s")]
    Timeout(u64),

    /// Response did not contain a usable challenge payload
    #[error("Malformed generation response: {0}")]
    Malformed(String),

    /// Service unreachable
    #[error("Generative service unreachable")]
    Offline,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Storage failure while reading context or writing the cache
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}

impl From<serde_json::Error> for GenerationError {
    fn from(err: serde_json::Error) -> Self {
        GenerationError::Malformed(err.to_string())
    }
}

/// Cached generated challenge set for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeCacheEntry {
    pub user_id: Uuid,
    pub challenges: Vec<ChallengeDefinition>,
    /// Hash of the inputs the set was generated for
    pub fingerprint: String,
    /// Daily footprint (kg CO2e) at generation time
    pub footprint_snapshot: f64,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ChallengeCacheEntry {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Age in seconds at `now`.
    pub fn age_secs_at(&self, now: DateTime<Utc>) -> i64 {
        (now - self.generated_at).num_seconds().max(0)
    }

    pub fn find(&self, challenge_id: &str) -> Option<&ChallengeDefinition> {
        self.challenges.iter().find(|c| c.id == challenge_id)
    }
}

/// Where a challenge list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeSource {
    /// Served from a valid cache entry
    Cache,
    /// Freshly generated
    Generated,
    /// Static fallback after a generation failure
    Fallback,
}

/// Challenge list handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalizedChallenges {
    pub challenges: Vec<ChallengeDefinition>,
    pub from_cache: bool,
    /// Seconds since the served entry was generated; only set on a cache hit
    pub cache_age_secs: Option<i64>,
    pub source: ChallengeSource,
}

impl PersonalizedChallenges {
    pub fn cached(entry: &ChallengeCacheEntry, now: DateTime<Utc>) -> Self {
        Self {
            challenges: entry.challenges.clone(),
            from_cache: true,
            cache_age_secs: Some(entry.age_secs_at(now)),
            source: ChallengeSource::Cache,
        }
    }

    pub fn generated(challenges: Vec<ChallengeDefinition>) -> Self {
        Self {
            challenges,
            from_cache: false,
            cache_age_secs: None,
            source: ChallengeSource::Generated,
        }
    }

    pub fn fallback() -> Self {
        Self {
            challenges: crate::challenges::catalog::fallback_challenges(),
            from_cache: false,
            cache_age_secs: None,
            source: ChallengeSource::Fallback,
        }
    }
}
