//! In-process store.
//!
//! Every operation takes the state lock once, so each call is atomic the same
//! way a single transaction is in [`super::SqliteStore`].

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ActivityStore, CacheStore, ChallengeStore, LedgerStore, ProfileStore, StorageError};
use crate::carbon::types::{ActivityRecord, LifestyleProfile};
use crate::challenges::types::{ChallengeDefinition, ChallengeEnrollment};
use crate::gamification::types::{CreditOutcome, GamificationProfile, LedgerDelta, StreakState};
use crate::personalized::types::ChallengeCacheEntry;

#[derive(Default)]
struct MemoryState {
    activities: BTreeMap<(Uuid, NaiveDate), ActivityRecord>,
    profiles: HashMap<Uuid, GamificationProfile>,
    credits: HashSet<(Uuid, String)>,
    challenges: BTreeMap<String, ChallengeDefinition>,
    enrollments: BTreeMap<(Uuid, String), ChallengeEnrollment>,
    cache: HashMap<Uuid, ChallengeCacheEntry>,
    generation_counts: HashMap<Uuid, u64>,
    lifestyle: HashMap<Uuid, LifestyleProfile>,
}

impl MemoryState {
    fn apply(&mut self, user_id: Uuid, delta: &LedgerDelta) -> GamificationProfile {
        let profile = self
            .profiles
            .entry(user_id)
            .or_insert_with(|| GamificationProfile::empty(user_id));
        profile.eco_points += u64::from(delta.points);
        profile.badges.extend(delta.badges.iter().cloned());
        profile.updated_at = Some(Utc::now());
        profile.clone()
    }

    fn profile(&self, user_id: Uuid) -> GamificationProfile {
        self.profiles
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| GamificationProfile::empty(user_id))
    }
}

/// Store backed by in-process maps.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActivityStore for MemoryStore {
    async fn upsert_activity(&self, record: &ActivityRecord) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        state
            .activities
            .insert((record.user_id, record.date), record.clone());
        Ok(())
    }

    async fn get_activity(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<ActivityRecord>, StorageError> {
        let state = self.state.read().await;
        Ok(state.activities.get(&(user_id, date)).cloned())
    }

    async fn activities_between(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ActivityRecord>, StorageError> {
        if from > to {
            return Ok(Vec::new());
        }
        let state = self.state.read().await;
        Ok(state
            .activities
            .range((user_id, from)..=(user_id, to))
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn latest_activity(&self, user_id: Uuid) -> Result<Option<ActivityRecord>, StorageError> {
        let state = self.state.read().await;
        Ok(state
            .activities
            .range((user_id, NaiveDate::MIN)..=(user_id, NaiveDate::MAX))
            .next_back()
            .map(|(_, record)| record.clone()))
    }

    async fn activity_dates(&self, user_id: Uuid) -> Result<Vec<NaiveDate>, StorageError> {
        let state = self.state.read().await;
        Ok(state
            .activities
            .range((user_id, NaiveDate::MIN)..=(user_id, NaiveDate::MAX))
            .map(|((_, date), _)| *date)
            .collect())
    }
}

fn set_streak(profile: &mut GamificationProfile, streak: &StreakState) {
    profile.daily_log_streak = streak.current_streak;
    profile.last_log_date = streak.last_log_date;
    profile.streak_start_date = streak.streak_start_date;
    profile.previous_best_streak = streak.previous_best_streak;
    profile.updated_at = Some(Utc::now());
}

impl LedgerStore for MemoryStore {
    async fn read_profile(&self, user_id: Uuid) -> Result<GamificationProfile, StorageError> {
        Ok(self.state.read().await.profile(user_id))
    }

    async fn save_streak(&self, user_id: Uuid, streak: &StreakState) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let profile = state
            .profiles
            .entry(user_id)
            .or_insert_with(|| GamificationProfile::empty(user_id));
        set_streak(profile, streak);
        Ok(())
    }

    async fn compare_and_save_streak(
        &self,
        user_id: Uuid,
        expected_last: Option<NaiveDate>,
        streak: &StreakState,
    ) -> Result<bool, StorageError> {
        let mut state = self.state.write().await;
        let profile = state
            .profiles
            .entry(user_id)
            .or_insert_with(|| GamificationProfile::empty(user_id));
        if profile.last_log_date != expected_last {
            return Ok(false);
        }
        set_streak(profile, streak);
        Ok(true)
    }

    async fn apply_delta(
        &self,
        user_id: Uuid,
        delta: &LedgerDelta,
    ) -> Result<GamificationProfile, StorageError> {
        Ok(self.state.write().await.apply(user_id, delta))
    }

    async fn apply_delta_once(
        &self,
        user_id: Uuid,
        credit_key: &str,
        delta: &LedgerDelta,
    ) -> Result<CreditOutcome, StorageError> {
        let mut state = self.state.write().await;
        if !state.credits.insert((user_id, credit_key.to_string())) {
            return Ok(CreditOutcome {
                applied: false,
                profile: state.profile(user_id),
            });
        }
        Ok(CreditOutcome {
            applied: true,
            profile: state.apply(user_id, delta),
        })
    }

    async fn has_credit(&self, user_id: Uuid, credit_key: &str) -> Result<bool, StorageError> {
        let state = self.state.read().await;
        Ok(state.credits.contains(&(user_id, credit_key.to_string())))
    }
}

impl ChallengeStore for MemoryStore {
    async fn get_challenge(
        &self,
        challenge_id: &str,
    ) -> Result<Option<ChallengeDefinition>, StorageError> {
        Ok(self.state.read().await.challenges.get(challenge_id).cloned())
    }

    async fn list_challenges(&self) -> Result<Vec<ChallengeDefinition>, StorageError> {
        Ok(self.state.read().await.challenges.values().cloned().collect())
    }

    async fn upsert_challenge(&self, challenge: &ChallengeDefinition) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        state
            .challenges
            .insert(challenge.id.clone(), challenge.clone());
        Ok(())
    }

    async fn enrollments(&self, user_id: Uuid) -> Result<Vec<ChallengeEnrollment>, StorageError> {
        let state = self.state.read().await;
        let mut enrollments: Vec<ChallengeEnrollment> = state
            .enrollments
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        enrollments.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));
        Ok(enrollments)
    }

    async fn get_enrollment(
        &self,
        user_id: Uuid,
        challenge_id: &str,
    ) -> Result<Option<ChallengeEnrollment>, StorageError> {
        let state = self.state.read().await;
        Ok(state
            .enrollments
            .get(&(user_id, challenge_id.to_string()))
            .cloned())
    }

    async fn insert_enrollment(&self, enrollment: &ChallengeEnrollment) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let key = (enrollment.user_id, enrollment.challenge_id.clone());
        if state.enrollments.contains_key(&key) {
            return Err(StorageError::Conflict(format!(
                "enrollment {}/{}",
                enrollment.user_id, enrollment.challenge_id
            )));
        }
        state.enrollments.insert(key, enrollment.clone());
        Ok(())
    }

    async fn delete_enrollment(&self, user_id: Uuid, challenge_id: &str) -> Result<bool, StorageError> {
        let mut state = self.state.write().await;
        let key = (user_id, challenge_id.to_string());
        match state.enrollments.get(&key) {
            Some(existing) if !existing.is_completed => {
                state.enrollments.remove(&key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn write_enrollments(
        &self,
        user_id: Uuid,
        enrollments: &[ChallengeEnrollment],
    ) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        for enrollment in enrollments.iter().filter(|e| e.user_id == user_id) {
            let key = (user_id, enrollment.challenge_id.clone());
            // Left or never joined: nothing to update
            let Some(existing) = state.enrollments.get_mut(&key) else {
                continue;
            };
            if existing.is_completed || enrollment.progress < existing.progress {
                continue;
            }
            existing.progress = enrollment.progress;
            existing.is_completed = enrollment.is_completed;
            existing.last_progress_date = enrollment.last_progress_date;
            existing.completed_at = enrollment.completed_at;
        }
        Ok(())
    }
}

impl CacheStore for MemoryStore {
    async fn get_cache_entry(&self, user_id: Uuid) -> Result<Option<ChallengeCacheEntry>, StorageError> {
        Ok(self.state.read().await.cache.get(&user_id).cloned())
    }

    async fn put_cache_entry(&self, entry: &ChallengeCacheEntry) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        state.cache.insert(entry.user_id, entry.clone());
        Ok(())
    }

    async fn increment_generation_count(&self, user_id: Uuid) -> Result<u64, StorageError> {
        let mut state = self.state.write().await;
        let count = state.generation_counts.entry(user_id).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn generation_count(&self, user_id: Uuid) -> Result<u64, StorageError> {
        let state = self.state.read().await;
        Ok(state.generation_counts.get(&user_id).copied().unwrap_or(0))
    }
}

impl ProfileStore for MemoryStore {
    async fn get_lifestyle_profile(
        &self,
        user_id: Uuid,
    ) -> Result<Option<LifestyleProfile>, StorageError> {
        Ok(self.state.read().await.lifestyle.get(&user_id).cloned())
    }

    async fn put_lifestyle_profile(
        &self,
        user_id: Uuid,
        profile: &LifestyleProfile,
    ) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        state.lifestyle.insert(user_id, profile.clone());
        Ok(())
    }
}
