//! Engine facade.
//!
//! A daily submission is persisted first; the streak update and challenge
//! evaluation run afterwards as best-effort secondary effects. Their failures
//! are logged and never undo or fail the primary write. Anything they leave
//! behind is repaired by [`EcoEngine::reconcile_user`].

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::carbon::calculator::CarbonCalculator;
use crate::carbon::types::{ActivityRecord, CarbonBreakdown, DailyAnswers, ImpactLevel, LifestyleProfile};
use crate::challenges::catalog::default_challenges;
use crate::challenges::{ChallengeDefinition, ChallengeEnrollment, ChallengeError, ChallengeManager};
use crate::gamification::streak::replay;
use crate::gamification::types::{credit_keys, LedgerDelta, StreakState};
use crate::gamification::{GamificationLedger, GamificationProfile, StreakTracker, StreakUpdate};
use crate::personalized::{ChallengeGenerator, PersonalizedChallengeCache, PersonalizedChallenges};
use crate::storage::config::{AppConfig, ConfigError};
use crate::storage::{EcoStore, StorageError};

/// Engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Challenge(#[from] ChallengeError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Outcome of a daily submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionResult {
    pub date: NaiveDate,
    pub total: f64,
    pub breakdown: CarbonBreakdown,
    pub impact: ImpactLevel,
    /// None when the streak update failed
    pub streak: Option<StreakUpdate>,
    /// Enrollments that progressed; None when evaluation failed
    pub challenge_updates: Option<usize>,
}

/// Ledger view with the derived level.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    #[serde(flatten)]
    pub profile: GamificationProfile,
    pub level: u32,
    pub best_streak: u32,
}

impl From<GamificationProfile> for ProfileSummary {
    fn from(profile: GamificationProfile) -> Self {
        Self {
            level: profile.level(),
            best_streak: profile.best_streak(),
            profile,
        }
    }
}

/// What a reconcile pass repaired.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    pub logged_days: usize,
    pub streak: StreakState,
    pub daily_credits: usize,
    pub milestone_credits: usize,
    /// Enrollments whose progress was caught up from activity records
    pub challenge_progress: usize,
    pub challenge_credits: usize,
    pub total_points: u64,
}

/// Eco-activity scoring and progression engine.
pub struct EcoEngine<S, G> {
    store: Arc<S>,
    ledger: GamificationLedger<S>,
    streaks: StreakTracker<S>,
    challenges: ChallengeManager<S>,
    cache: PersonalizedChallengeCache<S, G>,
    daily_log_points: u32,
}

impl<S: EcoStore, G: ChallengeGenerator> EcoEngine<S, G> {
    pub fn new(store: Arc<S>, generator: Arc<G>, config: &AppConfig) -> Self {
        let daily_log_points = config.scoring.daily_log_points;
        Self {
            ledger: GamificationLedger::new(store.clone()),
            streaks: StreakTracker::new(store.clone(), daily_log_points),
            challenges: ChallengeManager::new(store.clone()),
            cache: PersonalizedChallengeCache::new(
                store.clone(),
                generator,
                config.cache.clone(),
                &config.generator,
            ),
            store,
            daily_log_points,
        }
    }

    /// Write the built-in catalog to the store.
    pub async fn seed_catalog(&self) -> Result<usize, EngineError> {
        let catalog = default_challenges();
        for challenge in &catalog {
            self.store.upsert_challenge(challenge).await?;
        }
        tracing::debug!("Seeded {} catalog challenges", catalog.len());
        Ok(catalog.len())
    }

    /// Record a day's activity.
    pub async fn submit_daily_activity(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        answers: DailyAnswers,
    ) -> Result<SubmissionResult, EngineError> {
        if answers.is_empty() {
            return Err(EngineError::Validation(
                "submission has no answers".to_string(),
            ));
        }

        let baseline = match self.store.get_lifestyle_profile(user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!("Baseline profile unavailable for {}: {}", user_id, e);
                None
            }
        };
        let breakdown = CarbonCalculator::calculate(baseline.as_ref(), &answers);

        let mut record = ActivityRecord::new(user_id, date, answers, breakdown);
        if let Some(existing) = self.store.get_activity(user_id, date).await? {
            record.created_at = existing.created_at;
        }
        self.store.upsert_activity(&record).await?;
        tracing::info!(
            "{} logged {}: {:.2} kg CO2e ({})",
            user_id,
            date,
            breakdown.total,
            breakdown.impact()
        );

        let streak = match self.streaks.record_submission(user_id, date).await {
            Ok(update) => Some(update),
            Err(e) => {
                tracing::warn!("Streak update failed for {} on {}: {}", user_id, date, e);
                None
            }
        };

        let challenge_updates = match self
            .challenges
            .evaluate(user_id, date, &record.answers, &breakdown)
            .await
        {
            Ok(updated) => Some(updated.len()),
            Err(e) => {
                tracing::warn!("Challenge evaluation failed for {} on {}: {}", user_id, date, e);
                None
            }
        };

        Ok(SubmissionResult {
            date,
            total: breakdown.total,
            breakdown,
            impact: breakdown.impact(),
            streak,
            challenge_updates,
        })
    }

    /// Personalized challenges, from the cache when valid. Never fails.
    pub async fn get_personalized_challenges(&self, user_id: Uuid) -> PersonalizedChallenges {
        let (profile, footprint) = self.personalization_inputs(user_id).await;
        self.cache
            .get_challenges(user_id, &profile, footprint)
            .await
    }

    /// Regenerate personalized challenges, bypassing the cache. Never fails.
    pub async fn refresh_challenges(&self, user_id: Uuid) -> PersonalizedChallenges {
        let (profile, footprint) = self.personalization_inputs(user_id).await;
        self.cache.refresh(user_id, &profile, footprint).await
    }

    /// Profile and current footprint: the latest logged total, or the
    /// baseline estimate when nothing has been logged.
    async fn personalization_inputs(&self, user_id: Uuid) -> (LifestyleProfile, f64) {
        let profile = match self.store.get_lifestyle_profile(user_id).await {
            Ok(profile) => profile.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Lifestyle profile unavailable for {}: {}", user_id, e);
                LifestyleProfile::default()
            }
        };

        let footprint = match self.store.latest_activity(user_id).await {
            Ok(Some(record)) => record.breakdown.total,
            Ok(None) => CarbonCalculator::baseline(&profile).total,
            Err(e) => {
                tracing::warn!("Latest activity unavailable for {}: {}", user_id, e);
                CarbonCalculator::baseline(&profile).total
            }
        };

        (profile, footprint)
    }

    /// Join a catalog challenge or one from the user's personalized set.
    pub async fn join_challenge(
        &self,
        user_id: Uuid,
        challenge_id: &str,
    ) -> Result<ChallengeEnrollment, EngineError> {
        let definition = self.find_challenge(user_id, challenge_id).await?;
        Ok(self.challenges.join(user_id, &definition).await?)
    }

    async fn find_challenge(
        &self,
        user_id: Uuid,
        challenge_id: &str,
    ) -> Result<ChallengeDefinition, EngineError> {
        if let Some(definition) = self.store.get_challenge(challenge_id).await? {
            return Ok(definition);
        }

        self.store
            .get_cache_entry(user_id)
            .await?
            .and_then(|entry| entry.find(challenge_id).cloned())
            .ok_or_else(|| ChallengeError::NotFound(challenge_id.to_string()).into())
    }

    /// Leave an incomplete challenge.
    pub async fn leave_challenge(&self, user_id: Uuid, challenge_id: &str) -> Result<(), EngineError> {
        Ok(self.challenges.leave(user_id, challenge_id).await?)
    }

    pub async fn active_enrollments(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ChallengeEnrollment>, EngineError> {
        Ok(self.challenges.active(user_id).await?)
    }

    pub async fn gamification_profile(&self, user_id: Uuid) -> Result<ProfileSummary, EngineError> {
        Ok(self.ledger.read(user_id).await?.into())
    }

    pub async fn set_lifestyle_profile(
        &self,
        user_id: Uuid,
        profile: &LifestyleProfile,
    ) -> Result<(), EngineError> {
        self.store.put_lifestyle_profile(user_id, profile).await?;
        Ok(())
    }

    /// Recompute gamification state from retained activity records.
    ///
    /// The streak is rebuilt from the logged dates, open enrollments are
    /// caught up with activity logged while enrolled, and every credit that
    /// should exist is applied through its idempotency key, so running this
    /// any number of times converges on the same ledger.
    pub async fn reconcile_user(&self, user_id: Uuid) -> Result<ReconcileReport, EngineError> {
        let dates = self.store.activity_dates(user_id).await?;
        let replayed = replay(&dates);
        self.store.save_streak(user_id, &replayed.state).await?;

        let mut report = ReconcileReport {
            logged_days: dates.len(),
            streak: replayed.state,
            ..Default::default()
        };

        let daily = LedgerDelta::points(self.daily_log_points);
        for date in &dates {
            let outcome = self
                .ledger
                .credit_once(user_id, &credit_keys::daily(*date), &daily)
                .await?;
            if outcome.applied {
                report.daily_credits += 1;
            }
        }

        for milestone in &replayed.milestones {
            let delta = LedgerDelta::points(milestone.bonus_points).with_badge(milestone.badge);
            let outcome = self
                .ledger
                .credit_once(user_id, &credit_keys::streak(milestone.badge), &delta)
                .await?;
            if outcome.applied {
                report.milestone_credits += 1;
            }
        }

        if let (Some(first), Some(last)) = (dates.first(), dates.last()) {
            let records = self.store.activities_between(user_id, *first, *last).await?;
            report.challenge_progress = self.challenges.replay(user_id, &records).await?;
        }
        report.challenge_credits = self.challenges.credit_completed(user_id).await?;
        report.total_points = self.ledger.read(user_id).await?.eco_points;

        tracing::info!(
            "Reconciled {}: {} days, streak {}, {} enrollments caught up, {} daily / {} milestone / {} challenge credits repaired",
            user_id,
            report.logged_days,
            report.streak.current_streak,
            report.challenge_progress,
            report.daily_credits,
            report.milestone_credits,
            report.challenge_credits
        );
        Ok(report)
    }

    /// Generation calls made for a user so far.
    pub async fn generation_count(&self, user_id: Uuid) -> Result<u64, EngineError> {
        Ok(self.store.generation_count(user_id).await?)
    }

    /// Stored activity for one date.
    pub async fn activity(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<ActivityRecord>, EngineError> {
        Ok(self.store.get_activity(user_id, date).await?)
    }

    /// Today's date in UTC.
    pub fn today() -> NaiveDate {
        Utc::now().date_naive()
    }
}
