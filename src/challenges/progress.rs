//! Challenge progress tracking, joining and completion rewards.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::criteria::{is_satisfied, DayActivity};
use super::types::{ChallengeDefinition, ChallengeEnrollment, ChallengeError, ProgressStep};
use crate::carbon::types::{ActivityRecord, CarbonBreakdown, DailyAnswers};
use crate::gamification::types::LedgerDelta;
use crate::storage::{ChallengeStore, LedgerStore, StorageError};

/// Enrollments touched by one day's evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressEvaluation {
    /// Every enrollment whose progress moved, including completions
    pub updated: Vec<ChallengeEnrollment>,
    /// Challenge ids completed by this evaluation
    pub completed: Vec<String>,
}

impl ProgressEvaluation {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty()
    }
}

/// Advance every open enrollment the day's activity satisfies.
pub fn evaluate_enrollments(
    enrollments: Vec<ChallengeEnrollment>,
    date: NaiveDate,
    answers: &DailyAnswers,
    breakdown: &CarbonBreakdown,
    now: DateTime<Utc>,
) -> ProgressEvaluation {
    let day = DayActivity::new(answers, breakdown);
    let mut evaluation = ProgressEvaluation::default();

    for mut enrollment in enrollments {
        if enrollment.is_completed || !is_satisfied(&enrollment.criteria, day) {
            continue;
        }
        match enrollment.record_progress(date, now) {
            ProgressStep::Advanced => evaluation.updated.push(enrollment),
            ProgressStep::Completed => {
                evaluation.completed.push(enrollment.challenge_id.clone());
                evaluation.updated.push(enrollment);
            }
            ProgressStep::AlreadyCounted | ProgressStep::Closed => {}
        }
    }

    evaluation
}

/// Rebuild open enrollments' progress from retained activity records.
///
/// A record counts toward an enrollment only if it was submitted while the
/// user was enrolled, matching what live evaluation would have seen. Records
/// are applied oldest date first, so days already counted are skipped.
pub fn replay_enrollments(
    enrollments: Vec<ChallengeEnrollment>,
    records: &[ActivityRecord],
    now: DateTime<Utc>,
) -> ProgressEvaluation {
    let mut ordered: Vec<&ActivityRecord> = records.iter().collect();
    ordered.sort_by_key(|record| record.date);

    let mut evaluation = ProgressEvaluation::default();
    for mut enrollment in enrollments {
        let before = enrollment.progress;
        for record in &ordered {
            if enrollment.is_completed {
                break;
            }
            if record.updated_at < enrollment.joined_at
                || !is_satisfied(
                    &enrollment.criteria,
                    DayActivity::new(&record.answers, &record.breakdown),
                )
            {
                continue;
            }
            enrollment.record_progress(record.date, now);
        }

        if enrollment.progress > before {
            if enrollment.is_completed {
                evaluation.completed.push(enrollment.challenge_id.clone());
            }
            evaluation.updated.push(enrollment);
        }
    }

    evaluation
}

/// Challenge manager.
///
/// Progress for all of a user's enrollments is written as one batch; rewards
/// are a second step keyed by challenge id, so a crash between the two is
/// repaired by [`ChallengeManager::credit_completed`].
pub struct ChallengeManager<S> {
    store: Arc<S>,
}

impl<S: ChallengeStore + LedgerStore> ChallengeManager<S> {
    /// Create a new challenge manager.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Join a challenge.
    pub async fn join(
        &self,
        user_id: Uuid,
        definition: &ChallengeDefinition,
    ) -> Result<ChallengeEnrollment, ChallengeError> {
        if let Some(existing) = self.store.get_enrollment(user_id, &definition.id).await? {
            return Err(if existing.is_completed {
                ChallengeError::AlreadyCompleted
            } else {
                ChallengeError::AlreadyJoined
            });
        }

        let enrollment = ChallengeEnrollment::new(user_id, definition, Utc::now());
        match self.store.insert_enrollment(&enrollment).await {
            Ok(()) => {}
            Err(StorageError::Conflict(_)) => return Err(ChallengeError::AlreadyJoined),
            Err(e) => return Err(e.into()),
        }

        tracing::info!("{} joined challenge {}", user_id, definition.id);
        Ok(enrollment)
    }

    /// Leave a challenge. Completed enrollments are permanent.
    pub async fn leave(&self, user_id: Uuid, challenge_id: &str) -> Result<(), ChallengeError> {
        let existing = self
            .store
            .get_enrollment(user_id, challenge_id)
            .await?
            .ok_or(ChallengeError::NotJoined)?;

        if existing.is_completed {
            return Err(ChallengeError::AlreadyCompleted);
        }

        if !self.store.delete_enrollment(user_id, challenge_id).await? {
            // Completed (or removed) between the read and the delete
            return Err(ChallengeError::AlreadyCompleted);
        }

        tracing::info!("{} left challenge {}", user_id, challenge_id);
        Ok(())
    }

    /// Enrollments still in progress.
    pub async fn active(&self, user_id: Uuid) -> Result<Vec<ChallengeEnrollment>, ChallengeError> {
        let mut enrollments = self.store.enrollments(user_id).await?;
        enrollments.retain(|e| !e.is_completed);
        Ok(enrollments)
    }

    /// Evaluate a day's activity against every open enrollment.
    ///
    /// Returns the enrollments whose progress moved. A failed reward credit is
    /// logged and left for [`Self::credit_completed`] to retry.
    pub async fn evaluate(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        answers: &DailyAnswers,
        breakdown: &CarbonBreakdown,
    ) -> Result<Vec<ChallengeEnrollment>, ChallengeError> {
        let open = self.active(user_id).await?;
        if open.is_empty() {
            return Ok(Vec::new());
        }

        let evaluation = evaluate_enrollments(open, date, answers, breakdown, Utc::now());
        if evaluation.is_empty() {
            return Ok(Vec::new());
        }

        self.store.write_enrollments(user_id, &evaluation.updated).await?;
        tracing::debug!(
            "{}: {} enrollments progressed on {}",
            user_id,
            evaluation.updated.len(),
            date
        );

        for enrollment in evaluation.updated.iter().filter(|e| e.is_completed) {
            if let Err(e) = self.credit(enrollment).await {
                tracing::warn!(
                    "Reward credit for {} / {} failed, will retry on reconcile: {}",
                    user_id,
                    enrollment.challenge_id,
                    e
                );
            }
        }

        Ok(evaluation.updated)
    }

    /// Catch open enrollments up with activity whose progress write was lost.
    ///
    /// Returns how many enrollments moved. Rewards are left to
    /// [`Self::credit_completed`].
    pub async fn replay(
        &self,
        user_id: Uuid,
        records: &[ActivityRecord],
    ) -> Result<usize, ChallengeError> {
        let open = self.active(user_id).await?;
        if open.is_empty() || records.is_empty() {
            return Ok(0);
        }

        let evaluation = replay_enrollments(open, records, Utc::now());
        if evaluation.is_empty() {
            return Ok(0);
        }

        self.store.write_enrollments(user_id, &evaluation.updated).await?;
        tracing::info!(
            "{}: replay moved {} enrollments ({} completed)",
            user_id,
            evaluation.updated.len(),
            evaluation.completed.len()
        );
        Ok(evaluation.updated.len())
    }

    /// Credit rewards for completed enrollments that were never paid.
    ///
    /// Returns how many credits were applied.
    pub async fn credit_completed(&self, user_id: Uuid) -> Result<usize, ChallengeError> {
        let mut applied = 0;
        for enrollment in self.store.enrollments(user_id).await? {
            if enrollment.is_completed && self.credit(&enrollment).await? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Apply an enrollment's reward once. Returns whether it was applied now.
    async fn credit(&self, enrollment: &ChallengeEnrollment) -> Result<bool, StorageError> {
        let mut delta = LedgerDelta::points(enrollment.reward.points);
        if let Some(badge) = &enrollment.reward.badge {
            delta = delta.with_badge(badge.clone());
        }

        let outcome = self
            .store
            .apply_delta_once(enrollment.user_id, &enrollment.credit_key(), &delta)
            .await?;

        if outcome.applied {
            tracing::info!(
                "{} completed {}: +{} points",
                enrollment.user_id,
                enrollment.challenge_id,
                enrollment.reward.points
            );
        }
        Ok(outcome.applied)
    }
}
