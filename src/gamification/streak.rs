//! Daily-logging streak state machine.
//!
//! `advance` is pure; `StreakTracker` applies its outcome to the ledger store.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;

use super::types::{
    credit_keys, milestone_for, LedgerDelta, StreakMilestone, StreakState, StreakUpdate,
};
use crate::storage::{LedgerStore, StorageError};

/// How a submission moved the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakTransition {
    /// First ever submission
    Started,
    /// Submitted the day after the last log
    Continued,
    /// Same day (or an earlier day) as the last log; nothing changes
    Unchanged,
    /// Gap of more than one day
    Reset { broken_streak: u32 },
}

/// Result of applying one submission date to a streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakOutcome {
    pub state: StreakState,
    pub transition: StreakTransition,
    /// Milestone newly reached and not yet held as a badge
    pub milestone: Option<StreakMilestone>,
}

/// Apply a submission for `date` to `state`.
///
/// `badges` is consulted so a milestone already held is never offered again.
pub fn advance(state: &StreakState, date: NaiveDate, badges: &BTreeSet<String>) -> StreakOutcome {
    let (next, transition) = match state.last_log_date {
        None => (
            StreakState {
                current_streak: 1,
                last_log_date: Some(date),
                streak_start_date: Some(date),
                previous_best_streak: state.previous_best_streak,
            },
            StreakTransition::Started,
        ),
        Some(last) => {
            let gap = (date - last).num_days();
            if gap <= 0 {
                (*state, StreakTransition::Unchanged)
            } else if gap == 1 {
                (
                    StreakState {
                        current_streak: state.current_streak + 1,
                        last_log_date: Some(date),
                        streak_start_date: state.streak_start_date.or(Some(date)),
                        previous_best_streak: state.previous_best_streak,
                    },
                    StreakTransition::Continued,
                )
            } else {
                (
                    StreakState {
                        current_streak: 1,
                        last_log_date: Some(date),
                        streak_start_date: Some(date),
                        previous_best_streak: state.previous_best_streak.max(state.current_streak),
                    },
                    StreakTransition::Reset {
                        broken_streak: state.current_streak,
                    },
                )
            }
        }
    };

    let milestone = match transition {
        StreakTransition::Unchanged => None,
        _ => milestone_for(next.current_streak).filter(|m| !badges.contains(m.badge)),
    };

    StreakOutcome {
        state: next,
        transition,
        milestone,
    }
}

/// Streak rebuilt from a full date history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakReplay {
    pub state: StreakState,
    /// Every milestone reached along the way, first occurrence only
    pub milestones: Vec<StreakMilestone>,
}

/// Rebuild streak state from scratch by folding over logged dates.
pub fn replay(dates: &[NaiveDate]) -> StreakReplay {
    let mut sorted: Vec<NaiveDate> = dates.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut state = StreakState::default();
    let mut earned = BTreeSet::new();
    let mut milestones = Vec::new();

    for date in sorted {
        let outcome = advance(&state, date, &earned);
        if let Some(milestone) = outcome.milestone {
            earned.insert(milestone.badge.to_string());
            milestones.push(milestone);
        }
        state = outcome.state;
    }

    StreakReplay { state, milestones }
}

/// Read-advance-write rounds before a contended submission gives up.
const MAX_STREAK_ATTEMPTS: usize = 5;

/// Applies streak outcomes to the ledger.
pub struct StreakTracker<S> {
    store: Arc<S>,
    daily_log_points: u32,
}

impl<S: LedgerStore> StreakTracker<S> {
    pub fn new(store: Arc<S>, daily_log_points: u32) -> Self {
        Self {
            store,
            daily_log_points,
        }
    }

    /// Record a submission for `date`.
    ///
    /// The daily point and milestone bonus are keyed credits, so resubmitting
    /// the same day, or retrying after a partial failure, never pays twice.
    /// The streak is written with compare-and-set on `last_log_date` and
    /// recomputed from a fresh read when a concurrent submission wins.
    pub async fn record_submission(
        &self,
        user_id: uuid::Uuid,
        date: NaiveDate,
    ) -> Result<StreakUpdate, StorageError> {
        let mut attempt = 0;
        let (profile, outcome) = loop {
            let profile = self.store.read_profile(user_id).await?;
            let outcome = advance(&profile.streak_state(), date, &profile.badges);
            if outcome.transition == StreakTransition::Unchanged {
                break (profile, outcome);
            }

            // Another submission may have moved the streak since the read
            if self
                .store
                .compare_and_save_streak(user_id, profile.last_log_date, &outcome.state)
                .await?
            {
                break (profile, outcome);
            }
            attempt += 1;
            if attempt >= MAX_STREAK_ATTEMPTS {
                return Err(StorageError::Conflict(format!("streak for {}", user_id)));
            }
            tracing::debug!("Streak for {} changed concurrently, retrying", user_id);
        };

        if let StreakTransition::Reset { broken_streak } = outcome.transition {
            tracing::info!(
                "Streak for {} reset after {} days (best {})",
                user_id,
                broken_streak,
                outcome.state.previous_best_streak
            );
        }

        let mut points_awarded = 0;
        let mut total_points = profile.eco_points;

        let daily = self
            .store
            .apply_delta_once(
                user_id,
                &credit_keys::daily(date),
                &LedgerDelta::points(self.daily_log_points),
            )
            .await?;
        if daily.applied {
            points_awarded += self.daily_log_points;
        }
        total_points = total_points.max(daily.profile.eco_points);

        let mut badge_awarded = None;
        if let Some(milestone) = outcome.milestone {
            let delta = LedgerDelta::points(milestone.bonus_points).with_badge(milestone.badge);
            let credit = self
                .store
                .apply_delta_once(user_id, &credit_keys::streak(milestone.badge), &delta)
                .await?;
            if credit.applied {
                tracing::info!("{} earned {} ({} day streak)", user_id, milestone.badge, milestone.days);
                points_awarded += milestone.bonus_points;
                badge_awarded = Some(milestone.badge.to_string());
            }
            total_points = total_points.max(credit.profile.eco_points);
        }

        Ok(StreakUpdate {
            new_streak: outcome.state.current_streak,
            points_awarded,
            badge_awarded,
            total_points,
        })
    }
}
