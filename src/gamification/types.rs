//! Ledger and streak type definitions.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Points needed per level.
pub const POINTS_PER_LEVEL: u64 = 100;

/// Level for a point total: `floor(points / 100) + 1`.
pub fn level_for_points(points: u64) -> u32 {
    (points / POINTS_PER_LEVEL) as u32 + 1
}

/// A user's points, badges and streak bookkeeping.
///
/// The level is always derived from `eco_points` and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamificationProfile {
    pub user_id: Uuid,
    pub eco_points: u64,
    pub badges: BTreeSet<String>,
    pub daily_log_streak: u32,
    pub last_log_date: Option<NaiveDate>,
    pub streak_start_date: Option<NaiveDate>,
    pub previous_best_streak: u32,
    pub updated_at: Option<DateTime<Utc>>,
}

impl GamificationProfile {
    /// Zero state for a user with no ledger entry yet.
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            eco_points: 0,
            badges: BTreeSet::new(),
            daily_log_streak: 0,
            last_log_date: None,
            streak_start_date: None,
            previous_best_streak: 0,
            updated_at: None,
        }
    }

    pub fn level(&self) -> u32 {
        level_for_points(self.eco_points)
    }

    pub fn has_badge(&self, badge: &str) -> bool {
        self.badges.contains(badge)
    }

    /// Current streak fields.
    pub fn streak_state(&self) -> StreakState {
        StreakState {
            current_streak: self.daily_log_streak,
            last_log_date: self.last_log_date,
            streak_start_date: self.streak_start_date,
            previous_best_streak: self.previous_best_streak,
        }
    }

    /// Longest streak seen so far, including the running one.
    pub fn best_streak(&self) -> u32 {
        self.previous_best_streak.max(self.daily_log_streak)
    }
}

/// Streak portion of the profile, written as one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub current_streak: u32,
    pub last_log_date: Option<NaiveDate>,
    pub streak_start_date: Option<NaiveDate>,
    pub previous_best_streak: u32,
}

/// Additive change to a ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDelta {
    pub points: u32,
    pub badges: Vec<String>,
}

impl LedgerDelta {
    pub fn points(points: u32) -> Self {
        Self {
            points,
            badges: Vec::new(),
        }
    }

    pub fn with_badge(mut self, badge: impl Into<String>) -> Self {
        self.badges.push(badge.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.points == 0 && self.badges.is_empty()
    }
}

/// Result of a keyed, idempotent credit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditOutcome {
    /// False when the key had already been credited.
    pub applied: bool,
    pub profile: GamificationProfile,
}

/// Idempotency keys for ledger credits.
pub mod credit_keys {
    use chrono::NaiveDate;

    pub fn daily(date: NaiveDate) -> String {
        format!("daily:{}", date)
    }

    pub fn streak(badge: &str) -> String {
        format!("streak:{}", badge)
    }

    pub fn challenge(challenge_id: &str) -> String {
        format!("challenge:{}", challenge_id)
    }
}

/// Streak milestone with its one-time bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreakMilestone {
    pub days: u32,
    pub bonus_points: u32,
    pub badge: &'static str,
}

/// Milestones in ascending order.
pub const STREAK_MILESTONES: [StreakMilestone; 3] = [
    StreakMilestone {
        days: 7,
        bonus_points: 30,
        badge: "streak_7",
    },
    StreakMilestone {
        days: 14,
        bonus_points: 50,
        badge: "streak_14",
    },
    StreakMilestone {
        days: 30,
        bonus_points: 100,
        badge: "streak_30",
    },
];

/// Milestone reached at exactly this streak length, if any.
pub fn milestone_for(streak: u32) -> Option<StreakMilestone> {
    STREAK_MILESTONES.iter().copied().find(|m| m.days == streak)
}

/// What a submission did to the streak.
#[derive(Debug, Clone, Serialize)]
pub struct StreakUpdate {
    pub new_streak: u32,
    pub points_awarded: u32,
    pub badge_awarded: Option<String>,
    pub total_points: u64,
}
