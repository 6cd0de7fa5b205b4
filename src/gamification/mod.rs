//! Gamification module.
//!
//! Eco points, levels and badges, plus the daily-logging streak that feeds
//! them. Every point award goes through the ledger as an additive delta.

pub mod ledger;
pub mod streak;
pub mod types;

pub use ledger::GamificationLedger;
pub use streak::{StreakOutcome, StreakTracker, StreakTransition};
pub use types::{
    level_for_points, CreditOutcome, GamificationProfile, LedgerDelta, StreakMilestone,
    StreakState, StreakUpdate, STREAK_MILESTONES,
};
