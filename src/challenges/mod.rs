//! Challenges module.
//!
//! Challenge definitions, per-user enrollments, criteria evaluation and the
//! built-in catalog.

pub mod catalog;
pub mod criteria;
pub mod progress;
pub mod types;

pub use catalog::{default_challenges, fallback_challenges};
pub use criteria::{is_satisfied, DayActivity};
pub use progress::{evaluate_enrollments, replay_enrollments, ChallengeManager, ProgressEvaluation};
pub use types::{
    ChallengeCriteria, ChallengeDefinition, ChallengeEnrollment, ChallengeError, ChallengeKind,
    ModeGroup, Reward,
};
