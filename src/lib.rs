//! EcoTrack - Eco-Activity Scoring & Progression Engine
//!
//! Turns a user's daily lifestyle answers into a carbon footprint estimate and
//! drives the gamification layer on top of it: eco points, levels, badges,
//! daily-logging streaks and challenge progress. Personalized challenge sets
//! are produced by an external generative service and cached per user.

#[macro_use]
mod macros;

pub mod carbon;
pub mod challenges;
pub mod engine;
pub mod gamification;
pub mod personalized;
pub mod storage;

// Re-export commonly used types
pub use carbon::calculator::CarbonCalculator;
pub use engine::{EcoEngine, EngineError, SubmissionResult};
pub use gamification::ledger::GamificationLedger;
pub use personalized::cache::PersonalizedChallengeCache;
pub use storage::config::AppConfig;
pub use storage::{MemoryStore, SqliteStore};
