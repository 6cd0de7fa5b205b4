//! Carbon footprint module.
//!
//! Maps a day's lifestyle answers to per-category emissions:
//! - Transport (mode and distance)
//! - Diet (meals, meat share, delivery)
//! - Electricity (AC, appliances, standby)
//! - Lifestyle (screens, waste, water heating)

pub mod calculator;
pub mod types;

pub use calculator::CarbonCalculator;
pub use types::{
    AcHours, ActivityRecord, Appliance, CarbonBreakdown, DailyAnswers, DietChoice, DistanceBucket,
    ImpactLevel, LifestyleProfile, ScreenTime, TransportMode, WastePractice,
};
