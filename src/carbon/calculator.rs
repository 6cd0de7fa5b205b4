//! Daily carbon footprint calculation.
//!
//! Pure and deterministic: the same profile and answers always give the same
//! breakdown. Each category is rounded to 2 decimals and the total is the sum
//! of the rounded categories.

use super::types::{CarbonBreakdown, DailyAnswers, LifestyleProfile};

/// Grid emission factor in kg CO2e per kWh.
pub const GRID_KG_PER_KWH: f64 = 0.82;

/// Emission per meal containing meat.
pub const MEAT_MEAL_KG: f64 = 2.5;

/// Emission per plant-based meal.
pub const PLANT_MEAL_KG: f64 = 0.7;

/// Packaging and delivery overhead per ordered meal.
pub const ORDERED_MEAL_KG: f64 = 0.4;

/// Meals assumed when only a diet choice is known.
pub const DEFAULT_MEALS: u32 = 3;

/// Air conditioner draw in kWh per hour.
pub const AC_KWH_PER_HOUR: f64 = 1.5;

/// Standby energy saved per unplugged device.
pub const UNPLUGGED_KWH_SAVED: f64 = 0.05;

/// Water-heating emission per shower minute.
pub const SHOWER_KG_PER_MINUTE: f64 = 0.08;

/// Typical daily transport emission that reduction targets are measured against.
pub const BASELINE_TRANSPORT_KG: f64 = 4.6;

/// Typical daily electricity emission that reduction targets are measured against.
pub const BASELINE_ELECTRICITY_KG: f64 = 6.5;

/// Carbon footprint calculator.
pub struct CarbonCalculator;

impl CarbonCalculator {
    /// Calculate the day's footprint.
    ///
    /// Unanswered questions fall back to the baseline profile when one is given,
    /// otherwise they contribute zero.
    pub fn calculate(
        baseline: Option<&LifestyleProfile>,
        answers: &DailyAnswers,
    ) -> CarbonBreakdown {
        let transport = round2(Self::transport(baseline, answers));
        let diet = round2(Self::diet(baseline, answers));
        let electricity = round2(Self::electricity(baseline, answers));
        let lifestyle = round2(Self::lifestyle(baseline, answers));

        CarbonBreakdown {
            transport,
            diet,
            electricity,
            lifestyle,
            total: round2(transport + diet + electricity + lifestyle),
        }
    }

    /// Footprint implied by the baseline profile alone.
    pub fn baseline(profile: &LifestyleProfile) -> CarbonBreakdown {
        Self::calculate(Some(profile), &DailyAnswers::default())
    }

    fn transport(baseline: Option<&LifestyleProfile>, answers: &DailyAnswers) -> f64 {
        let mode = answers
            .transport_mode
            .or_else(|| baseline.and_then(|p| p.transport_mode));
        let distance = answers
            .distance
            .or_else(|| baseline.and_then(|p| p.commute_distance));

        match (mode, distance) {
            (Some(mode), Some(distance)) => mode.kg_per_km() * distance.midpoint_km(),
            _ => 0.0,
        }
    }

    fn diet(baseline: Option<&LifestyleProfile>, answers: &DailyAnswers) -> f64 {
        let choice = answers
            .diet_choice
            .or_else(|| baseline.and_then(|p| p.diet_choice));

        let meals = match (answers.meals_today, answers.meat_meals, choice) {
            (Some(meals), Some(meat), _) => {
                let meat = meat.min(meals);
                meat as f64 * MEAT_MEAL_KG + (meals - meat) as f64 * PLANT_MEAL_KG
            }
            (Some(meals), None, Some(choice)) => meals as f64 * choice.kg_per_meal(),
            (Some(meals), None, None) => meals as f64 * PLANT_MEAL_KG,
            (None, _, Some(choice)) => DEFAULT_MEALS as f64 * choice.kg_per_meal(),
            (None, _, None) => 0.0,
        };

        let ordered = answers.ordered_meals.unwrap_or(0) as f64 * ORDERED_MEAL_KG;

        meals + ordered
    }

    fn electricity(baseline: Option<&LifestyleProfile>, answers: &DailyAnswers) -> f64 {
        let ac_hours = answers
            .ac_hours
            .or_else(|| baseline.and_then(|p| p.ac_hours))
            .map(|bucket| bucket.hours())
            .unwrap_or(0.0);

        let appliances: f64 = answers.appliances.iter().map(|a| a.kwh_per_day()).sum();
        let saved = answers.unplugged_devices.unwrap_or(0) as f64 * UNPLUGGED_KWH_SAVED;

        let kwh = (ac_hours * AC_KWH_PER_HOUR + appliances - saved).max(0.0);
        kwh * GRID_KG_PER_KWH
    }

    fn lifestyle(baseline: Option<&LifestyleProfile>, answers: &DailyAnswers) -> f64 {
        let screen = answers
            .screen_time
            .or_else(|| baseline.and_then(|p| p.screen_time))
            .map(|s| s.kwh() * GRID_KG_PER_KWH)
            .unwrap_or(0.0);

        let waste = answers
            .waste
            .or_else(|| baseline.and_then(|p| p.waste))
            .map(|w| w.kg())
            .unwrap_or(0.0);

        screen + waste + Self::water(answers)
    }

    /// Water-heating share of the lifestyle category.
    pub fn water(answers: &DailyAnswers) -> f64 {
        answers.shower_minutes.unwrap_or(0) as f64 * SHOWER_KG_PER_MINUTE
    }

    /// Transport reduction against the typical day, as a percentage (never negative).
    pub fn transport_reduction_percent(breakdown: &CarbonBreakdown) -> f64 {
        reduction_percent(BASELINE_TRANSPORT_KG, breakdown.transport)
    }

    /// Electricity reduction against the typical day, as a percentage (never negative).
    pub fn electricity_reduction_percent(breakdown: &CarbonBreakdown) -> f64 {
        reduction_percent(BASELINE_ELECTRICITY_KG, breakdown.electricity)
    }
}

fn reduction_percent(baseline: f64, actual: f64) -> f64 {
    if baseline <= 0.0 {
        return 0.0;
    }
    ((baseline - actual) / baseline * 100.0).max(0.0)
}

/// Round to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
