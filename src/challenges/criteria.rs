//! Criteria evaluation.
//!
//! One evaluator per challenge category, dispatched exhaustively on
//! [`ChallengeCriteria`]. Rules that compare an emission or a reduction only
//! apply when the category was actually answered that day; an unanswered
//! category scores zero emission, which must not count as a win.

use super::types::{
    ChallengeCriteria, DietCriteria, ElectricityCriteria, LifestyleCriteria, TransportCriteria,
    WaterCriteria,
};
use crate::carbon::calculator::CarbonCalculator;
use crate::carbon::types::{CarbonBreakdown, DailyAnswers};

/// One day's activity, as seen by the evaluators.
#[derive(Debug, Clone, Copy)]
pub struct DayActivity<'a> {
    pub answers: &'a DailyAnswers,
    pub breakdown: &'a CarbonBreakdown,
}

impl<'a> DayActivity<'a> {
    pub fn new(answers: &'a DailyAnswers, breakdown: &'a CarbonBreakdown) -> Self {
        Self { answers, breakdown }
    }
}

/// Whether the day's activity satisfies `criteria`.
pub fn is_satisfied(criteria: &ChallengeCriteria, day: DayActivity<'_>) -> bool {
    match criteria {
        ChallengeCriteria::Diet(rule) => diet(rule, day),
        ChallengeCriteria::Transport(rule) => transport(rule, day),
        ChallengeCriteria::Electricity(rule) => electricity(rule, day),
        ChallengeCriteria::Lifestyle(rule) => lifestyle(rule, day),
        ChallengeCriteria::Water(rule) => water(rule, day),
    }
}

fn diet(rule: &DietCriteria, day: DayActivity<'_>) -> bool {
    let answers = day.answers;
    match rule {
        DietCriteria::Choice(target) => answers.diet_choice == Some(*target),
        DietCriteria::MaxMeatPercent(target) => {
            meals_logged(answers) && answers.meat_percent() <= *target
        }
        DietCriteria::MinPlantPercent(target) => {
            meals_logged(answers) && answers.plant_percent() >= *target
        }
        DietCriteria::MaxOrderedMeals(target) => answers
            .ordered_meals
            .map(|ordered| ordered <= *target)
            .unwrap_or(false),
    }
}

fn meals_logged(answers: &DailyAnswers) -> bool {
    matches!(answers.meals_today, Some(meals) if meals > 0)
}

fn transport(rule: &TransportCriteria, day: DayActivity<'_>) -> bool {
    let Some(mode) = day.answers.transport_mode else {
        return false;
    };
    match rule {
        TransportCriteria::Mode(group) => group.accepts(mode),
        TransportCriteria::MinReductionPercent(target) => {
            CarbonCalculator::transport_reduction_percent(day.breakdown) >= *target
        }
    }
}

fn electricity(rule: &ElectricityCriteria, day: DayActivity<'_>) -> bool {
    let answers = day.answers;
    match rule {
        ElectricityCriteria::MaxAcHours(target) => answers
            .ac_hours
            .map(|bucket| bucket.hours() <= *target)
            .unwrap_or(false),
        ElectricityCriteria::MinUnpluggedDevices(target) => answers
            .unplugged_devices
            .map(|count| count >= *target)
            .unwrap_or(false),
        ElectricityCriteria::MaxEmission(target) => {
            answers.has_electricity() && day.breakdown.electricity <= *target
        }
        ElectricityCriteria::MinReductionPercent(target) => {
            answers.has_electricity()
                && CarbonCalculator::electricity_reduction_percent(day.breakdown) >= *target
        }
    }
}

fn lifestyle(rule: &LifestyleCriteria, day: DayActivity<'_>) -> bool {
    match rule {
        LifestyleCriteria::DailyLogging => !day.answers.is_empty(),
        LifestyleCriteria::WasteManaged => day
            .answers
            .waste
            .map(|practice| practice.is_managed())
            .unwrap_or(false),
    }
}

fn water(rule: &WaterCriteria, day: DayActivity<'_>) -> bool {
    let answers = day.answers;
    match rule {
        WaterCriteria::MaxEmission(target) => {
            answers.has_water() && CarbonCalculator::water(answers) <= *target
        }
        WaterCriteria::MaxShowerMinutes(target) => answers
            .shower_minutes
            .map(|minutes| minutes <= *target)
            .unwrap_or(false),
    }
}
