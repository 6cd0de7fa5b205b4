//! Built-in challenge catalog.
//!
//! Seeded into the challenge store at startup and used as the fallback set
//! when personalized generation is unavailable.

use super::types::{
    ChallengeCriteria, ChallengeDefinition, DietCriteria, ElectricityCriteria, LifestyleCriteria,
    ModeGroup, Reward, TransportCriteria, WaterCriteria,
};
use crate::carbon::types::DietChoice;

/// Ids served as the fallback when generation fails.
pub const FALLBACK_IDS: [&str; 5] = [
    "meat_free_monday",
    "public_transit_hero",
    "unplug_challenge",
    "daily_logger",
    "short_shower",
];

fn challenge(
    id: &str,
    title: &str,
    description: &str,
    criteria: ChallengeCriteria,
    duration_days: u32,
    points: u32,
    badge: Option<&str>,
) -> ChallengeDefinition {
    ChallengeDefinition {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        criteria,
        duration_days,
        reward: Reward {
            points,
            badge: badge.map(str::to_string),
        },
    }
}

/// All built-in challenges.
pub fn default_challenges() -> Vec<ChallengeDefinition> {
    vec![
        challenge(
            "meat_free_monday",
            "Meat-Free Monday",
            "Eat fully plant-based for a day.",
            ChallengeCriteria::Diet(DietCriteria::Choice(DietChoice::Vegan)),
            1,
            50,
            Some("plant_pioneer"),
        ),
        challenge(
            "plant_power_week",
            "Plant Power Week",
            "Keep at least two thirds of your meals plant-based for 7 days.",
            ChallengeCriteria::Diet(DietCriteria::MinPlantPercent(66.0)),
            7,
            150,
            Some("plant_power"),
        ),
        challenge(
            "no_delivery",
            "Cook at Home",
            "No ordered-in meals for 3 days.",
            ChallengeCriteria::Diet(DietCriteria::MaxOrderedMeals(0)),
            3,
            60,
            None,
        ),
        challenge(
            "pedal_power",
            "Pedal Power",
            "Cycle or walk instead of driving for 5 days.",
            ChallengeCriteria::Transport(TransportCriteria::Mode(ModeGroup::Cycling)),
            5,
            120,
            Some("pedal_pusher"),
        ),
        challenge(
            "public_transit_hero",
            "Public Transit Hero",
            "Take the bus, metro or train for 3 days.",
            ChallengeCriteria::Transport(TransportCriteria::Mode(ModeGroup::Public)),
            3,
            80,
            Some("transit_hero"),
        ),
        challenge(
            "half_commute",
            "Halve Your Commute",
            "Cut commute emissions by at least half compared to a typical day.",
            ChallengeCriteria::Transport(TransportCriteria::MinReductionPercent(50.0)),
            3,
            70,
            None,
        ),
        challenge(
            "ac_free_day",
            "AC-Free Day",
            "Go a full day without air conditioning.",
            ChallengeCriteria::Electricity(ElectricityCriteria::MaxAcHours(0.0)),
            1,
            40,
            None,
        ),
        challenge(
            "unplug_challenge",
            "Unplug It",
            "Unplug at least 3 idle devices each day for 3 days.",
            ChallengeCriteria::Electricity(ElectricityCriteria::MinUnpluggedDevices(3)),
            3,
            60,
            Some("energy_saver"),
        ),
        challenge(
            "power_saver",
            "Power Saver",
            "Use 30% less electricity than a typical day for 5 days.",
            ChallengeCriteria::Electricity(ElectricityCriteria::MinReductionPercent(30.0)),
            5,
            100,
            None,
        ),
        challenge(
            "daily_logger",
            "Daily Logger",
            "Log your activity every day for a week.",
            ChallengeCriteria::Lifestyle(LifestyleCriteria::DailyLogging),
            7,
            70,
            Some("consistent_logger"),
        ),
        challenge(
            "waste_warrior",
            "Waste Warrior",
            "Segregate or compost your waste for 5 days.",
            ChallengeCriteria::Lifestyle(LifestyleCriteria::WasteManaged),
            5,
            80,
            Some("waste_warrior"),
        ),
        challenge(
            "short_shower",
            "Five-Minute Shower",
            "Keep showers to 5 minutes or less for 3 days.",
            ChallengeCriteria::Water(WaterCriteria::MaxShowerMinutes(5)),
            3,
            50,
            Some("water_wise"),
        ),
    ]
}

/// Look up a built-in challenge.
pub fn find(id: &str) -> Option<ChallengeDefinition> {
    default_challenges().into_iter().find(|c| c.id == id)
}

/// Static set served when personalized generation fails.
pub fn fallback_challenges() -> Vec<ChallengeDefinition> {
    default_challenges()
        .into_iter()
        .filter(|c| FALLBACK_IDS.contains(&c.id.as_str()))
        .collect()
}
