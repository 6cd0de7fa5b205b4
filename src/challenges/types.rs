//! Challenge definitions, criteria and enrollments.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::carbon::types::{DietChoice, TransportMode};
use crate::gamification::types::credit_keys;

/// Reward granted on completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub points: u32,
    #[serde(default)]
    pub badge: Option<String>,
}

/// Challenge category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    Diet,
    Transport,
    Electricity,
    Lifestyle,
    Water,
}

impl ChallengeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeKind::Diet => "diet",
            ChallengeKind::Transport => "transport",
            ChallengeKind::Electricity => "electricity",
            ChallengeKind::Lifestyle => "lifestyle",
            ChallengeKind::Water => "water",
        }
    }
}

impl std::fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a day's activity must satisfy to count toward a challenge.
///
/// Serialized as `{"type": "diet", "rule": {"kind": "choice", "target": "vegan"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "rule", rename_all = "snake_case")]
pub enum ChallengeCriteria {
    Diet(DietCriteria),
    Transport(TransportCriteria),
    Electricity(ElectricityCriteria),
    Lifestyle(LifestyleCriteria),
    Water(WaterCriteria),
}

impl ChallengeCriteria {
    pub fn kind(&self) -> ChallengeKind {
        match self {
            ChallengeCriteria::Diet(_) => ChallengeKind::Diet,
            ChallengeCriteria::Transport(_) => ChallengeKind::Transport,
            ChallengeCriteria::Electricity(_) => ChallengeKind::Electricity,
            ChallengeCriteria::Lifestyle(_) => ChallengeKind::Lifestyle,
            ChallengeCriteria::Water(_) => ChallengeKind::Water,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum DietCriteria {
    /// Diet choice must match exactly
    Choice(DietChoice),
    /// Meat share of meals at or below this percentage
    MaxMeatPercent(f64),
    /// Plant-based share of meals at or above this percentage
    MinPlantPercent(f64),
    /// Ordered-in meals at or below this count
    MaxOrderedMeals(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum TransportCriteria {
    /// Travelled by a mode in this group
    Mode(ModeGroup),
    /// Transport emission at least this many percent below the typical day
    MinReductionPercent(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum ElectricityCriteria {
    /// Electricity emission (kg CO2e) at or below this value
    MaxEmission(f64),
    /// AC use at or below this many hours
    MaxAcHours(f64),
    /// At least this many idle devices unplugged
    MinUnpluggedDevices(u32),
    /// Electricity emission at least this many percent below the typical day
    MinReductionPercent(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum LifestyleCriteria {
    /// Any submission counts
    DailyLogging,
    /// Waste segregated or composted
    WasteManaged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum WaterCriteria {
    /// Water-heating emission (kg CO2e) at or below this value
    MaxEmission(f64),
    /// Showers at or below this many minutes
    MaxShowerMinutes(u32),
}

categorical! {
    /// Transport modes accepted by a mode challenge.
    pub enum ModeGroup {
        /// Bicycle or walking
        Cycling => "cycling" | "bicycle" | "cycle",
        /// Walking only
        Walking => "walking" | "walk",
        /// Bus, metro or train
        Public => "public" | "public_transport" | "transit",
        /// Electric vehicles
        Electric => "electric" | "ev",
        /// Shared rides
        Carpool => "carpool",
        /// No commute
        NoCommute => "work_from_home" | "wfh" | "no_commute",
        /// Any zero or low emission option
        Green => "green",
    }
}

impl ModeGroup {
    /// Whether `mode` belongs to this group.
    pub fn accepts(&self, mode: TransportMode) -> bool {
        use TransportMode as M;
        match self {
            ModeGroup::Cycling => matches!(mode, M::Bicycle | M::Walking),
            ModeGroup::Walking => matches!(mode, M::Walking),
            ModeGroup::Public => matches!(mode, M::Bus | M::Metro | M::Train),
            ModeGroup::Electric => matches!(mode, M::CarElectric),
            ModeGroup::Carpool => matches!(mode, M::Carpool),
            ModeGroup::NoCommute => matches!(mode, M::WorkFromHome),
            ModeGroup::Green => matches!(
                mode,
                M::Bicycle | M::Walking | M::Bus | M::Metro | M::Train | M::WorkFromHome
            ),
            ModeGroup::Unknown => false,
        }
    }
}

fn default_duration() -> u32 {
    1
}

/// Challenge template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeDefinition {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub criteria: ChallengeCriteria,
    /// Qualifying days needed to complete
    #[serde(default = "default_duration")]
    pub duration_days: u32,
    pub reward: Reward,
}

impl ChallengeDefinition {
    pub fn kind(&self) -> ChallengeKind {
        self.criteria.kind()
    }
}

/// Result of recording one qualifying day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStep {
    /// Progress went up by one
    Advanced,
    /// Progress reached the target on this step
    Completed,
    /// Date is not after the last counted day
    AlreadyCounted,
    /// Enrollment was already complete
    Closed,
}

/// A user's enrollment in one challenge.
///
/// Criteria, target and reward are snapshotted at join time, so later edits to
/// the definition do not move the goalposts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeEnrollment {
    pub user_id: Uuid,
    pub challenge_id: String,
    pub title: String,
    pub criteria: ChallengeCriteria,
    pub target: u32,
    pub progress: u32,
    pub is_completed: bool,
    pub joined_at: DateTime<Utc>,
    pub last_progress_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub reward: Reward,
}

impl ChallengeEnrollment {
    pub fn new(user_id: Uuid, definition: &ChallengeDefinition, joined_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            challenge_id: definition.id.clone(),
            title: definition.title.clone(),
            criteria: definition.criteria.clone(),
            target: definition.duration_days.max(1),
            progress: 0,
            is_completed: false,
            joined_at,
            last_progress_date: None,
            completed_at: None,
            reward: definition.reward.clone(),
        }
    }

    /// Count `date` as a qualifying day.
    ///
    /// Progress never exceeds the target and completion never reverts.
    /// Only dates after the last counted day advance progress, so a backdated
    /// submission cannot count a day twice or move `last_progress_date` back.
    pub fn record_progress(&mut self, date: NaiveDate, now: DateTime<Utc>) -> ProgressStep {
        if self.is_completed {
            return ProgressStep::Closed;
        }
        if self.last_progress_date.is_some_and(|last| date <= last) {
            return ProgressStep::AlreadyCounted;
        }

        self.progress = (self.progress + 1).min(self.target);
        self.last_progress_date = Some(date);

        if self.progress >= self.target {
            self.is_completed = true;
            self.completed_at = Some(now);
            ProgressStep::Completed
        } else {
            ProgressStep::Advanced
        }
    }

    /// Ledger credit key for this enrollment's reward.
    pub fn credit_key(&self) -> String {
        credit_keys::challenge(&self.challenge_id)
    }

    /// Progress as a percentage (0-100).
    pub fn progress_percent(&self) -> f32 {
        if self.target == 0 {
            return 100.0;
        }
        (self.progress as f32 / self.target as f32 * 100.0).min(100.0)
    }
}

/// Challenge errors.
#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    #[error("Challenge not found: {0}")]
    NotFound(String),

    #[error("Already joined this challenge")]
    AlreadyJoined,

    #[error("Not joined this challenge")]
    NotJoined,

    #[error("Challenge already completed")]
    AlreadyCompleted,

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}
