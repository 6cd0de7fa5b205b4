//! Daily activity answers, baseline profile and carbon breakdown types.
//!
//! Categorical answers arrive as loosely typed strings from the question flow.
//! Each one is parsed into a closed enum; anything unrecognised becomes the
//! `Unknown` variant, which carries zero emission weight.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

categorical! {
    /// How the user got around today.
    pub enum TransportMode {
        /// Petrol car
        CarPetrol => "car_petrol" | "car" | "petrol_car",
        /// Diesel car
        CarDiesel => "car_diesel" | "diesel_car",
        /// Battery electric car
        CarElectric => "car_electric" | "electric_car" | "ev",
        /// Motorbike or scooter
        Motorbike => "motorbike" | "scooter",
        /// Auto rickshaw
        AutoRickshaw => "auto_rickshaw" | "auto" | "rickshaw",
        /// Shared car ride
        Carpool => "carpool",
        /// Public bus
        Bus => "bus",
        /// Metro / subway
        Metro => "metro" | "subway",
        /// Suburban or intercity train
        Train => "train",
        /// Bicycle
        Bicycle => "bicycle" | "cycle",
        /// Walking
        Walking => "walking" | "walk",
        /// No commute today
        WorkFromHome => "work_from_home" | "wfh",
    }
}

impl TransportMode {
    /// Emission factor in kg CO2e per km.
    pub fn kg_per_km(&self) -> f64 {
        match self {
            TransportMode::CarPetrol => 0.192,
            TransportMode::CarDiesel => 0.171,
            TransportMode::CarElectric => 0.053,
            TransportMode::Motorbike => 0.103,
            TransportMode::AutoRickshaw => 0.090,
            TransportMode::Carpool => 0.096,
            TransportMode::Bus => 0.105,
            TransportMode::Metro | TransportMode::Train => 0.041,
            TransportMode::Bicycle
            | TransportMode::Walking
            | TransportMode::WorkFromHome
            | TransportMode::Unknown => 0.0,
        }
    }
}

categorical! {
    /// Distance travelled today, bucketed.
    pub enum DistanceBucket {
        /// No travel
        Zero => "none" | "0",
        /// Under 5 km
        Under5 => "under_5" | "0_to_5",
        /// 5 to 15 km
        From5To15 => "5_to_15",
        /// 15 to 30 km
        From15To30 => "15_to_30",
        /// 30 to 50 km
        From30To50 => "30_to_50",
        /// More than 50 km
        Over50 => "over_50" | "50_plus",
    }
}

impl DistanceBucket {
    /// Representative distance for the bucket in km.
    pub fn midpoint_km(&self) -> f64 {
        match self {
            DistanceBucket::Zero | DistanceBucket::Unknown => 0.0,
            DistanceBucket::Under5 => 2.5,
            DistanceBucket::From5To15 => 10.0,
            DistanceBucket::From15To30 => 22.5,
            DistanceBucket::From30To50 => 40.0,
            DistanceBucket::Over50 => 60.0,
        }
    }
}

categorical! {
    /// Self-described diet for the day.
    pub enum DietChoice {
        Vegan => "vegan",
        Vegetarian => "vegetarian" | "veg",
        Pescatarian => "pescatarian",
        Mixed => "mixed" | "non_vegetarian" | "non_veg",
        HeavyMeat => "heavy_meat",
    }
}

impl DietChoice {
    /// Average emission per meal (kg CO2e) when no meat count is given.
    pub fn kg_per_meal(&self) -> f64 {
        match self {
            DietChoice::Vegan => 0.5,
            DietChoice::Vegetarian => 0.8,
            DietChoice::Pescatarian => 1.2,
            DietChoice::Mixed => 1.8,
            DietChoice::HeavyMeat => 2.5,
            DietChoice::Unknown => 0.0,
        }
    }
}

categorical! {
    /// Hours of air conditioning today, bucketed.
    pub enum AcHours {
        Zero => "0" | "none",
        OneToTwo => "1_to_2",
        TwoToFour => "2_to_4",
        FourToEight => "4_to_8",
        EightPlus => "8_plus",
    }
}

impl AcHours {
    /// Representative hours for the bucket.
    pub fn hours(&self) -> f64 {
        match self {
            AcHours::Zero | AcHours::Unknown => 0.0,
            AcHours::OneToTwo => 1.5,
            AcHours::TwoToFour => 3.0,
            AcHours::FourToEight => 6.0,
            AcHours::EightPlus => 10.0,
        }
    }
}

categorical! {
    /// Household appliance run today.
    pub enum Appliance {
        WashingMachine => "washing_machine",
        Dryer => "dryer",
        Dishwasher => "dishwasher",
        Microwave => "microwave",
        Oven => "oven",
        WaterHeater => "water_heater" | "geyser",
        Television => "television" | "tv",
        Computer => "computer" | "laptop",
        Refrigerator => "refrigerator" | "fridge",
    }
}

impl Appliance {
    /// Daily energy use in kWh.
    pub fn kwh_per_day(&self) -> f64 {
        match self {
            Appliance::WashingMachine => 0.5,
            Appliance::Dryer => 2.5,
            Appliance::Dishwasher => 1.2,
            Appliance::Microwave => 0.2,
            Appliance::Oven => 1.0,
            Appliance::WaterHeater => 2.0,
            Appliance::Television => 0.3,
            Appliance::Computer => 0.6,
            Appliance::Refrigerator => 1.2,
            Appliance::Unknown => 0.0,
        }
    }
}

categorical! {
    /// Screen time today, bucketed.
    pub enum ScreenTime {
        Under2 => "under_2" | "0_to_2",
        TwoToFour => "2_to_4",
        FourToSix => "4_to_6",
        SixPlus => "6_plus",
    }
}

impl ScreenTime {
    /// Device energy use in kWh.
    pub fn kwh(&self) -> f64 {
        match self {
            ScreenTime::Under2 => 0.05,
            ScreenTime::TwoToFour => 0.15,
            ScreenTime::FourToSix => 0.25,
            ScreenTime::SixPlus => 0.4,
            ScreenTime::Unknown => 0.0,
        }
    }
}

categorical! {
    /// How household waste was handled.
    pub enum WastePractice {
        Segregated => "segregated",
        Composted => "composted",
        Recycled => "recycled",
        Mixed => "mixed" | "none",
    }
}

impl WastePractice {
    /// Emission for the day's waste in kg CO2e.
    pub fn kg(&self) -> f64 {
        match self {
            WastePractice::Segregated => 0.2,
            WastePractice::Composted => 0.1,
            WastePractice::Recycled => 0.3,
            WastePractice::Mixed => 0.8,
            WastePractice::Unknown => 0.0,
        }
    }

    /// Whether the practice keeps waste out of mixed landfill.
    pub fn is_managed(&self) -> bool {
        matches!(self, WastePractice::Segregated | WastePractice::Composted)
    }
}

/// Answers submitted for one day. Every field is optional; a missing category
/// contributes nothing unless the baseline profile fills it in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyAnswers {
    pub transport_mode: Option<TransportMode>,
    pub distance: Option<DistanceBucket>,
    pub diet_choice: Option<DietChoice>,
    pub meals_today: Option<u32>,
    pub meat_meals: Option<u32>,
    /// Meals ordered in or delivered
    pub ordered_meals: Option<u32>,
    pub ac_hours: Option<AcHours>,
    pub appliances: Vec<Appliance>,
    /// Idle devices unplugged at the wall
    pub unplugged_devices: Option<u32>,
    pub screen_time: Option<ScreenTime>,
    pub waste: Option<WastePractice>,
    pub shower_minutes: Option<u32>,
}

impl DailyAnswers {
    /// True when no question was answered at all.
    pub fn is_empty(&self) -> bool {
        *self == DailyAnswers::default()
    }

    /// Share of meals containing meat, 0-100. Zero when no meals were logged.
    pub fn meat_percent(&self) -> f64 {
        match (self.meals_today, self.meat_meals) {
            (Some(meals), Some(meat)) if meals > 0 => {
                (meat.min(meals) as f64 / meals as f64) * 100.0
            }
            _ => 0.0,
        }
    }

    /// Share of plant-based meals, 0-100. Zero when no meals were logged.
    pub fn plant_percent(&self) -> f64 {
        match self.meals_today {
            Some(meals) if meals > 0 => 100.0 - self.meat_percent(),
            _ => 0.0,
        }
    }

    pub fn has_transport(&self) -> bool {
        self.transport_mode.is_some()
    }

    pub fn has_diet(&self) -> bool {
        self.diet_choice.is_some() || self.meals_today.is_some()
    }

    pub fn has_electricity(&self) -> bool {
        self.ac_hours.is_some() || !self.appliances.is_empty() || self.unplugged_devices.is_some()
    }

    pub fn has_water(&self) -> bool {
        self.shower_minutes.is_some()
    }
}

/// Habitual lifestyle captured at onboarding. Used as the fallback for
/// unanswered daily questions and as the input to challenge personalisation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifestyleProfile {
    pub transport_mode: Option<TransportMode>,
    pub commute_distance: Option<DistanceBucket>,
    pub diet_choice: Option<DietChoice>,
    pub ac_hours: Option<AcHours>,
    pub screen_time: Option<ScreenTime>,
    pub waste: Option<WastePractice>,
}

/// Per-category emissions for one day, in kg CO2e.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CarbonBreakdown {
    pub transport: f64,
    pub diet: f64,
    pub electricity: f64,
    pub lifestyle: f64,
    pub total: f64,
}

impl CarbonBreakdown {
    /// Impact rating for the day's total.
    pub fn impact(&self) -> ImpactLevel {
        ImpactLevel::from_total(self.total)
    }
}

/// Coarse rating of a daily footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    /// Below 10 kg CO2e
    Low,
    /// Below 20 kg CO2e
    Moderate,
    /// 20 kg CO2e or more
    High,
}

impl ImpactLevel {
    /// Upper bound (exclusive) of the low band.
    pub const LOW_THRESHOLD: f64 = 10.0;
    /// Upper bound (exclusive) of the moderate band.
    pub const MODERATE_THRESHOLD: f64 = 20.0;

    pub fn from_total(total: f64) -> Self {
        if total < Self::LOW_THRESHOLD {
            ImpactLevel::Low
        } else if total < Self::MODERATE_THRESHOLD {
            ImpactLevel::Moderate
        } else {
            ImpactLevel::High
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ImpactLevel::Low => "Low Impact",
            ImpactLevel::Moderate => "Moderate Impact",
            ImpactLevel::High => "High Impact",
        }
    }
}

impl std::fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One user's activity for one calendar date. Unique per (user, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub answers: DailyAnswers,
    pub breakdown: CarbonBreakdown,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ActivityRecord {
    pub fn new(
        user_id: Uuid,
        date: NaiveDate,
        answers: DailyAnswers,
        breakdown: CarbonBreakdown,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            date,
            answers,
            breakdown,
            created_at: now,
            updated_at: now,
        }
    }
}
