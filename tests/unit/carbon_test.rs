//! Unit tests for the daily footprint calculator.

use ecotrack::carbon::{
    AcHours, Appliance, CarbonCalculator, DailyAnswers, DietChoice, DistanceBucket, ImpactLevel,
    LifestyleProfile, TransportMode,
};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_plant_based_walking_day_is_low_impact() {
    let answers = DailyAnswers {
        meals_today: Some(3),
        meat_meals: Some(0),
        ac_hours: Some(AcHours::Zero),
        transport_mode: Some(TransportMode::Walking),
        ..Default::default()
    };

    let result = CarbonCalculator::calculate(None, &answers);

    assert!(approx(result.transport, 0.0));
    assert!(approx(result.diet, 2.1));
    assert!(approx(result.electricity, 0.0));
    assert!(approx(result.total, 2.1));
    assert_eq!(result.impact(), ImpactLevel::Low);
}

#[test]
fn test_car_commute_uses_distance_midpoint() {
    let answers = DailyAnswers {
        transport_mode: Some(TransportMode::CarPetrol),
        distance: Some(DistanceBucket::From15To30),
        ..Default::default()
    };

    let result = CarbonCalculator::calculate(None, &answers);
    // 0.192 kg/km * 22.5 km
    assert!(approx(result.transport, 4.32));
    assert!(approx(result.total, 4.32));
}

#[test]
fn test_ac_bucket_maps_to_hours() {
    let answers = DailyAnswers {
        ac_hours: Some(AcHours::parse("2_to_4")),
        ..Default::default()
    };

    let result = CarbonCalculator::calculate(None, &answers);
    // 3 h * 1.5 kWh * 0.82 kg/kWh
    assert!(approx(result.electricity, 3.69));
}

#[test]
fn test_unplugged_devices_never_go_negative() {
    let answers = DailyAnswers {
        unplugged_devices: Some(40),
        ..Default::default()
    };

    let result = CarbonCalculator::calculate(None, &answers);
    assert!(approx(result.electricity, 0.0));
    assert!(result.total >= 0.0);
}

#[test]
fn test_unknown_values_weigh_nothing() {
    let answers: DailyAnswers = serde_json::from_str(
        r#"{"transport_mode": "hoverboard", "distance": "5_to_15", "appliances": ["toaster", "tv"]}"#,
    )
    .unwrap();

    assert_eq!(answers.transport_mode, Some(TransportMode::Unknown));
    assert_eq!(answers.appliances, vec![Appliance::Unknown, Appliance::Television]);

    let result = CarbonCalculator::calculate(None, &answers);
    assert!(approx(result.transport, 0.0));
    // Only the television counts: 0.3 kWh * 0.82
    assert!(approx(result.electricity, 0.25));
}

#[test]
fn test_baseline_fills_unanswered_categories() {
    let profile = LifestyleProfile {
        transport_mode: Some(TransportMode::CarPetrol),
        commute_distance: Some(DistanceBucket::From5To15),
        diet_choice: Some(DietChoice::Mixed),
        ..Default::default()
    };
    let answers = DailyAnswers {
        diet_choice: Some(DietChoice::Vegan),
        ..Default::default()
    };

    let result = CarbonCalculator::calculate(Some(&profile), &answers);

    // Transport from the profile, diet from today's answer
    assert!(approx(result.transport, 1.92));
    assert!(approx(result.diet, 1.5));
    assert!(approx(result.total, 3.42));

    let without_profile = CarbonCalculator::calculate(None, &answers);
    assert!(approx(without_profile.transport, 0.0));
}

#[test]
fn test_calculation_is_deterministic() {
    let answers = DailyAnswers {
        transport_mode: Some(TransportMode::Bus),
        distance: Some(DistanceBucket::Over50),
        meals_today: Some(4),
        meat_meals: Some(2),
        appliances: vec![Appliance::Dryer, Appliance::Oven],
        ..Default::default()
    };

    let a = CarbonCalculator::calculate(None, &answers);
    let b = CarbonCalculator::calculate(None, &answers);
    assert_eq!(a, b);
}

#[test]
fn test_impact_thresholds() {
    assert_eq!(ImpactLevel::from_total(9.99), ImpactLevel::Low);
    assert_eq!(ImpactLevel::from_total(10.0), ImpactLevel::Moderate);
    assert_eq!(ImpactLevel::from_total(19.99), ImpactLevel::Moderate);
    assert_eq!(ImpactLevel::from_total(20.0), ImpactLevel::High);
}
