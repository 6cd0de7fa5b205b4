//! Unit tests for generated challenge parsing.

use ecotrack::challenges::types::WaterCriteria;
use ecotrack::challenges::ChallengeCriteria;
use ecotrack::personalized::parser::{parse_challenges, MAX_GENERATED};
use ecotrack::personalized::GenerationError;

#[test]
fn test_object_payload_inside_prose() {
    let response = r#"Here are some ideas for you!
{"challenges": [
  {"title": "Quick Showers", "criteria": {"type": "water", "rule": {"kind": "max_shower_minutes", "target": 6}}, "duration_days": 4, "reward": {"points": 45, "badge": "splash"}}
]}
Good luck!"#;

    let challenges = parse_challenges(response).unwrap();
    assert_eq!(challenges.len(), 1);

    let challenge = &challenges[0];
    assert_eq!(challenge.id, "ai_quick_showers");
    assert_eq!(challenge.duration_days, 4);
    assert_eq!(challenge.reward.points, 45);
    assert_eq!(challenge.reward.badge.as_deref(), Some("splash"));
    assert_eq!(
        challenge.criteria,
        ChallengeCriteria::Water(WaterCriteria::MaxShowerMinutes(6))
    );
}

#[test]
fn test_supplied_ids_cannot_shadow_catalog() {
    let response = r#"[
      {"id": "daily_logger", "title": "Log Daily", "criteria": {"type": "lifestyle", "rule": {"kind": "daily_logging"}}},
      {"id": "ai_bike_week", "title": "Bike Week", "criteria": {"type": "transport", "rule": {"kind": "mode", "target": "cycling"}}}
    ]"#;

    let challenges = parse_challenges(response).unwrap();
    let ids: Vec<&str> = challenges.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["ai_daily_logger", "ai_bike_week"]);
    for id in ids {
        assert!(ecotrack::challenges::catalog::find(id).is_none());
    }
}

#[test]
fn test_duplicate_titles_get_distinct_ids() {
    let response = r#"[
      {"title": "Log It", "criteria": {"type": "lifestyle", "rule": {"kind": "daily_logging"}}},
      {"title": "Log it!", "criteria": {"type": "lifestyle", "rule": {"kind": "daily_logging"}}}
    ]"#;

    let challenges = parse_challenges(response).unwrap();
    let ids: Vec<&str> = challenges.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["ai_log_it", "ai_log_it_2"]);
    // Defaults for omitted fields
    assert!(challenges.iter().all(|c| c.duration_days == 1));
    assert!(challenges.iter().all(|c| c.reward.points == 30));
}

#[test]
fn test_duration_is_clamped() {
    let response = r#"[
      {"title": "Forever", "criteria": {"type": "lifestyle", "rule": {"kind": "waste_managed"}}, "duration_days": 365},
      {"title": "Never", "criteria": {"type": "lifestyle", "rule": {"kind": "waste_managed"}}, "duration_days": 0}
    ]"#;

    let challenges = parse_challenges(response).unwrap();
    assert_eq!(challenges[0].duration_days, 30);
    assert_eq!(challenges[1].duration_days, 1);
}

#[test]
fn test_bad_entries_are_skipped() {
    let response = r#"[
      {"title": "No criteria"},
      {"title": "Teleport", "criteria": {"type": "transport", "rule": {"kind": "mode", "target": "teleport"}}},
      {"title": "Walk", "criteria": {"type": "transport", "rule": {"kind": "mode", "target": "walking"}}}
    ]"#;

    let challenges = parse_challenges(response).unwrap();
    assert_eq!(challenges.len(), 1);
    assert_eq!(challenges[0].id, "ai_walk");
}

#[test]
fn test_response_is_capped() {
    let items: Vec<String> = (0..12)
        .map(|i| {
            format!(
                r#"{{"title": "Challenge {}", "criteria": {{"type": "lifestyle", "rule": {{"kind": "daily_logging"}}}}}}"#,
                i
            )
        })
        .collect();
    let response = format!("[{}]", items.join(","));

    let challenges = parse_challenges(&response).unwrap();
    assert_eq!(challenges.len(), MAX_GENERATED);
}

#[test]
fn test_nothing_usable_is_malformed() {
    assert!(matches!(
        parse_challenges("I could not think of anything."),
        Err(GenerationError::Malformed(_))
    ));
    assert!(matches!(
        parse_challenges("[]"),
        Err(GenerationError::Malformed(_))
    ));
    assert!(matches!(
        parse_challenges(r#"[{"title": "Broken"}]"#),
        Err(GenerationError::Malformed(_))
    ));
}
