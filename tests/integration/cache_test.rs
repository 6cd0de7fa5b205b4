//! Personalized challenge cache behaviour against a scripted generator.

use std::sync::Arc;

use chrono::{Duration, Utc};
use ecotrack::carbon::{DailyAnswers, DistanceBucket, LifestyleProfile, TransportMode};
use ecotrack::personalized::ChallengeSource;
use ecotrack::storage::{CacheSettings, CacheStore, GeneratorSettings};
use ecotrack::{AppConfig, EcoEngine, MemoryStore, PersonalizedChallengeCache};
use uuid::Uuid;

use super::support::{date, ScriptedGenerator, GENERATED};

fn profile() -> LifestyleProfile {
    LifestyleProfile {
        transport_mode: Some(TransportMode::CarPetrol),
        commute_distance: Some(DistanceBucket::From15To30),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_footprint_drift_forces_regeneration() {
    let store = Arc::new(MemoryStore::new());
    let generator = Arc::new(ScriptedGenerator::new(GENERATED));
    let cache = PersonalizedChallengeCache::new(
        store.clone(),
        generator.clone(),
        CacheSettings::default(),
        &GeneratorSettings::default(),
    );
    let user = Uuid::new_v4();
    let t = Utc::now();

    let first = cache.get_challenges_at(user, &profile(), 20.0, t).await;
    assert_eq!(first.source, ChallengeSource::Generated);

    // Same inputs a day later: served from cache
    let hit = cache
        .get_challenges_at(user, &profile(), 20.0, t + Duration::days(1))
        .await;
    assert!(hit.from_cache);
    assert_eq!(generator.calls(), 1);

    // 25% drift inside the TTL: regenerated
    let drifted = cache
        .get_challenges_at(user, &profile(), 25.0, t + Duration::days(1))
        .await;
    assert!(!drifted.from_cache);
    assert_eq!(generator.calls(), 2);

    let entry = store.get_cache_entry(user).await.unwrap().unwrap();
    assert!((entry.footprint_snapshot - 25.0).abs() < 1e-9);
    assert_eq!(store.generation_count(user).await.unwrap(), 2);
}

#[tokio::test]
async fn test_profile_change_forces_regeneration() {
    let store = Arc::new(MemoryStore::new());
    let generator = Arc::new(ScriptedGenerator::new(GENERATED));
    let cache = PersonalizedChallengeCache::new(
        store,
        generator.clone(),
        CacheSettings::default(),
        &GeneratorSettings::default(),
    );
    let user = Uuid::new_v4();
    let t = Utc::now();

    cache.get_challenges_at(user, &profile(), 10.0, t).await;

    let mut changed = profile();
    changed.transport_mode = Some(TransportMode::Bus);
    let result = cache.get_challenges_at(user, &changed, 10.0, t).await;
    assert!(!result.from_cache);
    assert_eq!(generator.calls(), 2);
}

#[tokio::test]
async fn test_engine_serves_and_joins_generated_challenges() {
    let store = Arc::new(MemoryStore::new());
    let generator = Arc::new(ScriptedGenerator::new(GENERATED));
    let engine = EcoEngine::new(store, generator.clone(), &AppConfig::default());
    engine.seed_catalog().await.unwrap();
    let user = Uuid::new_v4();

    let generated = engine.get_personalized_challenges(user).await;
    assert_eq!(generated.source, ChallengeSource::Generated);
    assert_eq!(generated.challenges[0].id, "ai_metro_monday");

    let cached = engine.get_personalized_challenges(user).await;
    assert!(cached.from_cache);
    assert!(cached.cache_age_secs.is_some());
    assert_eq!(generator.calls(), 1);

    // Generated challenges can be joined like catalog ones
    let enrollment = engine.join_challenge(user, "ai_metro_monday").await.unwrap();
    assert_eq!(enrollment.reward.points, 25);

    // Logging a day moves the footprint off the snapshot
    let result = engine
        .submit_daily_activity(
            user,
            date(2024, 10, 1),
            DailyAnswers {
                transport_mode: Some(TransportMode::Metro),
                distance: Some(DistanceBucket::From15To30),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(result.challenge_updates, Some(1));

    let regenerated = engine.get_personalized_challenges(user).await;
    assert!(!regenerated.from_cache);
    assert_eq!(generator.calls(), 2);

    let refreshed = engine.refresh_challenges(user).await;
    assert_eq!(refreshed.source, ChallengeSource::Generated);
    assert_eq!(generator.calls(), 3);
    assert_eq!(engine.generation_count(user).await.unwrap(), 3);
}
