//! Engine over the SQLite store, including persistence across reopen.

use std::sync::Arc;

use chrono::Duration;
use ecotrack::carbon::{DailyAnswers, DietChoice, LifestyleProfile, TransportMode};
use ecotrack::storage::config::{load_config_from, save_config_to};
use ecotrack::storage::{ActivityStore, LedgerStore, ProfileStore};
use ecotrack::{AppConfig, EcoEngine, SqliteStore};
use tempfile::tempdir;
use uuid::Uuid;

use super::support::{date, OfflineGenerator};

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ecotrack.db");
    let user = Uuid::new_v4();
    let start = date(2024, 2, 1);

    {
        let store = Arc::new(SqliteStore::open(&path).unwrap());
        assert_eq!(store.schema_version().await.unwrap(), 2);

        let engine = EcoEngine::new(store, Arc::new(OfflineGenerator), &AppConfig::default());
        engine.seed_catalog().await.unwrap();
        engine.join_challenge(user, "meat_free_monday").await.unwrap();
        engine
            .set_lifestyle_profile(
                user,
                &LifestyleProfile {
                    transport_mode: Some(TransportMode::Train),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        for offset in 0..2 {
            engine
                .submit_daily_activity(
                    user,
                    start + Duration::days(offset),
                    DailyAnswers {
                        diet_choice: Some(DietChoice::Vegan),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }
    }

    let store = SqliteStore::open(&path).unwrap();
    let profile = store.read_profile(user).await.unwrap();
    // Two daily points plus the 50 point challenge reward
    assert_eq!(profile.eco_points, 70);
    assert_eq!(profile.daily_log_streak, 2);
    assert_eq!(profile.last_log_date, Some(start + Duration::days(1)));
    assert!(profile.has_badge("plant_pioneer"));

    assert_eq!(
        store.activity_dates(user).await.unwrap(),
        vec![start, start + Duration::days(1)]
    );
    let lifestyle = store.get_lifestyle_profile(user).await.unwrap().unwrap();
    assert_eq!(lifestyle.transport_mode, Some(TransportMode::Train));
}

#[tokio::test]
async fn test_reconcile_on_sqlite() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let engine = EcoEngine::new(store, Arc::new(OfflineGenerator), &AppConfig::default());
    let user = Uuid::new_v4();
    let start = date(2024, 3, 1);

    for offset in [0, 1, 2, 5] {
        engine
            .submit_daily_activity(
                user,
                start + Duration::days(offset),
                DailyAnswers {
                    meals_today: Some(3),
                    meat_meals: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    let report = engine.reconcile_user(user).await.unwrap();
    assert_eq!(report.logged_days, 4);
    assert_eq!(report.streak.current_streak, 1);
    assert_eq!(report.streak.previous_best_streak, 3);
    assert_eq!(report.total_points, 40);
}

#[test]
fn test_config_round_trip_sets_database_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let mut config = AppConfig::default();
    config.cache.ttl_days = 7;
    config.scoring.daily_log_points = 15;
    save_config_to(&config, &path).unwrap();

    let loaded = load_config_from(&path).unwrap();
    assert_eq!(loaded.cache.ttl_days, 7);
    assert_eq!(loaded.scoring.daily_log_points, 15);
    assert_eq!(loaded.database_path(), dir.path().join("ecotrack.db"));
}
