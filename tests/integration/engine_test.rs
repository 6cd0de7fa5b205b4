//! End-to-end tests for daily submissions, streaks and challenges.

use chrono::Duration;
use ecotrack::carbon::{AcHours, DailyAnswers, DietChoice, ImpactLevel, TransportMode};
use ecotrack::challenges::ChallengeError;
use ecotrack::storage::ChallengeStore;
use ecotrack::EngineError;
use uuid::Uuid;

use super::support::{date, memory_engine};

fn logged() -> DailyAnswers {
    DailyAnswers {
        diet_choice: Some(DietChoice::Vegetarian),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_low_impact_day() {
    let (_, engine) = memory_engine();
    let answers = DailyAnswers {
        meals_today: Some(3),
        meat_meals: Some(0),
        ac_hours: Some(AcHours::Zero),
        transport_mode: Some(TransportMode::Walking),
        ..Default::default()
    };

    let result = engine
        .submit_daily_activity(Uuid::new_v4(), date(2024, 5, 1), answers)
        .await
        .unwrap();

    assert!(result.breakdown.transport.abs() < 1e-9);
    assert!(result.total < ImpactLevel::LOW_THRESHOLD);
    assert_eq!(result.impact, ImpactLevel::Low);
    let streak = result.streak.unwrap();
    assert_eq!(streak.new_streak, 1);
    assert_eq!(streak.points_awarded, 10);
}

#[tokio::test]
async fn test_streak_extend_resubmit_and_reset() {
    let (_, engine) = memory_engine();
    let user = Uuid::new_v4();
    let d1 = date(2024, 5, 10);

    // Build a 5-day streak ending on d1
    for offset in (0..5).rev() {
        engine
            .submit_daily_activity(user, d1 - Duration::days(offset), logged())
            .await
            .unwrap();
    }
    let profile = engine.gamification_profile(user).await.unwrap();
    assert_eq!(profile.profile.daily_log_streak, 5);
    assert_eq!(profile.profile.eco_points, 50);

    // Next day extends the streak without a badge
    let next = engine
        .submit_daily_activity(user, d1 + Duration::days(1), logged())
        .await
        .unwrap()
        .streak
        .unwrap();
    assert_eq!(next.new_streak, 6);
    assert_eq!(next.points_awarded, 10);
    assert!(next.badge_awarded.is_none());

    // Same day again pays nothing
    let again = engine
        .submit_daily_activity(user, d1 + Duration::days(1), logged())
        .await
        .unwrap()
        .streak
        .unwrap();
    assert_eq!(again.new_streak, 6);
    assert_eq!(again.points_awarded, 0);
    assert_eq!(again.total_points, 60);

    // Eight-day gap resets
    let reset = engine
        .submit_daily_activity(user, d1 + Duration::days(9), logged())
        .await
        .unwrap()
        .streak
        .unwrap();
    assert_eq!(reset.new_streak, 1);

    let profile = engine.gamification_profile(user).await.unwrap();
    assert_eq!(profile.profile.daily_log_streak, 1);
    assert_eq!(profile.profile.previous_best_streak, 6);
    assert_eq!(profile.best_streak, 6);
    assert_eq!(profile.profile.eco_points, 70);
    assert_eq!(profile.level, 1);
}

#[tokio::test]
async fn test_seven_day_streak_awards_badge_once() {
    let (_, engine) = memory_engine();
    let user = Uuid::new_v4();
    let start = date(2024, 7, 1);

    let mut badges = Vec::new();
    for offset in 0..7 {
        let result = engine
            .submit_daily_activity(user, start + Duration::days(offset), logged())
            .await
            .unwrap();
        if let Some(badge) = result.streak.unwrap().badge_awarded {
            badges.push(badge);
        }
    }
    // Resubmitting the seventh day must not pay the bonus again
    engine
        .submit_daily_activity(user, start + Duration::days(6), logged())
        .await
        .unwrap();

    assert_eq!(badges, vec!["streak_7".to_string()]);
    let profile = engine.gamification_profile(user).await.unwrap();
    assert!(profile.profile.has_badge("streak_7"));
    // 7 daily points plus the 30 point bonus
    assert_eq!(profile.profile.eco_points, 100);
    assert_eq!(profile.level, 2);
}

#[tokio::test]
async fn test_vegan_day_completes_joined_challenge() {
    let (store, engine) = memory_engine();
    engine.seed_catalog().await.unwrap();
    let user = Uuid::new_v4();

    let enrollment = engine.join_challenge(user, "meat_free_monday").await.unwrap();
    assert_eq!(enrollment.progress, 0);
    assert_eq!(engine.active_enrollments(user).await.unwrap().len(), 1);

    let answers = DailyAnswers {
        diet_choice: Some(DietChoice::Vegan),
        ..Default::default()
    };
    let result = engine
        .submit_daily_activity(user, date(2024, 5, 6), answers)
        .await
        .unwrap();
    assert_eq!(result.challenge_updates, Some(1));

    let stored = store
        .get_enrollment(user, "meat_free_monday")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.progress, 1);
    assert!(stored.is_completed);
    assert!(engine.active_enrollments(user).await.unwrap().is_empty());

    let profile = engine.gamification_profile(user).await.unwrap();
    assert_eq!(profile.profile.eco_points, 60);
    assert!(profile.profile.has_badge("plant_pioneer"));

    // Completion is permanent
    assert!(matches!(
        engine.leave_challenge(user, "meat_free_monday").await,
        Err(EngineError::Challenge(ChallengeError::AlreadyCompleted))
    ));
    assert!(matches!(
        engine.join_challenge(user, "meat_free_monday").await,
        Err(EngineError::Challenge(ChallengeError::AlreadyCompleted))
    ));
}

#[tokio::test]
async fn test_join_twice_and_leave() {
    let (_, engine) = memory_engine();
    engine.seed_catalog().await.unwrap();
    let user = Uuid::new_v4();

    engine.join_challenge(user, "pedal_power").await.unwrap();
    assert!(matches!(
        engine.join_challenge(user, "pedal_power").await,
        Err(EngineError::Challenge(ChallengeError::AlreadyJoined))
    ));

    engine.leave_challenge(user, "pedal_power").await.unwrap();
    assert!(matches!(
        engine.leave_challenge(user, "pedal_power").await,
        Err(EngineError::Challenge(ChallengeError::NotJoined))
    ));
}

#[tokio::test]
async fn test_multi_day_challenge_counts_each_day_once() {
    let (store, engine) = memory_engine();
    engine.seed_catalog().await.unwrap();
    let user = Uuid::new_v4();
    engine.join_challenge(user, "public_transit_hero").await.unwrap();

    let bus = DailyAnswers {
        transport_mode: Some(TransportMode::Bus),
        ..Default::default()
    };
    let day = date(2024, 8, 1);
    engine.submit_daily_activity(user, day, bus.clone()).await.unwrap();
    engine.submit_daily_activity(user, day, bus.clone()).await.unwrap();

    let enrollment = store
        .get_enrollment(user, "public_transit_hero")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(enrollment.progress, 1);
    assert!(!enrollment.is_completed);

    engine
        .submit_daily_activity(user, day + Duration::days(1), bus.clone())
        .await
        .unwrap();
    engine
        .submit_daily_activity(user, day + Duration::days(2), bus)
        .await
        .unwrap();

    let enrollment = store
        .get_enrollment(user, "public_transit_hero")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(enrollment.progress, 3);
    assert!(enrollment.is_completed);

    let profile = engine.gamification_profile(user).await.unwrap();
    // 3 daily points plus the 80 point reward
    assert_eq!(profile.profile.eco_points, 110);
    assert!(profile.profile.has_badge("transit_hero"));
}

#[tokio::test]
async fn test_backdated_submission_does_not_advance_challenge() {
    let (store, engine) = memory_engine();
    engine.seed_catalog().await.unwrap();
    let user = Uuid::new_v4();
    engine.join_challenge(user, "public_transit_hero").await.unwrap();

    let bus = DailyAnswers {
        transport_mode: Some(TransportMode::Bus),
        ..Default::default()
    };
    let day = date(2024, 8, 10);
    engine.submit_daily_activity(user, day, bus.clone()).await.unwrap();
    engine
        .submit_daily_activity(user, day - Duration::days(2), bus.clone())
        .await
        .unwrap();
    // Resubmitting the latest day after the backdated one
    engine.submit_daily_activity(user, day, bus).await.unwrap();

    let enrollment = store
        .get_enrollment(user, "public_transit_hero")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(enrollment.progress, 1);
    assert_eq!(enrollment.last_progress_date, Some(day));
    assert!(!enrollment.is_completed);

    // Two distinct days logged, no reward
    let profile = engine.gamification_profile(user).await.unwrap();
    assert_eq!(profile.profile.eco_points, 20);
    assert!(!profile.profile.has_badge("transit_hero"));
}

#[tokio::test]
async fn test_thirty_day_streak_pays_every_milestone_once() {
    let (_, engine) = memory_engine();
    let user = Uuid::new_v4();
    let start = date(2024, 1, 1);

    let mut badges = Vec::new();
    for offset in 0..30 {
        let result = engine
            .submit_daily_activity(user, start + Duration::days(offset), logged())
            .await
            .unwrap();
        let streak = result.streak.unwrap();
        assert_eq!(streak.new_streak, offset as u32 + 1);
        if let Some(badge) = streak.badge_awarded {
            badges.push((offset + 1, badge));
        }
    }
    assert_eq!(
        badges,
        vec![
            (7, "streak_7".to_string()),
            (14, "streak_14".to_string()),
            (30, "streak_30".to_string()),
        ]
    );

    // Resubmitting a milestone day pays nothing
    let again = engine
        .submit_daily_activity(user, start + Duration::days(29), logged())
        .await
        .unwrap()
        .streak
        .unwrap();
    assert_eq!(again.points_awarded, 0);
    assert!(again.badge_awarded.is_none());

    let profile = engine.gamification_profile(user).await.unwrap();
    // 30 daily points plus 30 + 50 + 100 in bonuses
    assert_eq!(profile.profile.eco_points, 480);
    assert_eq!(profile.level, 5);
    let held: Vec<&str> = profile.profile.badges.iter().map(String::as_str).collect();
    assert_eq!(held, vec!["streak_14", "streak_30", "streak_7"]);

    let report = engine.reconcile_user(user).await.unwrap();
    assert_eq!(report.milestone_credits, 0);
    assert_eq!(report.total_points, 480);
}

#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let (_, engine) = memory_engine();
    let user = Uuid::new_v4();
    let start = date(2024, 9, 1);
    for offset in 0..3 {
        engine
            .submit_daily_activity(user, start + Duration::days(offset), logged())
            .await
            .unwrap();
    }

    let report = engine.reconcile_user(user).await.unwrap();
    assert_eq!(report.logged_days, 3);
    assert_eq!(report.streak.current_streak, 3);
    assert_eq!(report.daily_credits, 0);
    assert_eq!(report.total_points, 30);

    let again = engine.reconcile_user(user).await.unwrap();
    assert_eq!(again.total_points, 30);
}

#[tokio::test]
async fn test_offline_personalization_serves_fallback() {
    let (_, engine) = memory_engine();
    let user = Uuid::new_v4();

    let result = engine.get_personalized_challenges(user).await;
    assert!(!result.from_cache);
    assert!(!result.challenges.is_empty());
    assert_eq!(engine.generation_count(user).await.unwrap(), 0);
}
