//! Unit tests for the daily-logging streak state machine.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use ecotrack::gamification::streak::{advance, replay};
use ecotrack::gamification::{level_for_points, StreakState, StreakTransition};

fn d1() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
}

fn streak_of(days: u32, last: NaiveDate) -> StreakState {
    StreakState {
        current_streak: days,
        last_log_date: Some(last),
        streak_start_date: Some(last - Duration::days(days as i64 - 1)),
        previous_best_streak: 0,
    }
}

#[test]
fn test_next_day_extends_streak_without_badge() {
    let state = streak_of(5, d1());
    let outcome = advance(&state, d1() + Duration::days(1), &BTreeSet::new());

    assert_eq!(outcome.transition, StreakTransition::Continued);
    assert_eq!(outcome.state.current_streak, 6);
    assert_eq!(outcome.state.streak_start_date, state.streak_start_date);
    assert!(outcome.milestone.is_none());
}

#[test]
fn test_same_day_resubmission_changes_nothing() {
    let state = streak_of(6, d1());
    let outcome = advance(&state, d1(), &BTreeSet::new());

    assert_eq!(outcome.transition, StreakTransition::Unchanged);
    assert_eq!(outcome.state, state);
}

#[test]
fn test_backdated_submission_changes_nothing() {
    let state = streak_of(6, d1());
    let outcome = advance(&state, d1() - Duration::days(3), &BTreeSet::new());

    assert_eq!(outcome.transition, StreakTransition::Unchanged);
    assert_eq!(outcome.state.current_streak, 6);
}

#[test]
fn test_gap_resets_and_keeps_best() {
    let state = streak_of(6, d1());
    let later = d1() + Duration::days(8);
    let outcome = advance(&state, later, &BTreeSet::new());

    assert_eq!(outcome.transition, StreakTransition::Reset { broken_streak: 6 });
    assert_eq!(outcome.state.current_streak, 1);
    assert_eq!(outcome.state.previous_best_streak, 6);
    assert_eq!(outcome.state.streak_start_date, Some(later));
}

#[test]
fn test_seventh_day_offers_milestone_once() {
    let state = streak_of(6, d1());
    let next = d1() + Duration::days(1);

    let outcome = advance(&state, next, &BTreeSet::new());
    let milestone = outcome.milestone.expect("7-day milestone");
    assert_eq!(milestone.badge, "streak_7");
    assert_eq!(milestone.bonus_points, 30);

    let mut held = BTreeSet::new();
    held.insert("streak_7".to_string());
    let again = advance(&state, next, &held);
    assert!(again.milestone.is_none());
}

#[test]
fn test_replay_rebuilds_state_and_milestones() {
    let start = d1();
    let mut dates: Vec<NaiveDate> = (0..15).map(|i| start + Duration::days(i)).collect();
    // Duplicates and ordering must not matter
    dates.push(start + Duration::days(3));
    dates.reverse();

    let replayed = replay(&dates);
    assert_eq!(replayed.state.current_streak, 15);
    assert_eq!(replayed.state.streak_start_date, Some(start));
    let badges: Vec<&str> = replayed.milestones.iter().map(|m| m.badge).collect();
    assert_eq!(badges, vec!["streak_7", "streak_14"]);
}

#[test]
fn test_replay_after_break() {
    let start = d1();
    let mut dates: Vec<NaiveDate> = (0..8).map(|i| start + Duration::days(i)).collect();
    dates.push(start + Duration::days(20));

    let replayed = replay(&dates);
    assert_eq!(replayed.state.current_streak, 1);
    assert_eq!(replayed.state.previous_best_streak, 8);
    assert_eq!(replayed.milestones.len(), 1);
}

#[test]
fn test_level_from_points() {
    assert_eq!(level_for_points(0), 1);
    assert_eq!(level_for_points(99), 1);
    assert_eq!(level_for_points(100), 2);
    assert_eq!(level_for_points(1250), 13);
}
