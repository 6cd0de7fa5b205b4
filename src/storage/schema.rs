//! Database schema definitions for EcoTrack.

/// SQL schema for the core tables (version 1).
pub const SCHEMA: &str = r#"
-- Daily activity, one row per user and date
CREATE TABLE IF NOT EXISTS activity_records (
    user_id TEXT NOT NULL,
    date TEXT NOT NULL,
    answers_json TEXT NOT NULL,
    transport REAL NOT NULL,
    diet REAL NOT NULL,
    electricity REAL NOT NULL,
    lifestyle REAL NOT NULL,
    total REAL NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (user_id, date)
);

-- Points and streak per user; level is derived from eco_points
CREATE TABLE IF NOT EXISTS gamification_profiles (
    user_id TEXT PRIMARY KEY,
    eco_points INTEGER NOT NULL DEFAULT 0 CHECK (eco_points >= 0),
    daily_log_streak INTEGER NOT NULL DEFAULT 0,
    last_log_date TEXT,
    streak_start_date TEXT,
    previous_best_streak INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT
);

-- Badges, add-if-absent
CREATE TABLE IF NOT EXISTS user_badges (
    user_id TEXT NOT NULL,
    badge TEXT NOT NULL,
    awarded_at TEXT NOT NULL,
    PRIMARY KEY (user_id, badge)
);

-- Markers for keyed, apply-once credits
CREATE TABLE IF NOT EXISTS ledger_credits (
    user_id TEXT NOT NULL,
    credit_key TEXT NOT NULL,
    points INTEGER NOT NULL,
    credited_at TEXT NOT NULL,
    PRIMARY KEY (user_id, credit_key)
);

-- Challenge catalog
CREATE TABLE IF NOT EXISTS challenge_definitions (
    id TEXT PRIMARY KEY,
    definition_json TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Per-user enrollments; rows with is_completed = 1 are never modified
CREATE TABLE IF NOT EXISTS challenge_enrollments (
    user_id TEXT NOT NULL,
    challenge_id TEXT NOT NULL,
    title TEXT NOT NULL,
    criteria_json TEXT NOT NULL,
    target INTEGER NOT NULL,
    progress INTEGER NOT NULL DEFAULT 0,
    is_completed INTEGER NOT NULL DEFAULT 0,
    joined_at TEXT NOT NULL,
    last_progress_date TEXT,
    completed_at TEXT,
    reward_json TEXT NOT NULL,
    PRIMARY KEY (user_id, challenge_id)
);

CREATE INDEX IF NOT EXISTS idx_challenge_enrollments_open ON challenge_enrollments(user_id, is_completed);
"#;

/// SQL for the schema version table.
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Current schema version
pub const CURRENT_VERSION: i32 = 2;

/// SQL for migration from v1 to v2 (personalization tables)
pub const MIGRATION_V1_TO_V2: &str = r#"
-- Generated challenge set per user
CREATE TABLE IF NOT EXISTS challenge_cache (
    user_id TEXT PRIMARY KEY,
    challenges_json TEXT NOT NULL,
    fingerprint TEXT NOT NULL,
    footprint_snapshot REAL NOT NULL,
    generated_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

-- Generation calls per user
CREATE TABLE IF NOT EXISTS generation_usage (
    user_id TEXT PRIMARY KEY,
    generation_count INTEGER NOT NULL DEFAULT 0
);

-- Onboarding lifestyle profile
CREATE TABLE IF NOT EXISTS lifestyle_profiles (
    user_id TEXT PRIMARY KEY,
    profile_json TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;
