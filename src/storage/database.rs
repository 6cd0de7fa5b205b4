//! SQLite store using rusqlite.
//!
//! The connection sits behind an async mutex. Each trait method locks it once
//! and runs a synchronous helper, so every call is serialized and the multi
//! statement ones run inside a single transaction.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Transaction};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::schema::{CURRENT_VERSION, MIGRATION_V1_TO_V2, SCHEMA, SCHEMA_VERSION_TABLE};
use super::{ActivityStore, CacheStore, ChallengeStore, LedgerStore, ProfileStore, StorageError};
use crate::carbon::types::{ActivityRecord, CarbonBreakdown, LifestyleProfile};
use crate::challenges::types::{ChallengeDefinition, ChallengeEnrollment};
use crate::gamification::types::{CreditOutcome, GamificationProfile, LedgerDelta, StreakState};
use crate::personalized::types::ChallengeCacheEntry;

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::IoError(e.to_string()))?;
        }

        let conn =
            Connection::open(path).map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Current schema version.
    pub async fn schema_version(&self) -> Result<i32, StorageError> {
        let conn = self.conn.lock().await;
        get_schema_version(&conn)
    }
}

/// Initialize the database schema.
fn initialize(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

    // Create schema version table
    conn.execute_batch(SCHEMA_VERSION_TABLE)
        .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

    let current_version = get_schema_version(conn)?;
    if current_version < CURRENT_VERSION {
        migrate(conn, current_version)?;
    }

    Ok(())
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> Result<i32, StorageError> {
    let result: SqliteResult<i32> = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    );

    match result {
        Ok(version) => Ok(version),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(StorageError::QueryFailed(e.to_string())),
    }
}

/// Run database migrations.
fn migrate(conn: &Connection, from_version: i32) -> Result<(), StorageError> {
    let steps: [(i32, &str); 2] = [(1, SCHEMA), (2, MIGRATION_V1_TO_V2)];

    for (version, sql) in steps {
        if from_version >= version {
            continue;
        }
        conn.execute_batch(sql)
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        conn.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
            [version],
        )
        .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        tracing::info!("Database migrated to version {}", version);
    }

    Ok(())
}

fn begin(conn: &mut Connection) -> Result<Transaction<'_>, StorageError> {
    conn.transaction()
        .map_err(|e| StorageError::TransactionFailed(e.to_string()))
}

fn commit(tx: Transaction<'_>) -> Result<(), StorageError> {
    tx.commit()
        .map_err(|e| StorageError::TransactionFailed(e.to_string()))
}

fn parse_date(value: &str) -> Result<NaiveDate, StorageError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| StorageError::SerializationError(format!("bad date '{}': {}", value, e)))
}

fn parse_opt_date(value: Option<String>) -> Result<Option<NaiveDate>, StorageError> {
    value.as_deref().map(parse_date).transpose()
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::SerializationError(format!("bad timestamp '{}': {}", value, e)))
}

fn parse_opt_timestamp(value: Option<String>) -> Result<Option<DateTime<Utc>>, StorageError> {
    value.as_deref().map(parse_timestamp).transpose()
}

// ========== Activity records ==========

type ActivityRow = (String, String, f64, f64, f64, f64, f64, String, String);

const ACTIVITY_COLUMNS: &str =
    "date, answers_json, transport, diet, electricity, lifestyle, total, created_at, updated_at";

fn activity_row(row: &rusqlite::Row<'_>) -> SqliteResult<ActivityRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn activity_from_row(user_id: Uuid, row: ActivityRow) -> Result<ActivityRecord, StorageError> {
    let (date, answers_json, transport, diet, electricity, lifestyle, total, created, updated) = row;
    Ok(ActivityRecord {
        user_id,
        date: parse_date(&date)?,
        answers: serde_json::from_str(&answers_json)?,
        breakdown: CarbonBreakdown {
            transport,
            diet,
            electricity,
            lifestyle,
            total,
        },
        created_at: parse_timestamp(&created)?,
        updated_at: parse_timestamp(&updated)?,
    })
}

fn query_activities(
    conn: &Connection,
    user_id: Uuid,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<ActivityRecord>, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, activity_row)?
        .collect::<SqliteResult<Vec<_>>>()?;
    rows.into_iter()
        .map(|row| activity_from_row(user_id, row))
        .collect()
}

impl ActivityStore for SqliteStore {
    async fn upsert_activity(&self, record: &ActivityRecord) -> Result<(), StorageError> {
        let answers_json = serde_json::to_string(&record.answers)?;
        let b = record.breakdown;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO activity_records
             (user_id, date, answers_json, transport, diet, electricity, lifestyle, total, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(user_id, date) DO UPDATE SET
                answers_json = excluded.answers_json,
                transport = excluded.transport,
                diet = excluded.diet,
                electricity = excluded.electricity,
                lifestyle = excluded.lifestyle,
                total = excluded.total,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at",
            params![
                record.user_id.to_string(),
                record.date.to_string(),
                answers_json,
                b.transport,
                b.diet,
                b.electricity,
                b.lifestyle,
                b.total,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn get_activity(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<ActivityRecord>, StorageError> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {} FROM activity_records WHERE user_id = ?1 AND date = ?2",
            ACTIVITY_COLUMNS
        );
        let row = conn
            .query_row(
                &sql,
                params![user_id.to_string(), date.to_string()],
                activity_row,
            )
            .optional()?;
        row.map(|row| activity_from_row(user_id, row)).transpose()
    }

    async fn activities_between(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ActivityRecord>, StorageError> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {} FROM activity_records
             WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date ASC",
            ACTIVITY_COLUMNS
        );
        query_activities(
            &conn,
            user_id,
            &sql,
            params![user_id.to_string(), from.to_string(), to.to_string()],
        )
    }

    async fn latest_activity(&self, user_id: Uuid) -> Result<Option<ActivityRecord>, StorageError> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {} FROM activity_records WHERE user_id = ?1 ORDER BY date DESC LIMIT 1",
            ACTIVITY_COLUMNS
        );
        let mut records = query_activities(&conn, user_id, &sql, params![user_id.to_string()])?;
        Ok(records.pop())
    }

    async fn activity_dates(&self, user_id: Uuid) -> Result<Vec<NaiveDate>, StorageError> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare("SELECT date FROM activity_records WHERE user_id = ?1 ORDER BY date ASC")?;
        let dates = stmt
            .query_map(params![user_id.to_string()], |row| row.get::<_, String>(0))?
            .collect::<SqliteResult<Vec<_>>>()?;
        dates.iter().map(|d| parse_date(d)).collect()
    }
}

// ========== Ledger ==========

fn read_profile(conn: &Connection, user_id: Uuid) -> Result<GamificationProfile, StorageError> {
    let uid = user_id.to_string();

    let row: Option<(i64, u32, Option<String>, Option<String>, u32, Option<String>)> = conn
        .query_row(
            "SELECT eco_points, daily_log_streak, last_log_date, streak_start_date,
                    previous_best_streak, updated_at
             FROM gamification_profiles WHERE user_id = ?1",
            params![uid],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )
        .optional()?;

    let mut profile = GamificationProfile::empty(user_id);
    if let Some((points, streak, last, start, best, updated)) = row {
        profile.eco_points = points.max(0) as u64;
        profile.daily_log_streak = streak;
        profile.last_log_date = parse_opt_date(last)?;
        profile.streak_start_date = parse_opt_date(start)?;
        profile.previous_best_streak = best;
        profile.updated_at = parse_opt_timestamp(updated)?;
    }

    let mut stmt = conn.prepare("SELECT badge FROM user_badges WHERE user_id = ?1")?;
    profile.badges = stmt
        .query_map(params![uid], |row| row.get::<_, String>(0))?
        .collect::<SqliteResult<_>>()?;

    Ok(profile)
}

/// Increment points and insert badges if absent.
fn apply_delta(conn: &Connection, user_id: Uuid, delta: &LedgerDelta) -> Result<(), StorageError> {
    let uid = user_id.to_string();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO gamification_profiles (user_id, eco_points, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET
            eco_points = eco_points + excluded.eco_points,
            updated_at = excluded.updated_at",
        params![uid, delta.points, now],
    )?;

    for badge in &delta.badges {
        conn.execute(
            "INSERT OR IGNORE INTO user_badges (user_id, badge, awarded_at) VALUES (?1, ?2, ?3)",
            params![uid, badge, now],
        )?;
    }

    Ok(())
}

fn save_streak(conn: &Connection, user_id: Uuid, streak: &StreakState) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO gamification_profiles
         (user_id, daily_log_streak, last_log_date, streak_start_date, previous_best_streak, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(user_id) DO UPDATE SET
            daily_log_streak = excluded.daily_log_streak,
            last_log_date = excluded.last_log_date,
            streak_start_date = excluded.streak_start_date,
            previous_best_streak = excluded.previous_best_streak,
            updated_at = excluded.updated_at",
        params![
            user_id.to_string(),
            streak.current_streak,
            streak.last_log_date.map(|d| d.to_string()),
            streak.streak_start_date.map(|d| d.to_string()),
            streak.previous_best_streak,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

impl LedgerStore for SqliteStore {
    async fn read_profile(&self, user_id: Uuid) -> Result<GamificationProfile, StorageError> {
        let conn = self.conn.lock().await;
        read_profile(&conn, user_id)
    }

    async fn save_streak(&self, user_id: Uuid, streak: &StreakState) -> Result<(), StorageError> {
        let conn = self.conn.lock().await;
        save_streak(&conn, user_id, streak)
    }

    async fn compare_and_save_streak(
        &self,
        user_id: Uuid,
        expected_last: Option<NaiveDate>,
        streak: &StreakState,
    ) -> Result<bool, StorageError> {
        let mut conn = self.conn.lock().await;
        let tx = begin(&mut conn)?;
        let stored: Option<String> = tx
            .query_row(
                "SELECT last_log_date FROM gamification_profiles WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten();
        if parse_opt_date(stored)? != expected_last {
            return Ok(false);
        }
        save_streak(&tx, user_id, streak)?;
        commit(tx)?;
        Ok(true)
    }

    async fn apply_delta(
        &self,
        user_id: Uuid,
        delta: &LedgerDelta,
    ) -> Result<GamificationProfile, StorageError> {
        let mut conn = self.conn.lock().await;
        let tx = begin(&mut conn)?;
        apply_delta(&tx, user_id, delta)?;
        let profile = read_profile(&tx, user_id)?;
        commit(tx)?;
        Ok(profile)
    }

    async fn apply_delta_once(
        &self,
        user_id: Uuid,
        credit_key: &str,
        delta: &LedgerDelta,
    ) -> Result<CreditOutcome, StorageError> {
        let mut conn = self.conn.lock().await;
        let tx = begin(&mut conn)?;

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO ledger_credits (user_id, credit_key, points, credited_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                user_id.to_string(),
                credit_key,
                delta.points,
                Utc::now().to_rfc3339()
            ],
        )?;

        let applied = inserted > 0;
        if applied {
            apply_delta(&tx, user_id, delta)?;
        }
        let profile = read_profile(&tx, user_id)?;
        commit(tx)?;

        Ok(CreditOutcome { applied, profile })
    }

    async fn has_credit(&self, user_id: Uuid, credit_key: &str) -> Result<bool, StorageError> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare("SELECT 1 FROM ledger_credits WHERE user_id = ?1 AND credit_key = ?2")?;
        Ok(stmt.exists(params![user_id.to_string(), credit_key])?)
    }
}

// ========== Challenges ==========

type EnrollmentRow = (
    String,
    String,
    String,
    u32,
    u32,
    bool,
    String,
    Option<String>,
    Option<String>,
    String,
);

const ENROLLMENT_COLUMNS: &str = "challenge_id, title, criteria_json, target, progress, is_completed, \
     joined_at, last_progress_date, completed_at, reward_json";

fn enrollment_row(row: &rusqlite::Row<'_>) -> SqliteResult<EnrollmentRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

fn enrollment_from_row(user_id: Uuid, row: EnrollmentRow) -> Result<ChallengeEnrollment, StorageError> {
    let (challenge_id, title, criteria, target, progress, is_completed, joined, last, completed, reward) =
        row;
    Ok(ChallengeEnrollment {
        user_id,
        challenge_id,
        title,
        criteria: serde_json::from_str(&criteria)?,
        target,
        progress,
        is_completed,
        joined_at: parse_timestamp(&joined)?,
        last_progress_date: parse_opt_date(last)?,
        completed_at: parse_opt_timestamp(completed)?,
        reward: serde_json::from_str(&reward)?,
    })
}

fn insert_enrollment(conn: &Connection, enrollment: &ChallengeEnrollment) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO challenge_enrollments
         (user_id, challenge_id, title, criteria_json, target, progress, is_completed,
          joined_at, last_progress_date, completed_at, reward_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            enrollment.user_id.to_string(),
            enrollment.challenge_id,
            enrollment.title,
            serde_json::to_string(&enrollment.criteria)?,
            enrollment.target,
            enrollment.progress,
            enrollment.is_completed,
            enrollment.joined_at.to_rfc3339(),
            enrollment.last_progress_date.map(|d| d.to_string()),
            enrollment.completed_at.map(|t| t.to_rfc3339()),
            serde_json::to_string(&enrollment.reward)?,
        ],
    )?;
    Ok(())
}

fn update_progress(tx: &Connection, enrollment: &ChallengeEnrollment) -> Result<(), StorageError> {
    // Missing rows stay missing; completed rows and rows already further
    // along are left as they are
    tx.execute(
        "UPDATE challenge_enrollments SET
            progress = ?3,
            is_completed = ?4,
            last_progress_date = ?5,
            completed_at = ?6
         WHERE user_id = ?1 AND challenge_id = ?2
           AND is_completed = 0 AND progress <= ?3",
        params![
            enrollment.user_id.to_string(),
            enrollment.challenge_id,
            enrollment.progress,
            enrollment.is_completed,
            enrollment.last_progress_date.map(|d| d.to_string()),
            enrollment.completed_at.map(|t| t.to_rfc3339()),
        ],
    )?;
    Ok(())
}

impl ChallengeStore for SqliteStore {
    async fn get_challenge(
        &self,
        challenge_id: &str,
    ) -> Result<Option<ChallengeDefinition>, StorageError> {
        let conn = self.conn.lock().await;
        let json: Option<String> = conn
            .query_row(
                "SELECT definition_json FROM challenge_definitions WHERE id = ?1",
                params![challenge_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(json.map(|j| serde_json::from_str(&j)).transpose()?)
    }

    async fn list_challenges(&self) -> Result<Vec<ChallengeDefinition>, StorageError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT definition_json FROM challenge_definitions ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<SqliteResult<Vec<_>>>()?;
        rows.iter()
            .map(|j| serde_json::from_str(j).map_err(StorageError::from))
            .collect()
    }

    async fn upsert_challenge(&self, challenge: &ChallengeDefinition) -> Result<(), StorageError> {
        let json = serde_json::to_string(challenge)?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO challenge_definitions (id, definition_json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                definition_json = excluded.definition_json,
                updated_at = excluded.updated_at",
            params![challenge.id, json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    async fn enrollments(&self, user_id: Uuid) -> Result<Vec<ChallengeEnrollment>, StorageError> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {} FROM challenge_enrollments WHERE user_id = ?1 ORDER BY joined_at ASC",
            ENROLLMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![user_id.to_string()], enrollment_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        rows.into_iter()
            .map(|row| enrollment_from_row(user_id, row))
            .collect()
    }

    async fn get_enrollment(
        &self,
        user_id: Uuid,
        challenge_id: &str,
    ) -> Result<Option<ChallengeEnrollment>, StorageError> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {} FROM challenge_enrollments WHERE user_id = ?1 AND challenge_id = ?2",
            ENROLLMENT_COLUMNS
        );
        let row = conn
            .query_row(&sql, params![user_id.to_string(), challenge_id], enrollment_row)
            .optional()?;
        row.map(|row| enrollment_from_row(user_id, row)).transpose()
    }

    async fn insert_enrollment(&self, enrollment: &ChallengeEnrollment) -> Result<(), StorageError> {
        let conn = self.conn.lock().await;
        let mut check = conn.prepare(
            "SELECT 1 FROM challenge_enrollments WHERE user_id = ?1 AND challenge_id = ?2",
        )?;
        if check.exists(params![enrollment.user_id.to_string(), enrollment.challenge_id])? {
            return Err(StorageError::Conflict(format!(
                "enrollment {}/{}",
                enrollment.user_id, enrollment.challenge_id
            )));
        }
        insert_enrollment(&conn, enrollment)
    }

    async fn delete_enrollment(&self, user_id: Uuid, challenge_id: &str) -> Result<bool, StorageError> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute(
            "DELETE FROM challenge_enrollments
             WHERE user_id = ?1 AND challenge_id = ?2 AND is_completed = 0",
            params![user_id.to_string(), challenge_id],
        )?;
        Ok(deleted > 0)
    }

    async fn write_enrollments(
        &self,
        user_id: Uuid,
        enrollments: &[ChallengeEnrollment],
    ) -> Result<(), StorageError> {
        let mut conn = self.conn.lock().await;
        let tx = begin(&mut conn)?;
        for enrollment in enrollments.iter().filter(|e| e.user_id == user_id) {
            update_progress(&tx, enrollment)?;
        }
        commit(tx)
    }
}

// ========== Challenge cache ==========

impl CacheStore for SqliteStore {
    async fn get_cache_entry(&self, user_id: Uuid) -> Result<Option<ChallengeCacheEntry>, StorageError> {
        let conn = self.conn.lock().await;
        let row: Option<(String, String, f64, String, String)> = conn
            .query_row(
                "SELECT challenges_json, fingerprint, footprint_snapshot, generated_at, expires_at
                 FROM challenge_cache WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .optional()?;

        row.map(
            |(challenges, fingerprint, footprint_snapshot, generated, expires)| -> Result<_, StorageError> {
            Ok(ChallengeCacheEntry {
                user_id,
                challenges: serde_json::from_str(&challenges)?,
                fingerprint,
                footprint_snapshot,
                generated_at: parse_timestamp(&generated)?,
                expires_at: parse_timestamp(&expires)?,
            })
        },
        )
        .transpose()
    }

    async fn put_cache_entry(&self, entry: &ChallengeCacheEntry) -> Result<(), StorageError> {
        let challenges = serde_json::to_string(&entry.challenges)?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO challenge_cache
             (user_id, challenges_json, fingerprint, footprint_snapshot, generated_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.user_id.to_string(),
                challenges,
                entry.fingerprint,
                entry.footprint_snapshot,
                entry.generated_at.to_rfc3339(),
                entry.expires_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn increment_generation_count(&self, user_id: Uuid) -> Result<u64, StorageError> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row(
            "INSERT INTO generation_usage (user_id, generation_count) VALUES (?1, 1)
             ON CONFLICT(user_id) DO UPDATE SET generation_count = generation_count + 1
             RETURNING generation_count",
            params![user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    async fn generation_count(&self, user_id: Uuid) -> Result<u64, StorageError> {
        let conn = self.conn.lock().await;
        let count: Option<i64> = conn
            .query_row(
                "SELECT generation_count FROM generation_usage WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0).max(0) as u64)
    }
}

// ========== Lifestyle profiles ==========

impl ProfileStore for SqliteStore {
    async fn get_lifestyle_profile(
        &self,
        user_id: Uuid,
    ) -> Result<Option<LifestyleProfile>, StorageError> {
        let conn = self.conn.lock().await;
        let json: Option<String> = conn
            .query_row(
                "SELECT profile_json FROM lifestyle_profiles WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(json.map(|j| serde_json::from_str(&j)).transpose()?)
    }

    async fn put_lifestyle_profile(
        &self,
        user_id: Uuid,
        profile: &LifestyleProfile,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string(profile)?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO lifestyle_profiles (user_id, profile_json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                profile_json = excluded.profile_json,
                updated_at = excluded.updated_at",
            params![user_id.to_string(), json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
