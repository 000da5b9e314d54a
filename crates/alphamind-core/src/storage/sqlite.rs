//! SQLite-backed [`Store`].
//!
//! The default backend. Dates are stored as `YYYY-MM-DD` text and
//! timestamps as RFC3339 with microseconds so lexical order matches
//! chronological order. The daily snapshot (progress log + summary) is
//! written in one transaction.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::migrations;
use super::store::Store;
use crate::error::StoreError;
use crate::model::{
    HabitRecord, MindsetNote, ProgressLog, ProgressPatch, UserId, UserPatch, UserSummary,
};

const USER_COLUMNS: &str = "id, name, personal_goal, financial_goal, current_savings, target_savings,
     daily_discipline, productive_time, streak, level, badges, completed_onboarding,
     created_at, updated_at";

const PROGRESS_COLUMNS: &str =
    "id, user_id, date, discipline_score, productive_hours, habits_completed, total_habits, created_at";

/// SQLite database holding every collection.
///
/// Cloning is cheap and shares the connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (creating if needed) the database file at `path` and migrate it.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

// === Helper Functions ===

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(raw: &str, column: usize) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn format_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str, column: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn row_to_user(row: &Row) -> Result<UserSummary, rusqlite::Error> {
    let badges_json: String = row.get(10)?;
    let badges = serde_json::from_str(&badges_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(10, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let created_at: String = row.get(12)?;
    let updated_at: String = row.get(13)?;

    Ok(UserSummary {
        id: row.get(0)?,
        name: row.get(1)?,
        personal_goal: row.get(2)?,
        financial_goal: row.get(3)?,
        current_savings: row.get(4)?,
        target_savings: row.get(5)?,
        daily_discipline: row.get(6)?,
        productive_time: row.get(7)?,
        streak: row.get(8)?,
        level: row.get(9)?,
        badges,
        completed_onboarding: row.get(11)?,
        created_at: Some(parse_ts(&created_at, 12)?),
        updated_at: Some(parse_ts(&updated_at, 13)?),
    })
}

fn row_to_habit(row: &Row) -> Result<HabitRecord, rusqlite::Error> {
    let date: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    Ok(HabitRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        completed: row.get(3)?,
        date: parse_date(&date, 4)?,
        created_at: Some(parse_ts(&created_at, 5)?),
    })
}

fn row_to_progress(row: &Row) -> Result<ProgressLog, rusqlite::Error> {
    let date: String = row.get(2)?;
    let created_at: String = row.get(7)?;
    Ok(ProgressLog {
        id: row.get(0)?,
        user_id: row.get(1)?,
        date: parse_date(&date, 2)?,
        discipline_score: row.get(3)?,
        productive_hours: row.get(4)?,
        habits_completed: row.get(5)?,
        total_habits: row.get(6)?,
        created_at: Some(parse_ts(&created_at, 7)?),
    })
}

fn row_to_note(row: &Row) -> Result<MindsetNote, rusqlite::Error> {
    let created_at: String = row.get(3)?;
    Ok(MindsetNote {
        id: row.get(0)?,
        user_id: row.get(1)?,
        content: row.get(2)?,
        created_at: parse_ts(&created_at, 3)?,
    })
}

fn select_user(conn: &Connection, user: &UserId) -> Result<Option<UserSummary>, StoreError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    Ok(conn
        .query_row(&sql, params![user.as_str()], row_to_user)
        .optional()?)
}

fn write_user(conn: &Connection, summary: &UserSummary) -> Result<(), StoreError> {
    let badges = serde_json::to_string(&summary.badges)?;
    let created_at = summary.created_at.unwrap_or_else(Utc::now);
    let updated_at = summary.updated_at.unwrap_or(created_at);
    conn.execute(
        "INSERT INTO users (id, name, personal_goal, financial_goal, current_savings,
             target_savings, daily_discipline, productive_time, streak, level, badges,
             completed_onboarding, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(id) DO UPDATE SET
             name = excluded.name,
             personal_goal = excluded.personal_goal,
             financial_goal = excluded.financial_goal,
             current_savings = excluded.current_savings,
             target_savings = excluded.target_savings,
             daily_discipline = excluded.daily_discipline,
             productive_time = excluded.productive_time,
             streak = excluded.streak,
             level = excluded.level,
             badges = excluded.badges,
             completed_onboarding = excluded.completed_onboarding,
             updated_at = excluded.updated_at",
        params![
            summary.id,
            summary.name,
            summary.personal_goal,
            summary.financial_goal,
            summary.current_savings,
            summary.target_savings,
            summary.daily_discipline,
            summary.productive_time,
            summary.streak,
            summary.level,
            badges,
            summary.completed_onboarding,
            format_ts(created_at),
            format_ts(updated_at),
        ],
    )?;
    Ok(())
}

fn merge_user(
    conn: &Connection,
    user: &UserId,
    patch: &UserPatch,
    at: DateTime<Utc>,
) -> Result<(), StoreError> {
    let mut summary = select_user(conn, user)?.unwrap_or_else(|| UserSummary::new_for(user, at));
    patch.apply_to(&mut summary);
    summary.updated_at = Some(at);
    write_user(conn, &summary)
}

fn merge_progress(
    conn: &Connection,
    user: &UserId,
    date: NaiveDate,
    patch: &ProgressPatch,
    at: DateTime<Utc>,
) -> Result<(), StoreError> {
    // Absent patch fields bind as NULL: zero on insert, unchanged on conflict.
    conn.execute(
        "INSERT INTO progress_logs (id, user_id, date, discipline_score, productive_hours,
             habits_completed, total_habits, created_at)
         VALUES (?1, ?2, ?3, COALESCE(?4, 0), COALESCE(?5, 0), COALESCE(?6, 0), COALESCE(?7, 0), ?8)
         ON CONFLICT(user_id, date) DO UPDATE SET
             discipline_score = COALESCE(?4, discipline_score),
             productive_hours = COALESCE(?5, productive_hours),
             habits_completed = COALESCE(?6, habits_completed),
             total_habits = COALESCE(?7, total_habits)",
        params![
            uuid::Uuid::new_v4().to_string(),
            user.as_str(),
            format_date(date),
            patch.discipline_score,
            patch.productive_hours,
            patch.habits_completed,
            patch.total_habits,
            format_ts(at),
        ],
    )?;
    Ok(())
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_user(&self, user: &UserId) -> Result<Option<UserSummary>, StoreError> {
        let conn = self.lock()?;
        select_user(&conn, user)
    }

    async fn insert_user(&self, summary: &UserSummary) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let badges = serde_json::to_string(&summary.badges)?;
        let created_at = summary.created_at.unwrap_or_else(Utc::now);
        conn.execute(
            "INSERT INTO users (id, name, personal_goal, financial_goal, current_savings,
                 target_savings, daily_discipline, productive_time, streak, level, badges,
                 completed_onboarding, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                summary.id,
                summary.name,
                summary.personal_goal,
                summary.financial_goal,
                summary.current_savings,
                summary.target_savings,
                summary.daily_discipline,
                summary.productive_time,
                summary.streak,
                summary.level,
                badges,
                summary.completed_onboarding,
                format_ts(created_at),
                format_ts(summary.updated_at.unwrap_or(created_at)),
            ],
        )?;
        Ok(())
    }

    async fn upsert_user(
        &self,
        user: &UserId,
        patch: &UserPatch,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        merge_user(&tx, user, patch, at)?;
        tx.commit()?;
        Ok(())
    }

    async fn habits_on(&self, user: &UserId, date: NaiveDate) -> Result<Vec<HabitRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, name, completed, date, created_at
             FROM habits
             WHERE user_id = ?1 AND date = ?2
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![user.as_str(), format_date(date)], row_to_habit)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn find_habit(
        &self,
        user: &UserId,
        name: &str,
        date: NaiveDate,
    ) -> Result<Option<HabitRecord>, StoreError> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, user_id, name, completed, date, created_at
                 FROM habits
                 WHERE user_id = ?1 AND name = ?2 AND date = ?3
                 ORDER BY rowid ASC
                 LIMIT 1",
                params![user.as_str(), name, format_date(date)],
                row_to_habit,
            )
            .optional()?)
    }

    async fn insert_habit(&self, record: &HabitRecord) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO habits (id, user_id, name, completed, date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.user_id,
                record.name,
                record.completed,
                format_date(record.date),
                format_ts(record.created_at.unwrap_or_else(Utc::now)),
            ],
        )?;
        Ok(())
    }

    async fn update_habit(&self, id: &str, completed: bool) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        Ok(conn.execute(
            "UPDATE habits SET completed = ?1 WHERE id = ?2",
            params![completed, id],
        )?)
    }

    async fn delete_habits_named(&self, user: &UserId, name: &str) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        Ok(conn.execute(
            "DELETE FROM habits WHERE user_id = ?1 AND name = ?2",
            params![user.as_str(), name],
        )?)
    }

    async fn removed_habits(&self, user: &UserId) -> Result<Vec<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM removed_habits WHERE user_id = ?1 ORDER BY removed_at ASC",
        )?;
        let rows = stmt.query_map(params![user.as_str()], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn set_habit_removed(
        &self,
        user: &UserId,
        name: &str,
        removed: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        if removed {
            conn.execute(
                "INSERT OR REPLACE INTO removed_habits (user_id, name, removed_at)
                 VALUES (?1, ?2, ?3)",
                params![user.as_str(), name, format_ts(at)],
            )?;
        } else {
            conn.execute(
                "DELETE FROM removed_habits WHERE user_id = ?1 AND name = ?2",
                params![user.as_str(), name],
            )?;
        }
        Ok(())
    }

    async fn progress_on(&self, user: &UserId, date: NaiveDate) -> Result<Option<ProgressLog>, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {PROGRESS_COLUMNS} FROM progress_logs WHERE user_id = ?1 AND date = ?2");
        Ok(conn
            .query_row(&sql, params![user.as_str(), format_date(date)], row_to_progress)
            .optional()?)
    }

    async fn recent_progress(&self, user: &UserId, limit: usize) -> Result<Vec<ProgressLog>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM progress_logs
             WHERE user_id = ?1
             ORDER BY date DESC
             LIMIT ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![user.as_str(), limit], row_to_progress)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn upsert_progress(
        &self,
        user: &UserId,
        date: NaiveDate,
        patch: &ProgressPatch,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        merge_progress(&conn, user, date, patch, at)
    }

    async fn write_daily_snapshot(
        &self,
        user: &UserId,
        date: NaiveDate,
        progress: &ProgressPatch,
        summary: &UserPatch,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        merge_progress(&tx, user, date, progress, at)?;
        merge_user(&tx, user, summary, at)?;
        tx.commit()?;
        Ok(())
    }

    async fn insert_note(&self, note: &MindsetNote) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO mindset_notes (id, user_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![note.id, note.user_id, note.content, format_ts(note.created_at)],
        )?;
        Ok(())
    }

    async fn list_notes(&self, user: &UserId) -> Result<Vec<MindsetNote>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, content, created_at
             FROM mindset_notes
             WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![user.as_str()], row_to_note)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    async fn delete_note(&self, user: &UserId, id: &str) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        Ok(conn.execute(
            "DELETE FROM mindset_notes WHERE id = ?1 AND user_id = ?2",
            params![id, user.as_str()],
        )?)
    }
}
