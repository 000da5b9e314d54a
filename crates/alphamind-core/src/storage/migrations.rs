//! Database schema migrations for alphamind.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!("failed to read schema_version: {}", e);
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: the four user-scoped tables.
///
/// `habits` deliberately has no UNIQUE(user_id, name, date): one row per
/// triple is maintained by the read-before-write in the habit manager, the
/// same as against the remote store. `progress_logs` is keyed on
/// (user_id, date) so upserts can target it.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id                   TEXT PRIMARY KEY,
            name                 TEXT NOT NULL DEFAULT '',
            personal_goal        TEXT NOT NULL DEFAULT '',
            financial_goal       TEXT NOT NULL DEFAULT '',
            current_savings      REAL NOT NULL DEFAULT 0,
            target_savings       REAL NOT NULL DEFAULT 10000,
            daily_discipline     INTEGER NOT NULL DEFAULT 0,
            productive_time      REAL NOT NULL DEFAULT 0,
            streak               INTEGER NOT NULL DEFAULT 0,
            level                INTEGER NOT NULL DEFAULT 1,
            badges               TEXT NOT NULL DEFAULT '[]',
            completed_onboarding INTEGER NOT NULL DEFAULT 0,
            created_at           TEXT NOT NULL,
            updated_at           TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS habits (
            id         TEXT PRIMARY KEY,
            user_id    TEXT NOT NULL,
            name       TEXT NOT NULL,
            completed  INTEGER NOT NULL DEFAULT 0,
            date       TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS progress_logs (
            id               TEXT PRIMARY KEY,
            user_id          TEXT NOT NULL,
            date             TEXT NOT NULL,
            discipline_score INTEGER NOT NULL DEFAULT 0,
            productive_hours REAL NOT NULL DEFAULT 0,
            habits_completed INTEGER NOT NULL DEFAULT 0,
            total_habits     INTEGER NOT NULL DEFAULT 0,
            created_at       TEXT NOT NULL,
            UNIQUE (user_id, date)
        );

        CREATE TABLE IF NOT EXISTS mindset_notes (
            id         TEXT PRIMARY KEY,
            user_id    TEXT NOT NULL,
            content    TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_habits_user_date ON habits(user_id, date);
        CREATE INDEX IF NOT EXISTS idx_habits_user_name ON habits(user_id, name);
        CREATE INDEX IF NOT EXISTS idx_notes_user_created ON mindset_notes(user_id, created_at);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: remember which habits a user removed so defaults stay gone.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS removed_habits (
            user_id    TEXT NOT NULL,
            name       TEXT NOT NULL,
            removed_at TEXT NOT NULL,
            PRIMARY KEY (user_id, name)
        );",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}
