//! Database schema migrations for streakbot.
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

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!("failed to read schema_version: {e}");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: the goal record table.
///
/// One row per (username, group_id). Goals are stored as one column per
/// weekday so a single row read gives the whole week.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS goal_records (
            username        TEXT NOT NULL,
            group_id        INTEGER NOT NULL,
            monday_goal     INTEGER NOT NULL,
            tuesday_goal    INTEGER NOT NULL,
            wednesday_goal  INTEGER NOT NULL,
            thursday_goal   INTEGER NOT NULL,
            friday_goal     INTEGER NOT NULL,
            saturday_goal   INTEGER NOT NULL,
            sunday_goal     INTEGER NOT NULL,
            current_streak  INTEGER NOT NULL DEFAULT 0,
            today_tasks     INTEGER NOT NULL DEFAULT 0,
            opt_out_days    INTEGER NOT NULL DEFAULT 0,
            punishment      INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (username, group_id)
        );",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: index backing the per-group leaderboard query.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_goal_records_group_streak
             ON goal_records(group_id, current_streak DESC);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}
