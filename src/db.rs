//! Database pool construction and schema setup.
//!
//! The pool is built once during startup and injected into every handler
//! as an [Extension](axum::Extension); nothing reaches for a global handle.

use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// One statement per table so they can be run through the regular
/// prepared-statement path.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        pass_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'guard',
        created_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS sessions (
        key TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        expires INTEGER NOT NULL
    )",
    // The unique index is what makes the availability upsert a single atomic
    // find-and-replace-or-insert instead of a racy read-then-write.
    "CREATE TABLE IF NOT EXISTS availability (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        user_name TEXT,
        user_email TEXT,
        date TEXT NOT NULL,
        is_available INTEGER NOT NULL,
        start_time TEXT,
        end_time TEXT,
        notes TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        UNIQUE (user_id, date)
    )",
    "CREATE TABLE IF NOT EXISTS shifts (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        date TEXT NOT NULL,
        venue TEXT NOT NULL,
        start_time TEXT NOT NULL,
        end_time TEXT NOT NULL,
        total_hours REAL NOT NULL,
        notes TEXT,
        paid INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER
    )",
    "CREATE TABLE IF NOT EXISTS schedules (
        id TEXT PRIMARY KEY,
        guard TEXT NOT NULL,
        guard_id TEXT,
        note TEXT NOT NULL,
        shifts TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        created_by_admin_id TEXT NOT NULL
    )",
];

pub async fn connect() -> Result<SqlitePool> {
    let db_url = std::env::var("DATABASE_URL").context("No database URL provided")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .context("Failed to connect to the database")?;

    migrate(&pool).await?;

    Ok(pool)
}

/// An isolated in-memory database, used by the test suite.
///
/// Capped at one connection since every pooled connection would otherwise
/// get its own empty `:memory:` database.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .context("Failed to open an in-memory database")?;

    migrate(&pool).await?;

    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("Failed to set up the database schema")?;
    }

    Ok(())
}
