use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::error::OpsResult;
use crate::models::user::User;
use crate::util::{datetime, unix_now};
use uuid::Uuid;

/// A guard's availability for one calendar date.
///
/// Keyed by `(user_id, date)`: the schema's unique index guarantees at most
/// one row per key, and [upsert](Availability::upsert) is the only write path.
/// `user_name` and `user_email` are denormalized enrichment that rows written
/// before the enrichment existed may lack.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Availability {
    pub id: String,
    pub user_id: String,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub date: String,
    pub is_available: bool,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// The payload a guard submits for a date. Times are free-form display
/// strings like "9:00 PM", not validated as times.
#[derive(Debug, Deserialize)]
pub struct NewAvailability {
    pub date: String,
    pub is_available: bool,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub notes: Option<String>,
}

impl Availability {
    /// Creates or replaces the caller's record for the given date.
    ///
    /// Runs as a single `ON CONFLICT` statement against the unique
    /// `(user_id, date)` index, so two concurrent submissions for the same
    /// key cannot produce a duplicate row. On conflict every mutable field
    /// is overwritten and `updated_at` refreshed, while `id` and
    /// `created_at` keep their original values. Repeating an identical
    /// submission leaves the record state unchanged apart from `updated_at`.
    pub async fn upsert(
        user: &User,
        submission: NewAvailability,
        pool: &SqlitePool,
    ) -> OpsResult<Self> {
        let now = unix_now();

        sqlx::query(
            "INSERT INTO availability
                 (id, user_id, user_name, user_email, date, is_available,
                  start_time, end_time, notes, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (user_id, date) DO UPDATE SET
                 user_name = excluded.user_name,
                 user_email = excluded.user_email,
                 is_available = excluded.is_available,
                 start_time = excluded.start_time,
                 end_time = excluded.end_time,
                 notes = excluded.notes,
                 updated_at = excluded.updated_at",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&submission.date)
        .bind(submission.is_available)
        .bind(&submission.start_time)
        .bind(&submission.end_time)
        .bind(&submission.notes)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        // Fetch the final version to return to the client.
        sqlx::query_as(
            "SELECT id, user_id, user_name, user_email, date, is_available,
                    start_time, end_time, notes, created_at, updated_at
             FROM availability WHERE user_id = ? AND date = ?",
        )
        .bind(&user.id)
        .bind(&submission.date)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn with_id(id: &str, pool: &SqlitePool) -> OpsResult<Option<Self>> {
        sqlx::query_as(
            "SELECT id, user_id, user_name, user_email, date, is_available,
                    start_time, end_time, notes, created_at, updated_at
             FROM availability WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// One user's records for a month (`month` already validated), date ascending.
    pub async fn for_user_during_month(
        user_id: &str,
        month: &str,
        pool: &SqlitePool,
    ) -> OpsResult<Vec<Self>> {
        sqlx::query_as(
            "SELECT id, user_id, user_name, user_email, date, is_available,
                    start_time, end_time, notes, created_at, updated_at
             FROM availability WHERE user_id = ? AND date LIKE ? ORDER BY date",
        )
        .bind(user_id)
        .bind(format!("{}-%", month))
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// All of one user's records, date ascending.
    pub async fn for_user(user_id: &str, pool: &SqlitePool) -> OpsResult<Vec<Self>> {
        sqlx::query_as(
            "SELECT id, user_id, user_name, user_email, date, is_available,
                    start_time, end_time, notes, created_at, updated_at
             FROM availability WHERE user_id = ? ORDER BY date",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Every record for a month, ordered by date then display name.
    ///
    /// Rows missing the denormalized `user_name` sort before named ones
    /// within a date (SQLite puts NULL first under ASC).
    pub async fn all_during_month(month: &str, pool: &SqlitePool) -> OpsResult<Vec<Self>> {
        sqlx::query_as(
            "SELECT id, user_id, user_name, user_email, date, is_available,
                    start_time, end_time, notes, created_at, updated_at
             FROM availability WHERE date LIKE ? ORDER BY date, user_name",
        )
        .bind(format!("{}-%", month))
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn remove(id: &str, pool: &SqlitePool) -> OpsResult<()> {
        sqlx::query("DELETE FROM availability WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

/// The external shape of an availability record.
#[derive(Debug, Serialize)]
pub struct AvailabilityOut {
    pub id: String,
    pub user_id: String,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub date: String,
    pub is_available: bool,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl AvailabilityOut {
    /// Serializes a record, preferring the viewer-resolved user's identity
    /// over whatever the row carries. Rows predating the enrichment fields
    /// keep `null`s when no resolved user is supplied.
    pub fn from_record(record: Availability, resolved: Option<&User>) -> OpsResult<Self> {
        let (user_id, user_name, user_email) = match resolved {
            Some(user) => (
                user.id.clone(),
                Some(user.name.clone()),
                Some(user.email.clone()),
            ),
            None => (record.user_id, record.user_name, record.user_email),
        };

        Ok(Self {
            id: record.id,
            user_id,
            user_name,
            user_email,
            date: record.date,
            is_available: record.is_available,
            start_time: record.start_time,
            end_time: record.end_time,
            notes: record.notes,
            created_at: datetime(record.created_at)?,
            updated_at: datetime(record.updated_at)?,
        })
    }
}
