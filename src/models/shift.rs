use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::error::{OpsError, OpsResult};
use crate::models::user::User;
use crate::util::{datetime, unix_now};
use uuid::Uuid;

/// A logged shift. Append-only: there is no uniqueness key on
/// `(user_id, date)`, so a guard may log several shifts per day.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Shift {
    pub id: String,
    pub user_id: String,
    pub date: String,
    pub venue: String,
    pub start_time: String,
    pub end_time: String,
    pub total_hours: f64,
    pub notes: Option<String>,
    pub paid: bool,
    pub created_at: i64,
    /// Set only when the paid status changes.
    pub updated_at: Option<i64>,
}

/// A shift joined with its guard's display name, for the admin listing.
#[derive(Debug, sqlx::FromRow)]
pub struct ShiftWithGuard {
    pub id: String,
    pub user_id: String,
    pub date: String,
    pub venue: String,
    pub start_time: String,
    pub end_time: String,
    pub total_hours: f64,
    pub notes: Option<String>,
    pub paid: bool,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    pub guard_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewShift {
    pub date: String,
    pub venue: String,
    pub start_time: String,
    pub end_time: String,
    pub total_hours: f64,
    pub notes: Option<String>,
}

impl Shift {
    /// Appends a shift for the user; every shift starts unpaid.
    pub async fn create(user: &User, new_shift: NewShift, pool: &SqlitePool) -> OpsResult<Self> {
        let shift = Self {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            date: new_shift.date,
            venue: new_shift.venue,
            start_time: new_shift.start_time,
            end_time: new_shift.end_time,
            total_hours: new_shift.total_hours,
            notes: new_shift.notes,
            paid: false,
            created_at: unix_now(),
            updated_at: None,
        };

        sqlx::query(
            "INSERT INTO shifts
                 (id, user_id, date, venue, start_time, end_time, total_hours,
                  notes, paid, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&shift.id)
        .bind(&shift.user_id)
        .bind(&shift.date)
        .bind(&shift.venue)
        .bind(&shift.start_time)
        .bind(&shift.end_time)
        .bind(shift.total_hours)
        .bind(&shift.notes)
        .bind(shift.paid)
        .bind(shift.created_at)
        .bind(shift.updated_at)
        .execute(pool)
        .await?;

        Ok(shift)
    }

    pub async fn with_id(id: &str, pool: &SqlitePool) -> OpsResult<Option<Self>> {
        sqlx::query_as(
            "SELECT id, user_id, date, venue, start_time, end_time, total_hours,
                    notes, paid, created_at, updated_at
             FROM shifts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// One page of a user's shifts, most recent date first.
    pub async fn for_user(
        user_id: &str,
        page: i64,
        page_size: i64,
        pool: &SqlitePool,
    ) -> OpsResult<Vec<Self>> {
        // Saturate instead of overflowing on absurd page numbers; a
        // past-the-end offset just yields an empty page.
        let offset = page.saturating_sub(1).saturating_mul(page_size);

        sqlx::query_as(
            "SELECT id, user_id, date, venue, start_time, end_time, total_hours,
                    notes, paid, created_at, updated_at
             FROM shifts WHERE user_id = ? ORDER BY date DESC LIMIT ? OFFSET ?",
        )
        .bind(user_id)
        .bind(page_size)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Every shift with its guard's display name attached, most recent date
    /// first. The name resolution is a single join rather than a lookup per
    /// row; shifts whose user no longer resolves get a `NULL` name.
    pub async fn all_with_guards(pool: &SqlitePool) -> OpsResult<Vec<ShiftWithGuard>> {
        sqlx::query_as(
            "SELECT s.id, s.user_id, s.date, s.venue, s.start_time, s.end_time,
                    s.total_hours, s.notes, s.paid, s.created_at, s.updated_at,
                    u.name AS guard_name
             FROM shifts s LEFT JOIN users u ON u.id = s.user_id
             ORDER BY s.date DESC",
        )
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Sets the paid flag on one shift, touching nothing but `paid` and
    /// `updated_at`. Zero matched rows means the shift does not exist.
    pub async fn set_paid(id: &str, paid: bool, pool: &SqlitePool) -> OpsResult<()> {
        let result = sqlx::query("UPDATE shifts SET paid = ?, updated_at = ? WHERE id = ?")
            .bind(paid)
            .bind(unix_now())
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            Err(OpsError::NotFound)
        } else {
            Ok(())
        }
    }

    pub async fn remove(id: &str, pool: &SqlitePool) -> OpsResult<()> {
        sqlx::query("DELETE FROM shifts WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

/// The external shape of a shift. `guard_name` is joined in on the admin
/// listing and `null` everywhere else, including for shifts whose user no
/// longer resolves.
#[derive(Debug, Serialize)]
pub struct ShiftOut {
    pub id: String,
    pub user_id: String,
    pub date: String,
    pub venue: String,
    pub start_time: String,
    pub end_time: String,
    pub total_hours: f64,
    pub notes: Option<String>,
    pub paid: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    pub guard_name: Option<String>,
}

impl ShiftOut {
    pub fn from_shift(shift: Shift) -> OpsResult<Self> {
        Ok(Self {
            id: shift.id,
            user_id: shift.user_id,
            date: shift.date,
            venue: shift.venue,
            start_time: shift.start_time,
            end_time: shift.end_time,
            total_hours: shift.total_hours,
            notes: shift.notes,
            paid: shift.paid,
            created_at: datetime(shift.created_at)?,
            updated_at: shift.updated_at.map(datetime).transpose()?,
            guard_name: None,
        })
    }

    pub fn from_shift_with_guard(row: ShiftWithGuard) -> OpsResult<Self> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            date: row.date,
            venue: row.venue,
            start_time: row.start_time,
            end_time: row.end_time,
            total_hours: row.total_hours,
            notes: row.notes,
            paid: row.paid,
            created_at: datetime(row.created_at)?,
            updated_at: row.updated_at.map(datetime).transpose()?,
            guard_name: row.guard_name,
        })
    }
}
