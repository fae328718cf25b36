use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::error::{OpsError, OpsResult};
use crate::models::user::User;
use crate::util::{datetime, unix_now};
use uuid::Uuid;

/// An admin's batch assignment of shifts to one guard.
///
/// The free-text `guard` reference is the authoritative key; `guard_id` is a
/// best-effort binding resolved once at creation and never re-derived, so it
/// stays `NULL` forever when the guard registers later. Entries are
/// denormalized, with no link to [Shift](crate::models::shift::Shift) rows.
/// Immutable after creation.
#[derive(Debug, sqlx::FromRow)]
pub struct Schedule {
    pub id: String,
    pub guard: String,
    pub guard_id: Option<String>,
    pub note: String,
    /// JSON array of [ScheduleEntry], stored verbatim.
    pub shifts: String,
    pub created_at: i64,
    pub created_by_admin_id: String,
}

/// One embedded shift entry. All fields are taken as-given from the admin's
/// payload; nothing here is validated as a date or time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// The creation payload. Unknown per-entry fields (the frontend repeats the
/// guard name on each entry) are dropped by deserialization.
#[derive(Debug, Deserialize)]
pub struct NewSchedule {
    pub guard: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub shifts: Vec<ScheduleEntry>,
}

impl Schedule {
    /// Stores a schedule for the referenced guard.
    ///
    /// `resolved` is the result of a best-effort identity resolution done by
    /// the caller; its absence is a valid permanent state, not a failure.
    pub async fn create(
        new_schedule: NewSchedule,
        resolved: Option<&User>,
        admin: &User,
        pool: &SqlitePool,
    ) -> OpsResult<Self> {
        let guard = new_schedule.guard.trim().to_owned();
        let note = new_schedule
            .note
            .map(|note| note.trim().to_owned())
            .unwrap_or_default();

        if guard.is_empty() {
            return Err(OpsError::BadRequest("guard is required".to_owned()));
        }
        if new_schedule.shifts.is_empty() {
            return Err(OpsError::BadRequest(
                "at least one shift is required".to_owned(),
            ));
        }

        let shifts = serde_json::to_string(&new_schedule.shifts)
            .map_err(|err| OpsError::ServerError(format!("Failed to encode shifts: {}", err)))?;

        let schedule = Self {
            id: Uuid::new_v4().to_string(),
            guard,
            guard_id: resolved.map(|user| user.id.clone()),
            note,
            shifts,
            created_at: unix_now(),
            created_by_admin_id: admin.id.clone(),
        };

        sqlx::query(
            "INSERT INTO schedules
                 (id, guard, guard_id, note, shifts, created_at, created_by_admin_id)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&schedule.id)
        .bind(&schedule.guard)
        .bind(&schedule.guard_id)
        .bind(&schedule.note)
        .bind(&schedule.shifts)
        .bind(schedule.created_at)
        .bind(&schedule.created_by_admin_id)
        .execute(pool)
        .await?;

        Ok(schedule)
    }

    /// Every schedule assigned to the user, newest first.
    ///
    /// One disjunctive query over `guard_id`, name, and email, so a schedule
    /// matching several clauses still comes back once. This is how schedules
    /// created before the guard registered are found: by name or email
    /// fallback, never by the (permanently absent) `guard_id`.
    pub async fn for_user(user: &User, pool: &SqlitePool) -> OpsResult<Vec<Self>> {
        sqlx::query_as(
            "SELECT id, guard, guard_id, note, shifts, created_at, created_by_admin_id
             FROM schedules
             WHERE guard_id = ? OR guard = ? OR guard = ?
             ORDER BY created_at DESC",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}

/// The external shape of a schedule, with entries decoded back into a list.
#[derive(Debug, Serialize)]
pub struct ScheduleOut {
    pub id: String,
    pub guard: String,
    pub guard_id: Option<String>,
    pub note: String,
    pub shifts: Vec<ScheduleEntry>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub created_by_admin_id: String,
}

impl ScheduleOut {
    pub fn from_schedule(schedule: Schedule) -> OpsResult<Self> {
        let shifts = serde_json::from_str(&schedule.shifts)
            .map_err(|err| OpsError::ServerError(format!("Failed to decode shifts: {}", err)))?;

        Ok(Self {
            id: schedule.id,
            guard: schedule.guard,
            guard_id: schedule.guard_id,
            note: schedule.note,
            shifts,
            created_at: datetime(schedule.created_at)?,
            created_by_admin_id: schedule.created_by_admin_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_drop_unknown_fields() {
        let payload = r#"{
            "guard": "Big Papi",
            "shifts": [
                {"guard": "Big Papi", "date": "2025-11-27",
                 "start_time": "9:00 PM", "end_time": "5:00 AM"}
            ]
        }"#;

        let new_schedule: NewSchedule = serde_json::from_str(payload).unwrap();
        assert_eq!(new_schedule.shifts.len(), 1);
        assert_eq!(new_schedule.shifts[0].date.as_deref(), Some("2025-11-27"));

        let encoded = serde_json::to_string(&new_schedule.shifts).unwrap();
        assert!(!encoded.contains("guard"));
    }

    #[test]
    fn entries_tolerate_missing_fields() {
        let entry: ScheduleEntry = serde_json::from_str(r#"{"date": "2025-11-27"}"#).unwrap();
        assert!(entry.start_time.is_none());
        assert!(entry.end_time.is_none());
    }
}
