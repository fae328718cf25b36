//! Schedule endpoints: admin-assigned schedules and the guard-facing
//! "my schedules" lookup.

use axum::{Extension, Json};
use sqlx::SqlitePool;

use crate::auth::{AdminUser, AuthenticatedUser};
use crate::error::OpsResult;
use crate::models::schedule::{NewSchedule, Schedule, ScheduleOut};
use crate::models::user::User;

/// Saves a schedule for a single guard, referenced by free-text name or
/// email. The reference is resolved to a `guard_id` best-effort, at creation
/// time only; creation succeeds whether or not a matching account exists.
pub async fn create(
    admin: AdminUser,
    Extension(pool): Extension<SqlitePool>,
    Json(new_schedule): Json<NewSchedule>,
) -> OpsResult<Json<ScheduleOut>> {
    let resolved = User::resolve_reference(new_schedule.guard.trim(), &pool).await?;
    if resolved.is_none() {
        tracing::info!(guard = %new_schedule.guard, "schedule guard reference did not resolve");
    }

    let schedule = Schedule::create(new_schedule, resolved.as_ref(), &admin.0, &pool).await?;

    Ok(Json(ScheduleOut::from_schedule(schedule)?))
}

/// Schedules admins created for the caller, matched by resolved id, display
/// name, or email, newest first.
pub async fn mine(
    user: AuthenticatedUser,
    Extension(pool): Extension<SqlitePool>,
) -> OpsResult<Json<Vec<ScheduleOut>>> {
    let schedules = Schedule::for_user(&user.0, &pool).await?;
    let items = schedules
        .into_iter()
        .map(ScheduleOut::from_schedule)
        .collect::<OpsResult<Vec<_>>>()?;

    Ok(Json(items))
}
