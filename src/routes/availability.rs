//! Availability endpoints: the guard-facing upsert and month listing, and
//! the admin-facing overview, per-guard lookup, and delete.

use axum::extract::{Path, Query};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;

use crate::auth::{is_owner_or_admin, AdminUser, AuthenticatedUser};
use crate::error::{OpsError, OpsResult};
use crate::models::availability::{Availability, AvailabilityOut, NewAvailability};
use crate::models::user::User;
use crate::routes::basic_success;
use crate::util::{validate_date, validate_month};

#[derive(Deserialize)]
pub struct MonthQuery {
    pub month: String,
}

#[derive(Deserialize)]
pub struct GuardQuery {
    pub guard: String,
    pub month: Option<String>,
}

/// A guard submits or updates availability for a specific date. One record
/// per caller per date; resubmitting replaces the previous values.
pub async fn upsert_mine(
    user: AuthenticatedUser,
    Extension(pool): Extension<SqlitePool>,
    Json(submission): Json<NewAvailability>,
) -> OpsResult<Json<AvailabilityOut>> {
    validate_date(&submission.date)?;

    let record = Availability::upsert(&user.0, submission, &pool).await?;

    Ok(Json(AvailabilityOut::from_record(record, Some(&user.0))?))
}

/// A guard's own records for one month, date ascending.
pub async fn mine_for_month(
    user: AuthenticatedUser,
    Query(query): Query<MonthQuery>,
    Extension(pool): Extension<SqlitePool>,
) -> OpsResult<Json<Vec<AvailabilityOut>>> {
    validate_month(&query.month)?;

    let records = Availability::for_user_during_month(&user.0.id, &query.month, &pool).await?;
    let items = records
        .into_iter()
        .map(|record| AvailabilityOut::from_record(record, Some(&user.0)))
        .collect::<OpsResult<Vec<_>>>()?;

    Ok(Json(items))
}

/// Admin overview of every guard's availability for one month.
pub async fn all_for_month(
    _admin: AdminUser,
    Query(query): Query<MonthQuery>,
    Extension(pool): Extension<SqlitePool>,
) -> OpsResult<Json<Vec<AvailabilityOut>>> {
    validate_month(&query.month)?;

    let records = Availability::all_during_month(&query.month, &pool).await?;
    let items = records
        .into_iter()
        .map(|record| AvailabilityOut::from_record(record, None))
        .collect::<OpsResult<Vec<_>>>()?;

    Ok(Json(items))
}

/// Admin lookup of one guard's availability by display name or email,
/// optionally filtered by month.
///
/// An unresolvable reference returns an empty list with a success status so
/// that admin workflows stay non-blocking; the admin-entered name is
/// authoritative even without a canonical account behind it.
pub async fn for_guard(
    _admin: AdminUser,
    Query(query): Query<GuardQuery>,
    Extension(pool): Extension<SqlitePool>,
) -> OpsResult<Json<Vec<AvailabilityOut>>> {
    let reference = query.guard.trim();
    if reference.is_empty() {
        return Err(OpsError::BadRequest("guard parameter is required".to_owned()));
    }

    let guard = match User::resolve_reference(reference, &pool).await? {
        Some(guard) => guard,
        None => return Ok(Json(Vec::new())),
    };

    let records = match &query.month {
        Some(month) => {
            validate_month(month)?;
            Availability::for_user_during_month(&guard.id, month, &pool).await?
        }
        None => Availability::for_user(&guard.id, &pool).await?,
    };

    let items = records
        .into_iter()
        .map(|record| AvailabilityOut::from_record(record, Some(&guard)))
        .collect::<OpsResult<Vec<_>>>()?;

    Ok(Json(items))
}

/// Deletes one record. Owners and admins only; a non-owner is told
/// "forbidden" rather than whether the record exists for someone else.
pub async fn remove(
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Extension(pool): Extension<SqlitePool>,
) -> OpsResult<Json<Value>> {
    let record = Availability::with_id(&id, &pool)
        .await?
        .ok_or(OpsError::NotFound)?;

    if !is_owner_or_admin(&user.0, &record.user_id) {
        return Err(OpsError::Forbidden);
    }

    Availability::remove(&id, &pool).await?;

    Ok(basic_success())
}
