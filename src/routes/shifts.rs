//! Shift endpoints: guard-facing logging and paged history, admin-facing
//! listing, payment status, and delete.

use axum::extract::{Path, Query};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::auth::{is_owner_or_admin, AdminUser, AuthenticatedUser};
use crate::error::{OpsError, OpsResult};
use crate::models::shift::{NewShift, Shift, ShiftOut};
use crate::routes::basic_success;
use crate::util::validate_date;

/// Page sizes are caller-controlled but capped; the original behavior had
/// no ceiling, which is an invitation to dump the whole table.
const MAX_PAGE_SIZE: i64 = 100;
const DEFAULT_PAGE_SIZE: i64 = 20;

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Serialize)]
pub struct ShiftPage {
    pub items: Vec<ShiftOut>,
    pub page: i64,
    pub page_size: i64,
}

#[derive(Serialize)]
pub struct ShiftList {
    pub items: Vec<ShiftOut>,
}

#[derive(Deserialize)]
pub struct PaidUpdate {
    pub paid: bool,
}

/// Logs a worked shift for the caller. Always starts unpaid.
pub async fn create(
    user: AuthenticatedUser,
    Extension(pool): Extension<SqlitePool>,
    Json(new_shift): Json<NewShift>,
) -> OpsResult<Json<ShiftOut>> {
    validate_date(&new_shift.date)?;

    let shift = Shift::create(&user.0, new_shift, &pool).await?;

    Ok(Json(ShiftOut::from_shift(shift)?))
}

/// The caller's own shifts, most recent date first, paged.
pub async fn mine(
    user: AuthenticatedUser,
    Query(query): Query<PageQuery>,
    Extension(pool): Extension<SqlitePool>,
) -> OpsResult<Json<ShiftPage>> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let shifts = Shift::for_user(&user.0.id, page, page_size, &pool).await?;
    let items = shifts
        .into_iter()
        .map(ShiftOut::from_shift)
        .collect::<OpsResult<Vec<_>>>()?;

    Ok(Json(ShiftPage {
        items,
        page,
        page_size,
    }))
}

/// Admin listing of every logged shift, each enriched with the guard's
/// display name.
pub async fn all(
    _admin: AdminUser,
    Extension(pool): Extension<SqlitePool>,
) -> OpsResult<Json<ShiftList>> {
    let shifts = Shift::all_with_guards(&pool).await?;
    let items = shifts
        .into_iter()
        .map(ShiftOut::from_shift_with_guard)
        .collect::<OpsResult<Vec<_>>>()?;

    Ok(Json(ShiftList { items }))
}

/// Sets the paid flag on one shift. 404 when the shift doesn't exist; no
/// state machine, any value may be set to any value.
pub async fn set_paid(
    _admin: AdminUser,
    Path(id): Path<String>,
    Extension(pool): Extension<SqlitePool>,
    Json(update): Json<PaidUpdate>,
) -> OpsResult<Json<Value>> {
    Shift::set_paid(&id, update.paid, &pool).await?;

    Ok(basic_success())
}

/// Deletes one shift. Owners and admins only.
pub async fn remove(
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Extension(pool): Extension<SqlitePool>,
) -> OpsResult<Json<Value>> {
    let shift = Shift::with_id(&id, &pool).await?.ok_or(OpsError::NotFound)?;

    if !is_owner_or_admin(&user.0, &shift.user_id) {
        return Err(OpsError::Forbidden);
    }

    Shift::remove(&id, &pool).await?;

    Ok(basic_success())
}
