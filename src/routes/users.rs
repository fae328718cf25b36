//! Registration, login, and profile endpoints.

use axum::{Extension, Json};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::auth::AuthenticatedUser;
use crate::error::OpsResult;
use crate::models::session::Session;
use crate::models::user::{LoginInfo, NewUser, ProfileUpdate, User, UserOut};
use crate::routes::ApiConfig;

/// The login response: a bearer token plus the caller's profile.
#[derive(Serialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: UserOut,
}

pub async fn register(
    Extension(pool): Extension<SqlitePool>,
    Json(new_user): Json<NewUser>,
) -> OpsResult<Json<UserOut>> {
    let user = User::register(new_user, &pool).await?;
    tracing::info!(user_id = %user.id, "registered new guard");

    Ok(Json(UserOut::from_user(&user)?))
}

pub async fn login(
    Extension(pool): Extension<SqlitePool>,
    Extension(config): Extension<ApiConfig>,
    Json(info): Json<LoginInfo>,
) -> OpsResult<Json<Token>> {
    let user = User::login(info, &pool).await?;
    let access_token = Session::generate(&user.id, config.token_expire_minutes, &pool).await?;

    Ok(Json(Token {
        access_token,
        token_type: "bearer",
        user: UserOut::from_user(&user)?,
    }))
}

pub async fn current_user(user: AuthenticatedUser) -> OpsResult<Json<UserOut>> {
    Ok(Json(UserOut::from_user(&user.0)?))
}

pub async fn update_profile(
    user: AuthenticatedUser,
    Extension(pool): Extension<SqlitePool>,
    Json(update): Json<ProfileUpdate>,
) -> OpsResult<Json<UserOut>> {
    let updated = user.0.update_profile(update, &pool).await?;

    Ok(Json(UserOut::from_user(&updated)?))
}
