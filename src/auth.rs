//! Authorization handling for the API.
//!
//! Endpoints assert their auth requirements through their parameter lists:
//! extract an [AuthenticatedUser] to require a login, an [AdminUser] to
//! require the admin role. Record-level ownership checks go through
//! [is_owner_or_admin].

use async_trait::async_trait;
use axum::extract::{Extension, FromRequestParts};
use axum::headers::authorization::Bearer;
use axum::headers::Authorization;
use axum::http::request::Parts;
use axum::TypedHeader;
use sqlx::SqlitePool;

use crate::error::OpsError;
use crate::models::session::Session;
use crate::models::user::{Role, User};

/// A logged-in caller of either role.
///
/// Extraction checks the bearer token against the session store; every
/// failure mode produces the same [Unauthorized](OpsError::Unauthorized).
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = OpsError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(pool) = Extension::<SqlitePool>::from_request_parts(parts, state)
            .await
            .map_err(|_| OpsError::ServerError("database pool not installed".to_owned()))?;
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| OpsError::Unauthorized)?;

        match Session::user_for_token(bearer.token(), &pool).await? {
            Some(user) => Ok(Self(user)),
            None => {
                tracing::debug!("rejected bearer token");
                Err(OpsError::Unauthorized)
            }
        }
    }
}

/// A logged-in caller whose role is literally `admin`. No hierarchy.
pub struct AdminUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = OpsError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) =
            AuthenticatedUser::from_request_parts(parts, state).await?;

        if user.role == Role::Admin {
            Ok(Self(user))
        } else {
            Err(OpsError::Forbidden)
        }
    }
}

/// Whether the caller may act on a record owned by `owner_id`.
///
/// Both sides are canonical id strings, so this is plain string equality;
/// admins may act on anything.
pub fn is_owner_or_admin(user: &User, owner_id: &str) -> bool {
    user.role == Role::Admin || user.id == owner_id
}
