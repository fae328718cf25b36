use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::OpsResult;
use crate::models::user::User;
use crate::util::unix_now;

/// A bearer session: a random key tied to a user with an expiry.
///
/// Stands in for signed claims; the key is the token handed to clients and
/// the row is the claims. A user may hold several live sessions at once
/// (one per login).
#[derive(Debug, sqlx::FromRow)]
pub struct Session {
    pub key: String,
    pub user_id: String,
    /// Unix seconds after which the session no longer authenticates.
    pub expires: i64,
}

impl Session {
    /// Issues a fresh token for the user, expiring `expire_minutes` from now.
    pub async fn generate(
        user_id: &str,
        expire_minutes: i64,
        pool: &SqlitePool,
    ) -> OpsResult<String> {
        let token = Uuid::new_v4().to_string();
        let expires = unix_now() + expire_minutes * 60;

        sqlx::query("INSERT INTO sessions (key, user_id, expires) VALUES (?, ?, ?)")
            .bind(&token)
            .bind(user_id)
            .bind(expires)
            .execute(pool)
            .await?;

        Ok(token)
    }

    /// Resolves a token to its user, or `None` for any reason at all:
    /// unknown key, expired session, or a user that no longer exists.
    /// Expired rows are deleted on the way out.
    pub async fn user_for_token(token: &str, pool: &SqlitePool) -> OpsResult<Option<User>> {
        let session: Option<Self> =
            sqlx::query_as("SELECT key, user_id, expires FROM sessions WHERE key = ?")
                .bind(token)
                .fetch_optional(pool)
                .await?;

        let session = match session {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.expires <= unix_now() {
            Self::remove(&session.key, pool).await?;
            return Ok(None);
        }

        User::with_id(&session.user_id, pool).await
    }

    pub async fn remove(token: &str, pool: &SqlitePool) -> OpsResult<()> {
        sqlx::query("DELETE FROM sessions WHERE key = ?")
            .bind(token)
            .execute(pool)
            .await?;

        Ok(())
    }
}
