use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{OpsError, OpsResult};
use crate::util::{datetime, unix_now};

/// The closed set of roles. There is no hierarchy and no permission graph;
/// authorization is a literal equality check against `Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Guard,
    Admin,
}

/// A canonical user record.
///
/// Deliberately not `Serialize`: responses go through [UserOut], which is
/// how `pass_hash` is kept out of every response body.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    /// Stored lowercased; uniqueness is enforced by a pre-check at write time.
    pub email: String,
    pub pass_hash: String,
    pub role: Role,
    pub created_at: i64,
}

#[derive(Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginInfo {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub current_password: Option<String>,
}

impl User {
    pub async fn with_id(id: &str, pool: &SqlitePool) -> OpsResult<Option<Self>> {
        sqlx::query_as(
            "SELECT id, name, email, pass_hash, role, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Looks up a user by their exact (already lowercased) email.
    pub async fn with_email(email: &str, pool: &SqlitePool) -> OpsResult<Option<Self>> {
        sqlx::query_as(
            "SELECT id, name, email, pass_hash, role, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Binds a free-text guard reference to a canonical user record.
    ///
    /// Matches the display name exactly first, then (only when the reference
    /// contains an `@`) the lowercased email. No fuzzy matching; when two
    /// users share a display name, whichever the store returns first wins.
    /// `None` means "no canonical binding", which callers must tolerate
    /// rather than treat as an error.
    pub async fn resolve_reference(reference: &str, pool: &SqlitePool) -> OpsResult<Option<Self>> {
        let by_name: Option<Self> = sqlx::query_as(
            "SELECT id, name, email, pass_hash, role, created_at FROM users
             WHERE name = ? LIMIT 1",
        )
        .bind(reference)
        .fetch_optional(pool)
        .await?;

        if by_name.is_some() {
            return Ok(by_name);
        }

        if reference.contains('@') {
            Self::with_email(&reference.to_lowercase(), pool).await
        } else {
            Ok(None)
        }
    }

    /// Registers a new user with the `guard` role.
    ///
    /// The email is lowercased before the duplicate pre-check and the insert
    /// so that uniqueness is case-insensitive.
    pub async fn register(new_user: NewUser, pool: &SqlitePool) -> OpsResult<Self> {
        let email = new_user.email.to_lowercase();

        if Self::with_email(&email, pool).await?.is_some() {
            return Err(OpsError::Conflict("email already registered".to_owned()));
        }

        let pass_hash = bcrypt::hash(&new_user.password, 10)
            .map_err(|err| OpsError::ServerError(format!("Failed to hash password: {}", err)))?;

        let user = Self {
            id: Uuid::new_v4().to_string(),
            name: new_user.name,
            email,
            pass_hash,
            role: Role::Guard,
            created_at: unix_now(),
        };

        sqlx::query(
            "INSERT INTO users (id, name, email, pass_hash, role, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.pass_hash)
        .bind(user.role)
        .bind(user.created_at)
        .execute(pool)
        .await?;

        Ok(user)
    }

    /// Checks login credentials, with one generic failure for both an
    /// unknown email and a wrong password.
    pub async fn login(info: LoginInfo, pool: &SqlitePool) -> OpsResult<Self> {
        let invalid = || OpsError::BadRequest("invalid credentials".to_owned());

        let user = Self::with_email(&info.email.to_lowercase(), pool)
            .await?
            .ok_or_else(invalid)?;

        let valid = bcrypt::verify(&info.password, &user.pass_hash)
            .map_err(|err| OpsError::ServerError(format!("Failed to verify password: {}", err)))?;
        if !valid {
            return Err(invalid());
        }

        Ok(user)
    }

    /// Updates the caller's own profile.
    ///
    /// An email change repeats the duplicate pre-check; a password change
    /// requires the correct current password. The role is untouched, so
    /// there is no self-promotion path through this endpoint.
    pub async fn update_profile(&self, update: ProfileUpdate, pool: &SqlitePool) -> OpsResult<Self> {
        let email = match update.email {
            Some(new_email) => {
                let new_email = new_email.to_lowercase();
                if new_email != self.email && Self::with_email(&new_email, pool).await?.is_some() {
                    return Err(OpsError::Conflict("email already registered".to_owned()));
                }
                new_email
            }
            None => self.email.clone(),
        };

        let pass_hash = match update.password {
            Some(new_password) => {
                let current = update
                    .current_password
                    .ok_or_else(|| OpsError::BadRequest("current password is required".to_owned()))?;
                let valid = bcrypt::verify(&current, &self.pass_hash).map_err(|err| {
                    OpsError::ServerError(format!("Failed to verify password: {}", err))
                })?;
                if !valid {
                    return Err(OpsError::BadRequest("current password is incorrect".to_owned()));
                }

                bcrypt::hash(&new_password, 10).map_err(|err| {
                    OpsError::ServerError(format!("Failed to hash password: {}", err))
                })?
            }
            None => self.pass_hash.clone(),
        };

        let name = update.name.unwrap_or_else(|| self.name.clone());

        sqlx::query("UPDATE users SET name = ?, email = ?, pass_hash = ? WHERE id = ?")
            .bind(&name)
            .bind(&email)
            .bind(&pass_hash)
            .bind(&self.id)
            .execute(pool)
            .await?;

        Ok(Self {
            name,
            email,
            pass_hash,
            ..self.clone()
        })
    }
}

/// The external shape of a user: everything except the password digest.
#[derive(Debug, Serialize)]
pub struct UserOut {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl UserOut {
    pub fn from_user(user: &User) -> OpsResult<Self> {
        Ok(Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            created_at: datetime(user.created_at)?,
        })
    }
}
