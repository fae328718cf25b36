//! Error handling for the API.
//!
//! Prefer adding a variant to [OpsError] over forcing a new failure mode
//! into `BadRequest` or a generic `ServerError`. Every variant documents
//! its status code and JSON body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

/// The error enum for all error handling across the API.
///
/// See each variant for its corresponding status code and JSON body.
#[derive(Debug, thiserror::Error)]
pub enum OpsError {
    /// \[400\] The request to the API was malformed.
    ///
    /// ```json
    /// {
    ///     "message": "bad request",
    ///     "statusCode": 400,
    ///     "reason": <reason>
    /// }
    /// ```
    #[error("bad request")]
    BadRequest(String),
    /// \[401\] The endpoint requires a logged-in user.
    ///
    /// Every authentication failure (missing header, unknown token, expired
    /// session, deleted user) collapses to this one variant so that callers
    /// cannot distinguish them through response content.
    ///
    /// ```json
    /// {
    ///     "message": "login required",
    ///     "statusCode": 401
    /// }
    /// ```
    #[error("login required")]
    Unauthorized,
    /// \[403\] The caller is logged in but not allowed to use the endpoint.
    ///
    /// ```json
    /// {
    ///     "message": "access forbidden",
    ///     "statusCode": 403
    /// }
    /// ```
    #[error("access forbidden")]
    Forbidden,
    /// \[404\] The requested record was not found.
    ///
    /// ```json
    /// {
    ///     "message": "resource not found",
    ///     "statusCode": 404
    /// }
    /// ```
    #[error("resource not found")]
    NotFound,
    /// \[409\] The write conflicts with an existing record.
    ///
    /// Currently only raised for duplicate (case-insensitive) emails.
    ///
    /// ```json
    /// {
    ///     "message": "conflict",
    ///     "statusCode": 409,
    ///     "reason": <reason>
    /// }
    /// ```
    #[error("conflict")]
    Conflict(String),
    /// \[500\] An error occurred while handling the request.
    ///
    /// ```json
    /// {
    ///     "message": "server error",
    ///     "statusCode": 500,
    ///     "error": <error message>
    /// }
    /// ```
    #[error("server error")]
    ServerError(String),
    /// \[500\] An error occurred while interacting with the database.
    ///
    /// ```json
    /// {
    ///     "message": "database error",
    ///     "statusCode": 500,
    ///     "error": <error message>
    /// }
    /// ```
    #[error("database error")]
    DbError(#[from] sqlx::Error),
}

/// The return type for all endpoints.
pub type OpsResult<T> = Result<T, OpsError>;

impl OpsError {
    pub fn status(&self) -> StatusCode {
        match self {
            OpsError::BadRequest(_) => StatusCode::BAD_REQUEST,
            OpsError::Unauthorized => StatusCode::UNAUTHORIZED,
            OpsError::Forbidden => StatusCode::FORBIDDEN,
            OpsError::NotFound => StatusCode::NOT_FOUND,
            OpsError::Conflict(_) => StatusCode::CONFLICT,
            OpsError::ServerError(_) | OpsError::DbError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_response(&self) -> (StatusCode, Value) {
        let mut json_val = match self {
            OpsError::BadRequest(reason) => json!({ "reason": reason }),
            OpsError::Unauthorized => json!({}),
            OpsError::Forbidden => json!({}),
            OpsError::NotFound => json!({}),
            OpsError::Conflict(reason) => json!({ "reason": reason }),
            OpsError::ServerError(error) => json!({ "error": error }),
            OpsError::DbError(error) => json!({ "error": error.to_string() }),
        };

        let status = self.status();
        json_val["statusCode"] = json!(status.as_u16());
        json_val["message"] = json!(self.to_string());

        (status, json_val)
    }
}

impl IntoResponse for OpsError {
    fn into_response(self) -> Response {
        if let OpsError::ServerError(_) | OpsError::DbError(_) = &self {
            tracing::error!(error = ?self, "request failed");
        }

        let (status, body) = self.as_response();
        (status, Json(body)).into_response()
    }
}
