//! Clock access and calendar validation shared across the API.

use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::error::{OpsError, OpsResult};

/// The `YYYY-MM-DD` format every stored date must satisfy.
pub const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// The current time as unix seconds, which is how timestamps are stored.
pub fn unix_now() -> i64 {
    now().unix_timestamp()
}

/// Converts a stored unix timestamp back into a datetime for serialization.
pub fn datetime(secs: i64) -> OpsResult<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|err| OpsError::ServerError(format!("invalid stored timestamp: {}", err)))
}

/// Rejects dates that aren't strictly `YYYY-MM-DD` before any store access.
pub fn validate_date(date: &str) -> OpsResult<()> {
    Date::parse(date, DATE_FORMAT)
        .map(|_| ())
        .map_err(|_| OpsError::BadRequest("date must be in YYYY-MM-DD format".to_owned()))
}

/// Rejects month filters that aren't strictly `YYYY-MM`.
///
/// Checked by parsing the first of the month as a full date, so month
/// numbers outside 01-12 are rejected too.
pub fn validate_month(month: &str) -> OpsResult<()> {
    Date::parse(&format!("{}-01", month), DATE_FORMAT)
        .map(|_| ())
        .map_err(|_| OpsError::BadRequest("month must be in YYYY-MM format".to_owned()))
}
