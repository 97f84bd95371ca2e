pub mod admin;
pub mod assist;
pub mod circles;
pub mod contacts;
pub mod middleware;
pub mod qr_codes;
pub mod sos;
pub mod users;
pub mod webhook;

use uuid::Uuid;

use crate::error::AppError;

/// Path ids that are not UUIDs cannot name a stored record.
pub(crate) fn parse_id(raw: &str, missing: &'static str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found(missing))
}
