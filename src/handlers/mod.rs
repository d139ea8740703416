pub mod auth;
pub mod html;
pub mod owned_persons;
pub mod persons;
pub mod positions;
pub mod system;
pub mod teams;

use axum::extract::{rejection::PathRejection, Path};

use crate::error::ApiError;

/// Primary key from the path. Anything that is not an integer cannot name a
/// row, so it is a 404 rather than a 400.
pub(crate) fn pk(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(pk)| pk).map_err(|_| ApiError::not_found("Not found."))
}
