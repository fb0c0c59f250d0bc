/// Request extractors with JSON error bodies
///
/// Axum's own `Json`, `Path` and `Query` reject with plain-text bodies and a
/// mix of 400/415/422 statuses. These wrappers route every rejection through
/// [`ApiError::BadRequest`] so malformed input always yields a 400 with the
/// usual `{error, message}` body; field-level validation stays a 422.

use crate::error::ApiError;
use axum::extract::{FromRequest, FromRequestParts};

/// JSON request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path parameters, e.g. a UUID segment
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Query string parameters
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
