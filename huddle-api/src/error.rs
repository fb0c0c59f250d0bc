/// Error handling for the API server
///
/// Every handler returns `Result<T, ApiError>`. Library errors convert into
/// `ApiError` with `?`, and `ApiError` renders as a status code plus a JSON
/// body:
///
/// ```json
/// { "error": "self_relation", "message": "A user cannot follow or unfollow themselves" }
/// ```
///
/// # Example
///
/// ```no_run
/// use huddle_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler() -> ApiResult<Json<serde_json::Value>> {
///     Err(ApiError::NotFound("User not found".to_string()))
/// }
/// ```

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use huddle_shared::{
    auth::{jwt::JwtError, middleware::AuthError, password::PasswordError},
    relations::RelationError,
    store::StoreError,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Seconds a client should wait before retrying a conflicted write
const CONFLICT_RETRY_AFTER_SECONDS: u64 = 1;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400): malformed body, path or query
    BadRequest(String),

    /// Self follow/unfollow (400)
    SelfRelation(String),

    /// Repeated RSVP (400)
    DuplicateRelation(String),

    /// Unauthorized (401): missing credentials or bad login
    Unauthorized(String),

    /// Token failed signature/format/kind checks (403)
    InvalidToken(String),

    /// Token is past its expiry (403)
    TokenExpired,

    /// Not found (404)
    NotFound(String),

    /// Conflict (409), e.g. duplicate email
    Conflict(String),

    /// Concurrent write lost the race (409, retryable)
    TransactionConflict,

    /// Unprocessable entity (422)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine readable code, e.g. "not_found"
    pub error: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Single-field validation failure
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::SelfRelation(_)
            | ApiError::DuplicateRelation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::InvalidToken(_) | ApiError::TokenExpired => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::TransactionConflict => StatusCode::CONFLICT,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::SelfRelation(_) => "self_relation",
            ApiError::DuplicateRelation(_) => "duplicate_relation",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::InvalidToken(_) => "invalid_token",
            ApiError::TokenExpired => "token_expired",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::TransactionConflict => "transaction_conflict",
            ApiError::ValidationError(_) => "validation_error",
            ApiError::InternalError(_) => "internal_error",
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::SelfRelation(msg) => write!(f, "Self relation: {}", msg),
            ApiError::DuplicateRelation(msg) => write!(f, "Duplicate relation: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::InvalidToken(msg) => write!(f, "Invalid token: {}", msg),
            ApiError::TokenExpired => write!(f, "Token has expired"),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::TransactionConflict => write!(f, "Transaction conflict"),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, details) = match self {
            ApiError::BadRequest(msg)
            | ApiError::SelfRelation(msg)
            | ApiError::DuplicateRelation(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => (msg, None),
            ApiError::InvalidToken(msg) => {
                tracing::debug!(reason = %msg, "Rejected bearer token");
                ("Invalid token".to_string(), None)
            }
            ApiError::TokenExpired => ("Token has expired".to_string(), None),
            ApiError::TransactionConflict => (
                "The resource was modified concurrently, please retry".to_string(),
                None,
            ),
            ApiError::ValidationError(errors) => {
                ("Request validation failed".to_string(), Some(errors))
            }
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                ("An internal error occurred".to_string(), None)
            }
        };

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message,
            details,
        });

        let mut response = (status, body).into_response();
        if code == "transaction_conflict" {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(CONFLICT_RETRY_AFTER_SECONDS),
            );
        }
        response
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => ApiError::TransactionConflict,
            StoreError::UniqueViolation(constraint) => {
                if constraint.contains("email") {
                    ApiError::Conflict("Email already exists".to_string())
                } else {
                    ApiError::Conflict(format!("Constraint violation: {}", constraint))
                }
            }
            StoreError::MissingReference(what) => {
                ApiError::NotFound(format!("Referenced resource not found: {}", what))
            }
            StoreError::Backend(msg) => ApiError::InternalError(format!("Store error: {}", msg)),
        }
    }
}

impl From<RelationError> for ApiError {
    fn from(err: RelationError) -> Self {
        match err {
            RelationError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            RelationError::SelfRelation => ApiError::SelfRelation(err.to_string()),
            RelationError::DuplicateRelation => ApiError::DuplicateRelation(err.to_string()),
            RelationError::TransactionConflict => ApiError::TransactionConflict,
            RelationError::Store(inner) => inner.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => ApiError::Unauthorized(err.to_string()),
            AuthError::InvalidToken(msg) => ApiError::InvalidToken(msg),
            AuthError::TokenExpired => ApiError::TokenExpired,
        }
    }
}

/// Token errors outside the bearer path (refresh, reset links)
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::TokenExpired,
            JwtError::ValidationError(msg) => ApiError::InvalidToken(msg),
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooWeak(msg) => ApiError::invalid_field("password", msg),
            other => ApiError::InternalError(format!("Password operation failed: {}", other)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details = Vec::new();
        collect_validation_details("", &errors, &mut details);
        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(details)
    }
}

/// Flattens nested validation errors into dotted field paths
/// (`location.city`, `items[0].name`)
fn collect_validation_details(
    prefix: &str,
    errors: &validator::ValidationErrors,
    details: &mut Vec<ValidationErrorDetail>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                details.extend(field_errors.iter().map(|error| {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", path));
                    ValidationErrorDetail::new(path.clone(), message)
                }));
            }
            ValidationErrorsKind::Struct(nested) => {
                collect_validation_details(&path, nested, details);
            }
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_validation_details(&format!("{}[{}]", path, index), nested, details);
                }
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
