/// Bearer authentication for Axum
///
/// The API's auth layer calls [`authenticate_bearer`] on every protected
/// request and stores the resulting [`AuthContext`] in the request
/// extensions. Handlers then take `AuthContext` as an extractor argument.
///
/// | condition                          | error                         |
/// |------------------------------------|-------------------------------|
/// | no `Authorization` header          | `AuthError::MissingCredentials` |
/// | not `Bearer <token>`               | `AuthError::InvalidToken`     |
/// | bad signature / malformed / kind   | `AuthError::InvalidToken`     |
/// | past `exp`                         | `AuthError::TokenExpired`     |
///
/// # Example
///
/// ```no_run
/// use huddle_shared::auth::middleware::AuthContext;
///
/// async fn protected_handler(auth: AuthContext) -> String {
///     format!("Hello, user {}!", auth.user_id)
/// }
/// ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};

/// Authenticated caller, added to request extensions by the auth layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
}

/// Error type for bearer authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token has expired")]
    TokenExpired,
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::TokenExpired,
            other => AuthError::InvalidToken(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::MissingCredentials => StatusCode::UNAUTHORIZED,
            AuthError::InvalidToken(_) | AuthError::TokenExpired => StatusCode::FORBIDDEN,
        };
        (status, self.to_string()).into_response()
    }
}

/// Validates the `Authorization: Bearer <token>` header
pub fn authenticate_bearer(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Authorization header is not valid ASCII".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidToken("Expected Bearer token".to_string()))?;

    let claims = validate_access_token(token, secret)?;

    Ok(AuthContext { user_id: claims.sub })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .ok_or(AuthError::MissingCredentials)
    }
}
