/// Authentication endpoints
///
/// - `POST /v1/auth/register` - Register new user
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/refresh` - Refresh access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use huddle_shared::{
    auth::{
        jwt::{self, TokenType},
        password,
    },
    models::user::{CreateUser, UpdateUser, User, UserLocation},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Checked for strength before hashing
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Tokens plus the signed-in user, returned by register and login
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,

    /// Access token lifetime in seconds
    pub expires_in: i64,

    pub user: UserSummary,
}

/// Account overview shared by login, register and `/v1/me`
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email_verified: bool,
    pub profile_complete: bool,
    pub location: UserLocation,
    pub followers: usize,
    pub following: usize,
    pub attending: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone: user.phone.clone(),
            email_verified: user.email_verified,
            profile_complete: user.profile_complete,
            location: user.location.clone(),
            followers: user.followers.len(),
            following: user.following.len(),
            attending: user.attending.to_vec(),
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
    pub expires_in: i64,
}

fn session_for(state: &AppState, user: &User) -> ApiResult<SessionResponse> {
    Ok(SessionResponse {
        access_token: jwt::issue_token(user.id, TokenType::Access, state.jwt_secret())?,
        refresh_token: jwt::issue_token(user.id, TokenType::Refresh, state.jwt_secret())?,
        expires_in: TokenType::Access.default_expiration().num_seconds(),
        user: UserSummary::from(user),
    })
}

/// First address in `X-Forwarded-For`, else `X-Real-IP`
fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

/// Register a new user
///
/// ```text
/// POST /v1/auth/register
///
/// { "email": "user@example.com", "password": "SecureP@ss123" }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Email already exists
/// - `422 Unprocessable Entity`: Invalid email or weak password
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    req.validate()?;

    let password_hash = password::hash_new_password(&req.password)?;

    let user = state
        .store
        .create_user(CreateUser {
            email: req.email.trim().to_string(),
            password_hash,
            sign_up_ip: client_ip(&headers),
        })
        .await?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((StatusCode::CREATED, Json(session_for(&state, &user)?)))
}

/// Login and get tokens
///
/// Unknown email and wrong password get the same 401 so the endpoint does not
/// reveal which accounts exist.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = state
        .store
        .find_user_by_email(req.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        return Err(invalid());
    }

    let user = state
        .store
        .update_user(
            user.id,
            UpdateUser {
                last_login_at: Some(Utc::now()),
                ..Default::default()
            },
        )
        .await?
        .unwrap_or(user);

    tracing::debug!(user_id = %user.id, "User logged in");

    Ok(Json(session_for(&state, &user)?))
}

/// Exchanges a refresh token for a new access token
///
/// # Errors
///
/// - `403 Forbidden`: Invalid or expired refresh token
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse {
        access_token,
        expires_in: TokenType::Access.default_expiration().num_seconds(),
    }))
}
