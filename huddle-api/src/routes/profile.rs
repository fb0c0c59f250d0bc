/// The caller's own profile and account settings
///
/// - `GET /v1/me` - Account summary plus recent activity
/// - `GET /v1/profile` - Full profile document
/// - `POST /v1/profile` - Fill in profile details
/// - `GET /v1/profile/following` - Users I follow
/// - `GET /v1/profile/followers` - Users following me
/// - `GET /v1/profile/attending` - Events I RSVPed to
/// - `PUT /v1/profile/settings/general` - Email and phone
/// - `PUT /v1/profile/settings/privacy` - Privacy toggles
/// - `PUT /v1/profile/settings/security` - Change password

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    routes::{auth::UserSummary, MemberSummary, MessageResponse},
};
use axum::{extract::State, Json};
use chrono::NaiveDate;
use huddle_shared::{
    auth::{middleware::AuthContext, password},
    models::{
        activity::Activity,
        event::Event,
        user::{UpdateUser, User, UserLocation},
    },
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Number of activities included in `/v1/me`
const RECENT_ACTIVITY_LIMIT: i64 = 10;

/// Loads the authenticated user
///
/// A valid token whose user has since disappeared is reported as 404.
pub(crate) async fn current_user(state: &AppState, auth: AuthContext) -> ApiResult<User> {
    state
        .store
        .find_user(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: UserSummary,
    pub activities: Vec<Activity>,
}

pub async fn me(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<MeResponse>> {
    let user = current_user(&state, auth).await?;
    let activities = state
        .store
        .list_activities(Some(user.id), RECENT_ACTIVITY_LIMIT)
        .await?;

    Ok(Json(MeResponse {
        user: UserSummary::from(&user),
        activities,
    }))
}

pub async fn get_profile(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<User>> {
    Ok(Json(current_user(&state, auth).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,

    pub birthday: Option<NaiveDate>,

    /// Omitted keeps the stored location
    pub location: Option<UserLocation>,

    #[validate(length(min = 1, max = 32, message = "Invalid phone number"))]
    pub phone: Option<String>,

    #[validate(length(max = 2000, message = "Profile must be at most 2000 characters"))]
    pub profile: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub message: String,
    pub user: User,
}

/// Fills in profile details and marks the profile complete
pub async fn create_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<CreateProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    req.validate()?;

    let user = state
        .store
        .update_user(
            auth.user_id,
            UpdateUser {
                first_name: Some(req.first_name.trim().to_string()),
                last_name: Some(req.last_name.trim().to_string()),
                birthday: req.birthday,
                location: req.location,
                phone: req.phone,
                profile: req.profile,
                profile_complete: Some(true),
                ..Default::default()
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %user.id, "Profile completed");

    Ok(Json(ProfileResponse {
        message: "Profile created successfully".to_string(),
        user,
    }))
}

pub async fn following(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<MemberSummary>>> {
    let user = current_user(&state, auth).await?;
    let users = state.store.find_users(&user.following.to_vec()).await?;

    Ok(Json(users.iter().map(MemberSummary::from).collect()))
}

pub async fn followers(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<MemberSummary>>> {
    let user = current_user(&state, auth).await?;
    let users = state.store.find_users(&user.followers.to_vec()).await?;

    Ok(Json(users.iter().map(MemberSummary::from).collect()))
}

/// An event on the caller's calendar
#[derive(Debug, Serialize)]
pub struct AttendingEvent {
    #[serde(flatten)]
    pub event: Event,

    /// Display name of the event owner, if they filled in a profile
    pub created_by_name: Option<String>,
}

pub async fn attending(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<AttendingEvent>>> {
    let user = current_user(&state, auth).await?;
    let events = state.store.find_events(&user.attending.to_vec()).await?;

    let mut creator_ids: Vec<_> = events.iter().map(|event| event.created_by).collect();
    creator_ids.sort();
    creator_ids.dedup();

    let names: HashMap<_, _> = state
        .store
        .find_users(&creator_ids)
        .await?
        .into_iter()
        .map(|creator| (creator.id, creator.display_name()))
        .collect();

    let attending = events
        .into_iter()
        .map(|event| AttendingEvent {
            created_by_name: names.get(&event.created_by).cloned().flatten(),
            event,
        })
        .collect();

    Ok(Json(attending))
}

#[derive(Debug, Deserialize, Validate)]
pub struct GeneralSettingsRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 32, message = "Phone is required"))]
    pub phone: String,
}

/// Updates email and phone
///
/// Changing the email address clears its verified flag.
///
/// # Errors
///
/// - `409 Conflict`: Email belongs to another account
pub async fn update_general(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<GeneralSettingsRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    let user = current_user(&state, auth).await?;
    let email = req.email.trim().to_string();
    let email_changed = !email.eq_ignore_ascii_case(&user.email);

    state
        .store
        .update_user(
            user.id,
            UpdateUser {
                email_verified: email_changed.then_some(false),
                email: Some(email),
                phone: Some(req.phone.trim().to_string()),
                ..Default::default()
            },
        )
        .await?;

    tracing::info!(user_id = %user.id, email_changed, "General settings updated");

    Ok(Json(MessageResponse::new("General settings updated successfully")))
}

#[derive(Debug, Deserialize)]
pub struct PrivacySettingsRequest {
    pub public_profile: Option<bool>,
    pub hide_from_guest_lists: Option<bool>,
    pub show_events_attending: Option<bool>,
    pub opt_in_sms_updates: Option<bool>,
}

/// Updates privacy toggles; omitted fields keep their value
pub async fn update_privacy(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<PrivacySettingsRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .store
        .update_user(
            auth.user_id,
            UpdateUser {
                public_profile: req.public_profile,
                hide_from_guest_lists: req.hide_from_guest_lists,
                show_events_attending: req.show_events_attending,
                opt_in_sms_updates: req.opt_in_sms_updates,
                ..Default::default()
            },
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(MessageResponse::new("Privacy settings updated successfully")))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SecuritySettingsRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

/// Changes the password
///
/// # Errors
///
/// - `401 Unauthorized`: Current password is wrong
/// - `422 Unprocessable Entity`: New password too weak
pub async fn update_security(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<SecuritySettingsRequest>,
) -> ApiResult<Json<MessageResponse>> {
    req.validate()?;

    let user = current_user(&state, auth).await?;
    if !password::verify_password(&req.current_password, &user.password_hash)? {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let password_hash = password::hash_new_password(&req.new_password)?;
    state
        .store
        .update_user(
            user.id,
            UpdateUser {
                password_hash: Some(password_hash),
                ..Default::default()
            },
        )
        .await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(Json(MessageResponse::new("Password updated successfully")))
}
