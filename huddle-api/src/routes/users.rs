/// Members, public profiles and the follow graph
///
/// - `GET /v1/members` - Everyone except the caller
/// - `GET /v1/users/:user_id` - Public profile with `is_following`
/// - `POST /v1/users/:user_id/follow` - Follow
/// - `POST /v1/users/:user_id/unfollow` - Unfollow
///
/// Follow and unfollow are idempotent: repeating one answers 200 with
/// `"changed": false`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiPath,
    routes::{activities::record_best_effort, MemberSummary},
};
use axum::{extract::State, Json};
use chrono::{DateTime, NaiveDate, Utc};
use huddle_shared::{
    auth::middleware::AuthContext,
    models::{activity::CreateActivity, user::UserLocation},
    relations::EdgeChange,
};
use serde::Serialize;
use uuid::Uuid;

pub async fn list_members(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<MemberSummary>>> {
    let users = state.store.list_users_except(auth.user_id).await?;

    Ok(Json(users.iter().map(MemberSummary::from).collect()))
}

/// Another user's profile as seen by the caller
///
/// Fields beyond the name and location are withheld when the owner turned
/// `public_profile` off; `attending` additionally requires
/// `show_events_attending`.
#[derive(Debug, Serialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub location: UserLocation,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    pub followers: usize,
    pub following: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attending: Option<Vec<Uuid>>,

    pub is_following: bool,
    pub created_at: DateTime<Utc>,
}

pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<Json<PublicProfile>> {
    let user = state
        .store
        .find_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let is_self = user.id == auth.user_id;
    let detailed = is_self || user.privacy.public_profile;
    let show_attending = is_self || (detailed && user.privacy.show_events_attending);

    Ok(Json(PublicProfile {
        id: user.id,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        location: user.location.clone(),
        birthday: user.birthday.filter(|_| detailed),
        profile: user.profile.clone().filter(|_| detailed),
        followers: user.followers.len(),
        following: user.following.len(),
        attending: show_attending.then(|| user.attending.to_vec()),
        is_following: user.followers.contains(auth.user_id),
        created_at: user.created_at,
    }))
}

#[derive(Debug, Serialize)]
pub struct FollowResponse {
    pub message: String,

    /// `false` when the edge was already in the requested state
    pub changed: bool,
}

/// Follow a user
///
/// # Errors
///
/// - `400 Bad Request`: Following yourself (`self_relation`) or malformed id
/// - `404 Not Found`: Unknown user
/// - `409 Conflict`: Concurrent update, retry (`transaction_conflict`)
pub async fn follow(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<Json<FollowResponse>> {
    let change = state.relations.follow(auth.user_id, user_id).await?;

    if change == EdgeChange::Applied {
        record_best_effort(state.store.as_ref(), CreateActivity::follow(auth.user_id)).await;
    }

    Ok(Json(FollowResponse {
        message: "Followed successfully".to_string(),
        changed: change == EdgeChange::Applied,
    }))
}

/// Unfollow a user
///
/// # Errors
///
/// Same as [`follow`].
pub async fn unfollow(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<Json<FollowResponse>> {
    let change = state.relations.unfollow(auth.user_id, user_id).await?;

    Ok(Json(FollowResponse {
        message: "Unfollowed successfully".to_string(),
        changed: change == EdgeChange::Applied,
    }))
}
