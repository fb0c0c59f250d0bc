/// Activity feed
///
/// - `GET /v1/activities?limit=&user_id=` - Most recent first
/// - `POST /v1/activities` - Record an activity for the caller
///
/// Follow and RSVP handlers also record activities, after the edge has been
/// committed, through [`record_best_effort`].

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{ApiJson, ApiQuery},
};
use axum::{extract::State, http::StatusCode, Json};
use huddle_shared::{
    auth::middleware::AuthContext,
    models::activity::{Activity, CreateActivity},
    store::Store,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

/// Records an activity without failing the caller
///
/// The primary action has already committed, so a failed write is only
/// logged.
pub async fn record_best_effort(store: &dyn Store, data: CreateActivity) {
    let user_id = data.user_id;
    let kind = data.kind.clone();

    if let Err(e) = store.record_activity(data).await {
        tracing::warn!(%user_id, %kind, error = %e, "Failed to record activity");
    }
}

/// Category of an event for its activity entry
///
/// A failed lookup is logged and yields `None`.
pub async fn event_category(store: &dyn Store, event_id: Uuid) -> Option<String> {
    match store.find_event(event_id).await {
        Ok(event) => event.map(|event| event.event_category),
        Err(e) => {
            tracing::warn!(%event_id, error = %e, "Failed to load event category");
            None
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
    pub user_id: Option<Uuid>,
}

impl ActivityQuery {
    fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

pub async fn list_activities(
    State(state): State<AppState>,
    _auth: AuthContext,
    ApiQuery(query): ApiQuery<ActivityQuery>,
) -> ApiResult<Json<Vec<Activity>>> {
    let activities = state
        .store
        .list_activities(query.user_id, query.effective_limit())
        .await?;

    Ok(Json(activities))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateActivityRequest {
    #[validate(length(min = 1, max = 50, message = "Activity kind is required"))]
    pub kind: String,

    #[validate(length(max = 100, message = "Event type must be at most 100 characters"))]
    pub event_type: Option<String>,

    pub event_id: Option<Uuid>,
}

/// Records an activity attributed to the caller
pub async fn create_activity(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<CreateActivityRequest>,
) -> ApiResult<(StatusCode, Json<Activity>)> {
    req.validate()?;

    let activity = state
        .store
        .record_activity(CreateActivity {
            user_id: auth.user_id,
            kind: req.kind.trim().to_string(),
            event_type: req.event_type,
            event_id: req.event_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(activity)))
}
