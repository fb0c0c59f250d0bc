/// Event endpoints
///
/// - `GET /v1/events` - All events, soonest first, with `has_rsvped`
/// - `POST /v1/events` - Create an event owned by the caller
/// - `GET /v1/events/:event_id` - Event detail with guest list
/// - `POST /v1/events/:event_id/rsvp` - RSVP

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
    routes::{
        activities::{event_category, record_best_effort},
        MemberSummary, MessageResponse,
    },
};
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use huddle_shared::{
    auth::middleware::AuthContext,
    models::{
        activity::CreateActivity,
        event::{CreateEvent, Event, Location},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Event as listed, with the caller's RSVP state
#[derive(Debug, Serialize)]
pub struct EventListing {
    #[serde(flatten)]
    pub event: Event,
    pub has_rsvped: bool,
}

pub async fn list_events(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<EventListing>>> {
    let events = state.store.list_events().await?;

    let listings = events
        .into_iter()
        .map(|event| EventListing {
            has_rsvped: event.attendees.contains(auth.user_id),
            event,
        })
        .collect();

    Ok(Json(listings))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LocationInput {
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,

    #[validate(length(min = 1, message = "State is required"))]
    pub state: String,

    #[validate(length(min = 1, message = "Country is required"))]
    pub country: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 255, message = "Event name is required"))]
    pub event_name: String,

    #[validate(length(min = 1, max = 1000, message = "Short description is required"))]
    pub short_description: String,

    #[validate(length(min = 1, max = 255, message = "Location name is required"))]
    pub location_name: String,

    #[validate(length(min = 1, max = 255, message = "Venue location is required"))]
    pub venue_location: String,

    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,

    #[validate(length(min = 1, max = 100, message = "Event category is required"))]
    pub event_category: String,

    #[validate(nested)]
    pub location: LocationInput,
}

/// Create an event
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Missing fields, or `end_time` before `start_time`
pub async fn create_event(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<CreateEventRequest>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    req.validate()?;

    let data = CreateEvent {
        event_name: req.event_name.trim().to_string(),
        short_description: req.short_description.trim().to_string(),
        location_name: req.location_name.trim().to_string(),
        venue_location: req.venue_location.trim().to_string(),
        start_time: req.start_time,
        end_time: req.end_time,
        event_category: req.event_category.trim().to_string(),
        location: Location {
            city: req.location.city,
            state: req.location.state,
            country: req.location.country,
        },
        created_by: auth.user_id,
    };

    if !data.has_valid_schedule() {
        return Err(ApiError::invalid_field(
            "end_time",
            "End time must not be before start time",
        ));
    }

    let event = state.store.create_event(data).await?;
    tracing::info!(event_id = %event.id, created_by = %auth.user_id, "Event created");

    Ok((StatusCode::CREATED, Json(event)))
}

/// Event detail with its visible guest list
///
/// Attendees who set `hide_from_guest_lists` are left out of `attendees`
/// (unless they are the caller) but still counted in `attendee_count`.
#[derive(Debug, Serialize)]
pub struct EventDetail {
    pub id: Uuid,
    pub event_name: String,
    pub short_description: String,
    pub location_name: String,
    pub venue_location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub event_category: String,
    pub location: Location,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub attendee_count: usize,
    pub attendees: Vec<MemberSummary>,
    pub has_rsvped: bool,
}

pub async fn get_event(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(event_id): ApiPath<Uuid>,
) -> ApiResult<Json<EventDetail>> {
    let event = state
        .store
        .find_event(event_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))?;

    let attendees = state
        .store
        .find_users(&event.attendees.to_vec())
        .await?
        .iter()
        .filter(|user| user.id == auth.user_id || !user.privacy.hide_from_guest_lists)
        .map(MemberSummary::from)
        .collect();

    Ok(Json(EventDetail {
        id: event.id,
        has_rsvped: event.attendees.contains(auth.user_id),
        attendee_count: event.attendees.len(),
        attendees,
        event_name: event.event_name,
        short_description: event.short_description,
        location_name: event.location_name,
        venue_location: event.venue_location,
        start_time: event.start_time,
        end_time: event.end_time,
        event_category: event.event_category,
        location: event.location,
        created_by: event.created_by,
        created_at: event.created_at,
    }))
}

/// RSVP to an event
///
/// # Errors
///
/// - `400 Bad Request`: Already RSVPed (`duplicate_relation`) or malformed id
/// - `404 Not Found`: Unknown event
/// - `409 Conflict`: Concurrent update, retry (`transaction_conflict`)
pub async fn rsvp(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(event_id): ApiPath<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    state.relations.rsvp(auth.user_id, event_id).await?;

    let category = event_category(state.store.as_ref(), event_id).await;
    record_best_effort(
        state.store.as_ref(),
        CreateActivity::rsvp(auth.user_id, event_id, category),
    )
    .await;

    Ok(Json(MessageResponse::new("RSVP successful")))
}
