/// API route handlers
///
/// Handlers are grouped by resource:
///
/// - `health`: liveness and store connectivity
/// - `auth`: registration, login and token refresh
/// - `account`: password reset and email verification
/// - `profile`: the caller's own profile and settings
/// - `users`: members, public profiles, follow and unfollow
/// - `events`: event listing, creation and RSVP
/// - `activities`: the activity feed

pub mod account;
pub mod activities;
pub mod auth;
pub mod events;
pub mod health;
pub mod profile;
pub mod users;

use huddle_shared::models::user::{User, UserLocation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Plain acknowledgement body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Another user as shown in member lists, follower lists and guest lists
#[derive(Debug, Serialize, Deserialize)]
pub struct MemberSummary {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub location: UserLocation,
}

impl From<&User> for MemberSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            location: user.location.clone(),
        }
    }
}
