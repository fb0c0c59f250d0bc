/// Activity feed entries
///
/// Activities are append-only records of social actions (following a user,
/// RSVPing to an event, or anything a client chooses to post). They are not
/// part of the relationship edges and are written outside the edge
/// transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Activity kind recorded after a follow
pub const KIND_FOLLOW: &str = "follow";

/// Activity kind recorded after an RSVP
pub const KIND_RSVP: &str = "rsvp";

/// A single feed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,

    /// User who performed the action
    pub user_id: Uuid,

    /// Free-form action label (e.g. "follow", "rsvp")
    pub kind: String,

    /// Optional event category associated with the action
    pub event_type: Option<String>,

    /// Optional event the action refers to
    pub event_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
}

/// Input for recording an activity
#[derive(Debug, Clone)]
pub struct CreateActivity {
    pub user_id: Uuid,
    pub kind: String,
    pub event_type: Option<String>,
    pub event_id: Option<Uuid>,
}

impl CreateActivity {
    /// Activity for `follower` starting to follow someone
    pub fn follow(follower: Uuid) -> Self {
        Self {
            user_id: follower,
            kind: KIND_FOLLOW.to_string(),
            event_type: None,
            event_id: None,
        }
    }

    /// Activity for `user` RSVPing to `event_id`
    pub fn rsvp(user: Uuid, event_id: Uuid, event_type: Option<String>) -> Self {
        Self {
            user_id: user,
            kind: KIND_RSVP.to_string(),
            event_type,
            event_id: Some(event_id),
        }
    }
}
