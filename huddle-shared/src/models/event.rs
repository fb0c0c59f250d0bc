/// Event model
///
/// Events are created by a user (`created_by`) and carry the attendee side of
/// the RSVP edge. Every descriptive field is required.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE events (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     event_name VARCHAR(255) NOT NULL,
///     ...
///     created_by UUID NOT NULL REFERENCES users(id),
///     attendees UUID[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use super::relation_set::RelationSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event document
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: Uuid,
    pub event_name: String,
    pub short_description: String,
    pub location_name: String,
    pub venue_location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub event_category: String,
    pub location: Location,

    /// Owner of the event
    pub created_by: Uuid,

    /// Users who RSVPed (mirrors `User::attending`)
    pub attendees: RelationSet,

    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Projects the attendee set used inside transactions
    pub fn attendee_side(&self) -> EventAttendees {
        EventAttendees {
            id: self.id,
            attendees: self.attendees.clone(),
        }
    }
}

/// Where an event takes place
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
    pub country: String,
}

/// The event's side of the RSVP edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventAttendees {
    pub id: Uuid,
    pub attendees: RelationSet,
}

/// Input for creating a new event
#[derive(Debug, Clone)]
pub struct CreateEvent {
    pub event_name: String,
    pub short_description: String,
    pub location_name: String,
    pub venue_location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub event_category: String,
    pub location: Location,
    pub created_by: Uuid,
}

impl CreateEvent {
    /// Checks that the event does not end before it starts
    pub fn has_valid_schedule(&self) -> bool {
        self.end_time >= self.start_time
    }
}
