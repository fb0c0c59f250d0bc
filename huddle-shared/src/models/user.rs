/// User model
///
/// A user is a single document carrying identity, profile, privacy settings
/// and the three relation sets that make up the user's side of the social
/// graph:
///
/// - `followers`: users following this user (mirrors their `following`)
/// - `following`: users this user follows (mirrors their `followers`)
/// - `attending`: events this user RSVPed to (mirrors `Event::attendees`)
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     email_verified BOOLEAN NOT NULL DEFAULT FALSE,
///     ...
///     followers UUID[] NOT NULL DEFAULT '{}',
///     following UUID[] NOT NULL DEFAULT '{}',
///     attending UUID[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// See `migrations/` for the full definition.

use super::relation_set::RelationSet;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User account document
///
/// Credential material (`password_hash`, pending verification) is never
/// serialized; API responses are shaped from this struct explicitly.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address, unique across users (case-insensitive)
    pub email: String,

    /// Whether the email address has been verified
    pub email_verified: bool,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub location: UserLocation,
    pub phone: Option<String>,
    pub phone_verified: bool,

    /// Profile picture URL or short bio
    pub profile: Option<String>,

    /// IP address the account was registered from
    #[serde(skip_serializing)]
    pub sign_up_ip: Option<String>,

    /// Set once the user has filled in their profile
    pub profile_complete: bool,

    pub privacy: PrivacySettings,

    /// Last issued email verification code, if any
    #[serde(skip_serializing)]
    pub verification: Option<PendingVerification>,

    pub followers: RelationSet,
    pub following: RelationSet,
    pub attending: RelationSet,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// "First Last", falling back to whichever part is present
    pub fn display_name(&self) -> Option<String> {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            (Some(first), None) => Some(first.clone()),
            (None, Some(last)) => Some(last.clone()),
            (None, None) => None,
        }
    }

    /// Projects the relationship fields used inside transactions
    pub fn relations(&self) -> UserRelations {
        UserRelations {
            id: self.id,
            followers: self.followers.clone(),
            following: self.following.clone(),
            attending: self.attending.clone(),
        }
    }
}

/// Free-form user location; every part is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLocation {
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

/// Privacy toggles exposed in account settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacySettings {
    pub public_profile: bool,
    pub hide_from_guest_lists: bool,
    pub show_events_attending: bool,
    pub opt_in_sms_updates: bool,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            public_profile: true,
            hide_from_guest_lists: false,
            show_events_attending: true,
            opt_in_sms_updates: false,
        }
    }
}

/// Hash and expiry of an issued email verification code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVerification {
    /// Hex SHA-256 of the 6-digit code
    pub code_hash: String,

    pub expires_at: DateTime<Utc>,

    /// Wrong guesses so far
    pub attempts: u32,
}

/// The user's side of every relationship edge
///
/// This is what the relationship updater reads and writes inside a
/// transaction; the rest of the document is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRelations {
    pub id: Uuid,
    pub followers: RelationSet,
    pub following: RelationSet,
    pub attending: RelationSet,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    pub sign_up_ip: Option<String>,
}

/// Input for updating an existing user
///
/// All fields are optional. Only `Some` fields are written; relation sets are
/// not updatable here and only change through the relationship updater.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub email_verified: Option<bool>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub location: Option<UserLocation>,
    pub phone: Option<String>,
    pub profile: Option<String>,
    pub profile_complete: Option<bool>,
    pub public_profile: Option<bool>,
    pub hide_from_guest_lists: Option<bool>,
    pub show_events_attending: Option<bool>,
    pub opt_in_sms_updates: Option<bool>,

    /// `Some(None)` clears the pending verification
    pub verification: Option<Option<PendingVerification>>,

    pub last_login_at: Option<DateTime<Utc>>,
}

impl UpdateUser {
    /// Applies the update to an in-memory document
    ///
    /// Used by the in-memory store; the PostgreSQL store expresses the same
    /// rules in SQL.
    pub fn apply_to(self, user: &mut User) {
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(hash) = self.password_hash {
            user.password_hash = hash;
        }
        if let Some(verified) = self.email_verified {
            user.email_verified = verified;
        }
        if let Some(first_name) = self.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = self.last_name {
            user.last_name = Some(last_name);
        }
        if let Some(birthday) = self.birthday {
            user.birthday = Some(birthday);
        }
        if let Some(location) = self.location {
            user.location = location;
        }
        if let Some(phone) = self.phone {
            user.phone = Some(phone);
        }
        if let Some(profile) = self.profile {
            user.profile = Some(profile);
        }
        if let Some(complete) = self.profile_complete {
            user.profile_complete = complete;
        }
        if let Some(value) = self.public_profile {
            user.privacy.public_profile = value;
        }
        if let Some(value) = self.hide_from_guest_lists {
            user.privacy.hide_from_guest_lists = value;
        }
        if let Some(value) = self.show_events_attending {
            user.privacy.show_events_attending = value;
        }
        if let Some(value) = self.opt_in_sms_updates {
            user.privacy.opt_in_sms_updates = value;
        }
        if let Some(verification) = self.verification {
            user.verification = verification;
        }
        if let Some(at) = self.last_login_at {
            user.last_login_at = Some(at);
        }
        user.updated_at = Utc::now();
    }
}
