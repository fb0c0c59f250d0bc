/// Domain models for Huddle
///
/// # Models
///
/// - `relation_set`: set container for mirrored relationship references
/// - `user`: user accounts, profiles and the user side of every edge
/// - `event`: events and their attendee sets
/// - `activity`: activity feed entries
///
/// The models are storage-agnostic; persistence lives behind
/// [`crate::store::Store`].

pub mod activity;
pub mod event;
pub mod relation_set;
pub mod user;
