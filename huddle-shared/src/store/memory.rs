/// In-memory store
///
/// A complete [`Store`] implementation backed by hash maps behind a tokio
/// `RwLock`. It is used by the test suites and for running the API without a
/// database.
///
/// # Concurrency
///
/// Transactions are optimistic. Every document carries a version counter;
/// a transaction remembers the version of each document it read and buffers
/// its writes. On commit the write lock is taken, every remembered version is
/// compared with the current one, and the commit fails with
/// [`StoreError::Conflict`] if any document changed in between. Otherwise all
/// buffered writes are applied under the same lock, so other callers observe
/// either none or all of them.
///
/// # Example
///
/// ```
/// use huddle_shared::store::{memory::MemoryStore, Store};
/// use huddle_shared::models::user::CreateUser;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let user = store
///     .create_user(CreateUser {
///         email: "ada@example.com".to_string(),
///         password_hash: "$argon2id$...".to_string(),
///         sign_up_ip: None,
///     })
///     .await?;
///
/// assert!(store.find_user(user.id).await?.is_some());
/// # Ok(())
/// # }
/// ```

use super::{Store, StoreError, StoreResult, StoreTransaction};
use crate::models::{
    activity::{Activity, CreateActivity},
    event::{CreateEvent, Event, EventAttendees},
    relation_set::RelationSet,
    user::{CreateUser, PrivacySettings, UpdateUser, User, UserLocation, UserRelations},
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Document plus its optimistic-concurrency version
#[derive(Debug, Clone)]
struct Versioned<T> {
    version: u64,
    doc: T,
}

impl<T> Versioned<T> {
    fn new(doc: T) -> Self {
        Self { version: 1, doc }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<Uuid, Versioned<User>>,
    events: HashMap<Uuid, Versioned<Event>>,
    activities: Vec<Activity>,
}

impl MemoryState {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users.values().any(|entry| {
            Some(entry.doc.id) != except && entry.doc.email.eq_ignore_ascii_case(email)
        })
    }
}

/// Shared in-memory store; clones share the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(MemoryTransaction::new(self.state.clone())))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut state = self.state.write().await;

        if state.email_taken(&data.email, None) {
            return Err(StoreError::UniqueViolation("users_email_key".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            email_verified: false,
            password_hash: data.password_hash,
            first_name: None,
            last_name: None,
            birthday: None,
            location: UserLocation::default(),
            phone: None,
            phone_verified: false,
            profile: None,
            sign_up_ip: data.sign_up_ip,
            profile_complete: false,
            privacy: PrivacySettings::default(),
            verification: None,
            followers: RelationSet::new(),
            following: RelationSet::new(),
            attending: RelationSet::new(),
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };

        state.users.insert(user.id, Versioned::new(user.clone()));
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).map(|entry| entry.doc.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|entry| entry.doc.email.eq_ignore_ascii_case(email))
            .map(|entry| entry.doc.clone()))
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id).map(|entry| entry.doc.clone()))
            .collect())
    }

    async fn list_users_except(&self, excluded: Uuid) -> StoreResult<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|entry| entry.doc.id != excluded)
            .map(|entry| entry.doc.clone())
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        let mut state = self.state.write().await;

        if let Some(ref email) = data.email {
            if state.email_taken(email, Some(id)) {
                return Err(StoreError::UniqueViolation("users_email_key".to_string()));
            }
        }

        let Some(entry) = state.users.get_mut(&id) else {
            return Ok(None);
        };

        data.apply_to(&mut entry.doc);
        entry.version += 1;
        Ok(Some(entry.doc.clone()))
    }

    async fn create_event(&self, data: CreateEvent) -> StoreResult<Event> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&data.created_by) {
            return Err(StoreError::MissingReference(format!(
                "events.created_by -> users({})",
                data.created_by
            )));
        }

        let event = Event {
            id: Uuid::new_v4(),
            event_name: data.event_name,
            short_description: data.short_description,
            location_name: data.location_name,
            venue_location: data.venue_location,
            start_time: data.start_time,
            end_time: data.end_time,
            event_category: data.event_category,
            location: data.location,
            created_by: data.created_by,
            attendees: RelationSet::new(),
            created_at: Utc::now(),
        };

        state.events.insert(event.id, Versioned::new(event.clone()));
        Ok(event)
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let state = self.state.read().await;
        Ok(state.events.get(&id).map(|entry| entry.doc.clone()))
    }

    async fn find_events(&self, ids: &[Uuid]) -> StoreResult<Vec<Event>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.events.get(id).map(|entry| entry.doc.clone()))
            .collect())
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let state = self.state.read().await;
        let mut events: Vec<Event> = state.events.values().map(|entry| entry.doc.clone()).collect();
        events.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn record_activity(&self, data: CreateActivity) -> StoreResult<Activity> {
        let mut state = self.state.write().await;

        if !state.users.contains_key(&data.user_id) {
            return Err(StoreError::MissingReference(format!(
                "activities.user_id -> users({})",
                data.user_id
            )));
        }

        if let Some(event_id) = data.event_id {
            if !state.events.contains_key(&event_id) {
                return Err(StoreError::MissingReference(format!(
                    "activities.event_id -> events({})",
                    event_id
                )));
            }
        }

        let activity = Activity {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            kind: data.kind,
            event_type: data.event_type,
            event_id: data.event_id,
            created_at: Utc::now(),
        };

        state.activities.push(activity.clone());
        Ok(activity)
    }

    async fn list_activities(
        &self,
        user_id: Option<Uuid>,
        limit: i64,
    ) -> StoreResult<Vec<Activity>> {
        let state = self.state.read().await;
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);

        Ok(state
            .activities
            .iter()
            .rev()
            .filter(|activity| user_id.map_or(true, |id| activity.user_id == id))
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Key of a document read inside a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DocKey {
    User(Uuid),
    Event(Uuid),
}

/// Optimistic transaction over a [`MemoryStore`]
pub struct MemoryTransaction {
    state: Arc<RwLock<MemoryState>>,

    /// Version observed for each document read (`None` = observed missing)
    reads: HashMap<DocKey, Option<u64>>,

    user_writes: HashMap<Uuid, UserRelations>,
    event_writes: HashMap<Uuid, EventAttendees>,
}

impl MemoryTransaction {
    fn new(state: Arc<RwLock<MemoryState>>) -> Self {
        Self {
            state,
            reads: HashMap::new(),
            user_writes: HashMap::new(),
            event_writes: HashMap::new(),
        }
    }

    fn current_version(state: &MemoryState, key: DocKey) -> Option<u64> {
        match key {
            DocKey::User(id) => state.users.get(&id).map(|entry| entry.version),
            DocKey::Event(id) => state.events.get(&id).map(|entry| entry.version),
        }
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn user_relations(&mut self, id: Uuid) -> StoreResult<Option<UserRelations>> {
        if let Some(pending) = self.user_writes.get(&id) {
            return Ok(Some(pending.clone()));
        }

        let state = self.state.read().await;
        let entry = state.users.get(&id);
        self.reads
            .entry(DocKey::User(id))
            .or_insert_with(|| entry.map(|e| e.version));

        Ok(entry.map(|e| e.doc.relations()))
    }

    async fn event_attendees(&mut self, id: Uuid) -> StoreResult<Option<EventAttendees>> {
        if let Some(pending) = self.event_writes.get(&id) {
            return Ok(Some(pending.clone()));
        }

        let state = self.state.read().await;
        let entry = state.events.get(&id);
        self.reads
            .entry(DocKey::Event(id))
            .or_insert_with(|| entry.map(|e| e.version));

        Ok(entry.map(|e| e.doc.attendee_side()))
    }

    async fn put_user_relations(&mut self, relations: &UserRelations) -> StoreResult<()> {
        self.user_writes.insert(relations.id, relations.clone());
        Ok(())
    }

    async fn put_event_attendees(&mut self, attendees: &EventAttendees) -> StoreResult<()> {
        self.event_writes.insert(attendees.id, attendees.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let this = *self;
        let mut state = this.state.write().await;

        for (key, observed) in &this.reads {
            if Self::current_version(&state, *key) != *observed {
                debug!(?key, "Memory transaction conflict");
                return Err(StoreError::Conflict(format!("{:?} changed since read", key)));
            }
        }

        // Validate every target before touching anything.
        for id in this.user_writes.keys() {
            if !state.users.contains_key(id) {
                return Err(StoreError::MissingReference(format!("users({})", id)));
            }
        }
        for id in this.event_writes.keys() {
            if !state.events.contains_key(id) {
                return Err(StoreError::MissingReference(format!("events({})", id)));
            }
        }

        let now = Utc::now();
        for (id, relations) in this.user_writes {
            if let Some(entry) = state.users.get_mut(&id) {
                entry.doc.followers = relations.followers;
                entry.doc.following = relations.following;
                entry.doc.attending = relations.attending;
                entry.doc.updated_at = now;
                entry.version += 1;
            }
        }
        for (id, side) in this.event_writes {
            if let Some(entry) = state.events.get_mut(&id) {
                entry.doc.attendees = side.attendees;
                entry.version += 1;
            }
        }

        Ok(())
    }

    async fn abort(self: Box<Self>) -> StoreResult<()> {
        debug!(
            pending_users = self.user_writes.len(),
            pending_events = self.event_writes.len(),
            "Memory transaction aborted"
        );
        Ok(())
    }
}
