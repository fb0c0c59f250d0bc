/// Credential store abstraction
///
/// All persistence goes through the [`Store`] trait so that the HTTP surface
/// and the relationship updater never depend on a concrete database. Two
/// implementations exist:
///
/// - [`crate::db::postgres::PgStore`]: PostgreSQL via sqlx (production)
/// - [`memory::MemoryStore`]: in-process store with optimistic concurrency
///   (tests and local demos)
///
/// # Transactions
///
/// Relationship edges span two documents, so the store exposes an explicit
/// transaction handle:
///
/// ```text
/// let mut tx = store.begin().await?;
/// let a = tx.user_relations(a_id).await?;   // locks / records version
/// let b = tx.user_relations(b_id).await?;
/// tx.put_user_relations(&a2).await?;         // buffered until commit
/// tx.put_user_relations(&b2).await?;
/// tx.commit().await?;                        // all or nothing
/// ```
///
/// A transaction that is dropped without `commit` is rolled back.

pub mod memory;

use crate::models::{
    activity::{Activity, CreateActivity},
    event::{CreateEvent, Event, EventAttendees},
    user::{CreateUser, UpdateUser, User, UserRelations},
};
use async_trait::async_trait;
use uuid::Uuid;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Concurrent transaction touched the same documents; safe to retry
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    /// Unique constraint violated (e.g. duplicate email)
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Referenced document does not exist
    #[error("Missing reference: {0}")]
    MissingReference(String),

    /// Backend failure (connection, protocol, decoding)
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for users, events and activities
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a transaction for multi-document updates
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;

    /// Verifies the backend is reachable
    async fn ping(&self) -> StoreResult<()>;

    /// Creates a user; fails with `UniqueViolation` if the email is taken
    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Case-insensitive email lookup
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Fetches the given users; missing ids are skipped
    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;

    /// Lists every user except `excluded`, oldest first
    async fn list_users_except(&self, excluded: Uuid) -> StoreResult<Vec<User>>;

    /// Applies a partial update; `None` if the user does not exist
    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>>;

    /// Creates an event; fails with `MissingReference` if the owner is unknown
    async fn create_event(&self, data: CreateEvent) -> StoreResult<Event>;

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>>;

    /// Fetches the given events; missing ids are skipped
    async fn find_events(&self, ids: &[Uuid]) -> StoreResult<Vec<Event>>;

    /// Lists all events ordered by start time
    async fn list_events(&self) -> StoreResult<Vec<Event>>;

    async fn record_activity(&self, data: CreateActivity) -> StoreResult<Activity>;

    /// Most recent activities first, optionally filtered by user
    async fn list_activities(&self, user_id: Option<Uuid>, limit: i64)
        -> StoreResult<Vec<Activity>>;
}

/// An open multi-document transaction
///
/// Reads return the relationship projection of a document and register it in
/// the transaction (row lock for PostgreSQL, version snapshot for the memory
/// store). Writes become visible to other callers only after `commit`.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn user_relations(&mut self, id: Uuid) -> StoreResult<Option<UserRelations>>;

    async fn event_attendees(&mut self, id: Uuid) -> StoreResult<Option<EventAttendees>>;

    async fn put_user_relations(&mut self, relations: &UserRelations) -> StoreResult<()>;

    async fn put_event_attendees(&mut self, attendees: &EventAttendees) -> StoreResult<()>;

    /// Makes every buffered write visible atomically
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discards every buffered write
    async fn abort(self: Box<Self>) -> StoreResult<()>;
}
