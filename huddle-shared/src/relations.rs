/// Relationship updater
///
/// Every edge in the social graph is stored on both of its endpoints:
///
/// ```text
/// follow(A, B)   A.following ∋ B   <->   B.followers ∋ A
/// rsvp(U, E)     U.attending ∋ E   <->   E.attendees ∋ U
/// ```
///
/// The updater is the only code allowed to change these sets. Each operation
/// opens one store transaction, loads both documents, applies set-semantics
/// mutations to both sides and commits; on any error the transaction is
/// aborted, so callers never observe a half-applied edge.
///
/// # Policies
///
/// | operation  | self edge      | missing entity | edge already in target state |
/// |------------|----------------|----------------|------------------------------|
/// | `follow`   | `SelfRelation` | `NotFound`     | `Ok(EdgeChange::Unchanged)`  |
/// | `unfollow` | `SelfRelation` | `NotFound`     | `Ok(EdgeChange::Unchanged)`  |
/// | `rsvp`     | n/a            | `NotFound`     | `DuplicateRelation`          |
///
/// Following is idempotent while a repeated RSVP is rejected; the two
/// policies are deliberately different.
///
/// # Example
///
/// ```
/// use huddle_shared::relations::{EdgeChange, RelationshipUpdater};
/// use huddle_shared::store::{memory::MemoryStore, Store};
/// use huddle_shared::models::user::CreateUser;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(MemoryStore::new());
/// let mk = |email: &str| CreateUser {
///     email: email.to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     sign_up_ip: None,
/// };
/// let ada = store.create_user(mk("ada@example.com")).await?;
/// let bob = store.create_user(mk("bob@example.com")).await?;
///
/// let updater = RelationshipUpdater::new(store.clone());
/// assert_eq!(updater.follow(ada.id, bob.id).await?, EdgeChange::Applied);
/// assert_eq!(updater.follow(ada.id, bob.id).await?, EdgeChange::Unchanged);
/// # Ok(())
/// # }
/// ```

use crate::store::{Store, StoreError, StoreTransaction};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Kind of document an edge endpoint refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Event,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::User => write!(f, "User"),
            EntityKind::Event => write!(f, "Event"),
        }
    }
}

/// Error type for relationship updates
#[derive(Debug, thiserror::Error)]
pub enum RelationError {
    /// One of the endpoints does not exist
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: Uuid },

    /// Both endpoints are the same user
    #[error("A user cannot follow or unfollow themselves")]
    SelfRelation,

    /// The RSVP already exists
    #[error("Already RSVPed to this event")]
    DuplicateRelation,

    /// A concurrent update touched the same documents; safe to retry
    #[error("Concurrent update, please retry")]
    TransactionConflict,

    /// Any other store failure
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for RelationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => RelationError::TransactionConflict,
            other => RelationError::Store(other),
        }
    }
}

/// Relation result type alias
pub type RelationResult<T> = Result<T, RelationError>;

/// Whether an operation changed the stored edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeChange {
    /// Both sides were written
    Applied,

    /// The edge was already in the requested state; nothing was written
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeOp {
    Add,
    Remove,
}

/// Applies mirrored edge updates through a [`Store`]
#[derive(Clone)]
pub struct RelationshipUpdater {
    store: Arc<dyn Store>,
}

impl RelationshipUpdater {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// `follower` starts following `followee`
    ///
    /// # Errors
    ///
    /// - `SelfRelation` if both ids are equal
    /// - `NotFound` if either user does not exist
    /// - `TransactionConflict` if a concurrent update won the race
    pub async fn follow(&self, follower: Uuid, followee: Uuid) -> RelationResult<EdgeChange> {
        self.update_follow_edge(follower, followee, EdgeOp::Add).await
    }

    /// `follower` stops following `followee`
    ///
    /// Unfollowing someone you do not follow succeeds with
    /// [`EdgeChange::Unchanged`].
    pub async fn unfollow(&self, follower: Uuid, followee: Uuid) -> RelationResult<EdgeChange> {
        self.update_follow_edge(follower, followee, EdgeOp::Remove).await
    }

    /// `user_id` RSVPs to `event_id`
    ///
    /// # Errors
    ///
    /// - `NotFound` if the event or the user does not exist
    /// - `DuplicateRelation` if the user already RSVPed
    /// - `TransactionConflict` if a concurrent update won the race
    pub async fn rsvp(&self, user_id: Uuid, event_id: Uuid) -> RelationResult<()> {
        let mut tx = self.store.begin().await?;
        let outcome = add_attendee(tx.as_mut(), user_id, event_id).await;
        finish(tx, outcome).await?;

        info!(%user_id, %event_id, "RSVP recorded");
        Ok(())
    }

    async fn update_follow_edge(
        &self,
        follower: Uuid,
        followee: Uuid,
        op: EdgeOp,
    ) -> RelationResult<EdgeChange> {
        if follower == followee {
            return Err(RelationError::SelfRelation);
        }

        let mut tx = self.store.begin().await?;
        let outcome = set_follow_edge(tx.as_mut(), follower, followee, op).await;
        let change = finish(tx, outcome).await?;

        debug!(%follower, %followee, ?op, ?change, "Follow edge updated");
        Ok(change)
    }
}

async fn set_follow_edge(
    tx: &mut dyn StoreTransaction,
    follower: Uuid,
    followee: Uuid,
    op: EdgeOp,
) -> RelationResult<EdgeChange> {
    // Lock in id order so two opposite follows cannot deadlock.
    let (low, high) = if follower < followee {
        (follower, followee)
    } else {
        (followee, follower)
    };

    let low_doc = tx
        .user_relations(low)
        .await?
        .ok_or(RelationError::NotFound { kind: EntityKind::User, id: low })?;
    let high_doc = tx
        .user_relations(high)
        .await?
        .ok_or(RelationError::NotFound { kind: EntityKind::User, id: high })?;

    let (mut follower_doc, mut followee_doc) = if low == follower {
        (low_doc, high_doc)
    } else {
        (high_doc, low_doc)
    };

    let changed = match op {
        EdgeOp::Add => {
            follower_doc.following.insert(followee) | followee_doc.followers.insert(follower)
        }
        EdgeOp::Remove => {
            follower_doc.following.remove(followee) | followee_doc.followers.remove(follower)
        }
    };

    if !changed {
        return Ok(EdgeChange::Unchanged);
    }

    tx.put_user_relations(&follower_doc).await?;
    tx.put_user_relations(&followee_doc).await?;
    Ok(EdgeChange::Applied)
}

async fn add_attendee(
    tx: &mut dyn StoreTransaction,
    user_id: Uuid,
    event_id: Uuid,
) -> RelationResult<()> {
    let mut event = tx
        .event_attendees(event_id)
        .await?
        .ok_or(RelationError::NotFound { kind: EntityKind::Event, id: event_id })?;

    if event.attendees.contains(user_id) {
        return Err(RelationError::DuplicateRelation);
    }

    let mut user = tx
        .user_relations(user_id)
        .await?
        .ok_or(RelationError::NotFound { kind: EntityKind::User, id: user_id })?;

    event.attendees.insert(user_id);
    user.attending.insert(event_id);

    tx.put_event_attendees(&event).await?;
    tx.put_user_relations(&user).await?;
    Ok(())
}

/// Commits on success, aborts on failure
async fn finish<T>(
    tx: Box<dyn StoreTransaction>,
    outcome: RelationResult<T>,
) -> RelationResult<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(abort_err) = tx.abort().await {
                warn!(error = %abort_err, "Failed to abort relationship transaction");
            }
            Err(err)
        }
    }
}
