/// PostgreSQL implementation of the credential store
///
/// Documents map to one row each (`users`, `events`, `activities`); relation
/// sets are `UUID[]` columns written whole from a [`RelationSet`].
///
/// # Transactions
///
/// [`PgTransaction`] wraps a sqlx transaction. Relationship reads use
/// `SELECT ... FOR UPDATE`, so two callers racing on the same edge serialize
/// on the row locks and the second one sees the first one's committed sets.
/// Serialization failures (`40001`) and deadlocks (`40P01`) are reported as
/// [`StoreError::Conflict`].

use crate::models::{
    activity::{Activity, CreateActivity},
    event::{CreateEvent, Event, EventAttendees, Location},
    relation_set::RelationSet,
    user::{CreateUser, PendingVerification, PrivacySettings, UpdateUser, User, UserLocation, UserRelations},
};
use crate::store::{Store, StoreError, StoreResult, StoreTransaction};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

/// Column list shared by every user query
///
/// `email` is CITEXT in the schema and is read back as TEXT.
const USER_COLUMNS: &str = r#"
    id, email::TEXT AS email, password_hash, email_verified,
    first_name, last_name, birthday, city, state, country,
    phone, phone_verified, profile, sign_up_ip, profile_complete,
    public_profile, hide_from_guest_lists, show_events_attending, opt_in_sms_updates,
    verification_code_hash, verification_expires_at, verification_attempts,
    followers, following, attending,
    created_at, updated_at, last_login_at
"#;

const EVENT_COLUMNS: &str = r#"
    id, event_name, short_description, location_name, venue_location,
    start_time, end_time, event_category, city, state, country,
    created_by, attendees, created_at
"#;

const ACTIVITY_COLUMNS: &str = "id, user_id, kind, event_type, event_id, created_at";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            match db_err.code().as_deref() {
                Some("40001") | Some("40P01") => {
                    return StoreError::Conflict(db_err.message().to_string());
                }
                Some("23505") => {
                    return StoreError::UniqueViolation(
                        db_err.constraint().unwrap_or("unique").to_string(),
                    );
                }
                Some("23503") => {
                    return StoreError::MissingReference(
                        db_err.constraint().unwrap_or("foreign_key").to_string(),
                    );
                }
                _ => {}
            }
        }

        StoreError::Backend(err.to_string())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    email_verified: bool,
    first_name: Option<String>,
    last_name: Option<String>,
    birthday: Option<NaiveDate>,
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
    phone: Option<String>,
    phone_verified: bool,
    profile: Option<String>,
    sign_up_ip: Option<String>,
    profile_complete: bool,
    public_profile: bool,
    hide_from_guest_lists: bool,
    show_events_attending: bool,
    opt_in_sms_updates: bool,
    verification_code_hash: Option<String>,
    verification_expires_at: Option<DateTime<Utc>>,
    verification_attempts: i32,
    followers: Vec<Uuid>,
    following: Vec<Uuid>,
    attending: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let verification = match (row.verification_code_hash, row.verification_expires_at) {
            (Some(code_hash), Some(expires_at)) => Some(PendingVerification {
                code_hash,
                expires_at,
                attempts: u32::try_from(row.verification_attempts).unwrap_or(0),
            }),
            _ => None,
        };

        User {
            id: row.id,
            email: row.email,
            email_verified: row.email_verified,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            birthday: row.birthday,
            location: UserLocation {
                city: row.city,
                state: row.state,
                country: row.country,
            },
            phone: row.phone,
            phone_verified: row.phone_verified,
            profile: row.profile,
            sign_up_ip: row.sign_up_ip,
            profile_complete: row.profile_complete,
            privacy: PrivacySettings {
                public_profile: row.public_profile,
                hide_from_guest_lists: row.hide_from_guest_lists,
                show_events_attending: row.show_events_attending,
                opt_in_sms_updates: row.opt_in_sms_updates,
            },
            verification,
            followers: RelationSet::from(row.followers),
            following: RelationSet::from(row.following),
            attending: RelationSet::from(row.attending),
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_login_at: row.last_login_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    event_name: String,
    short_description: String,
    location_name: String,
    venue_location: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    event_category: String,
    city: String,
    state: String,
    country: String,
    created_by: Uuid,
    attendees: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            event_name: row.event_name,
            short_description: row.short_description,
            location_name: row.location_name,
            venue_location: row.venue_location,
            start_time: row.start_time,
            end_time: row.end_time,
            event_category: row.event_category,
            location: Location {
                city: row.city,
                state: row.state,
                country: row.country,
            },
            created_by: row.created_by,
            attendees: RelationSet::from(row.attendees),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ActivityRow {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    event_type: Option<String>,
    event_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<ActivityRow> for Activity {
    fn from(row: ActivityRow) -> Self {
        Activity {
            id: row.id,
            user_id: row.user_id,
            kind: row.kind,
            event_type: row.event_type,
            event_id: row.event_id,
            created_at: row.created_at,
        }
    }
}

/// Store backed by a PostgreSQL connection pool
///
/// The pool is created and closed by the caller (see [`super::pool`]); the
/// store only borrows connections from it.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn ping(&self) -> StoreResult<()> {
        super::pool::health_check(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (email, password_hash, sign_up_ip) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.sign_up_ip)
        .fetch_one(&self.pool)
        .await?;

        debug!(user_id = %row.id, "Created user");
        Ok(row.into())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = $1::citext",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = ANY($1) ORDER BY created_at, id",
            USER_COLUMNS
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn list_users_except(&self, excluded: Uuid) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id <> $1 ORDER BY created_at, id",
            USER_COLUMNS
        ))
        .bind(excluded)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        let set_location = data.location.is_some();
        let location = data.location.unwrap_or_default();
        let set_verification = data.verification.is_some();
        let verification = data.verification.flatten();

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users SET
                email = COALESCE($2::citext, email),
                password_hash = COALESCE($3, password_hash),
                email_verified = COALESCE($4, email_verified),
                first_name = COALESCE($5, first_name),
                last_name = COALESCE($6, last_name),
                birthday = COALESCE($7, birthday),
                city = CASE WHEN $8 THEN $9 ELSE city END,
                state = CASE WHEN $8 THEN $10 ELSE state END,
                country = CASE WHEN $8 THEN $11 ELSE country END,
                phone = COALESCE($12, phone),
                profile = COALESCE($13, profile),
                profile_complete = COALESCE($14, profile_complete),
                public_profile = COALESCE($15, public_profile),
                hide_from_guest_lists = COALESCE($16, hide_from_guest_lists),
                show_events_attending = COALESCE($17, show_events_attending),
                opt_in_sms_updates = COALESCE($18, opt_in_sms_updates),
                verification_code_hash = CASE WHEN $19 THEN $20 ELSE verification_code_hash END,
                verification_expires_at = CASE WHEN $19 THEN $21 ELSE verification_expires_at END,
                verification_attempts = CASE WHEN $19 THEN $23 ELSE verification_attempts END,
                last_login_at = COALESCE($22, last_login_at),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.email_verified)
        .bind(data.first_name)
        .bind(data.last_name)
        .bind(data.birthday)
        .bind(set_location)
        .bind(location.city)
        .bind(location.state)
        .bind(location.country)
        .bind(data.phone)
        .bind(data.profile)
        .bind(data.profile_complete)
        .bind(data.public_profile)
        .bind(data.hide_from_guest_lists)
        .bind(data.show_events_attending)
        .bind(data.opt_in_sms_updates)
        .bind(set_verification)
        .bind(verification.as_ref().map(|v| v.code_hash.clone()))
        .bind(verification.as_ref().map(|v| v.expires_at))
        .bind(data.last_login_at)
        .bind(verification.as_ref().map_or(0, |v| v.attempts as i32))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn create_event(&self, data: CreateEvent) -> StoreResult<Event> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            INSERT INTO events (
                event_name, short_description, location_name, venue_location,
                start_time, end_time, event_category, city, state, country, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(data.event_name)
        .bind(data.short_description)
        .bind(data.location_name)
        .bind(data.venue_location)
        .bind(data.start_time)
        .bind(data.end_time)
        .bind(data.event_category)
        .bind(data.location.city)
        .bind(data.location.state)
        .bind(data.location.country)
        .bind(data.created_by)
        .fetch_one(&self.pool)
        .await?;

        debug!(event_id = %row.id, created_by = %row.created_by, "Created event");
        Ok(row.into())
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events WHERE id = $1",
            EVENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Event::from))
    }

    async fn find_events(&self, ids: &[Uuid]) -> StoreResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events WHERE id = ANY($1) ORDER BY start_time, id",
            EVENT_COLUMNS
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events ORDER BY start_time, id",
            EVENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn record_activity(&self, data: CreateActivity) -> StoreResult<Activity> {
        let row = sqlx::query_as::<_, ActivityRow>(&format!(
            "INSERT INTO activities (user_id, kind, event_type, event_id) VALUES ($1, $2, $3, $4) RETURNING {}",
            ACTIVITY_COLUMNS
        ))
        .bind(data.user_id)
        .bind(data.kind)
        .bind(data.event_type)
        .bind(data.event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn list_activities(
        &self,
        user_id: Option<Uuid>,
        limit: i64,
    ) -> StoreResult<Vec<Activity>> {
        let rows = sqlx::query_as::<_, ActivityRow>(&format!(
            r#"
            SELECT {} FROM activities
            WHERE ($1::uuid IS NULL OR user_id = $1)
            ORDER BY created_at DESC, id
            LIMIT $2
            "#,
            ACTIVITY_COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Activity::from).collect())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRelationsRow {
    id: Uuid,
    followers: Vec<Uuid>,
    following: Vec<Uuid>,
    attending: Vec<Uuid>,
}

#[derive(Debug, sqlx::FromRow)]
struct EventAttendeesRow {
    id: Uuid,
    attendees: Vec<Uuid>,
}

/// Open PostgreSQL transaction
///
/// Dropping it without `commit` rolls back (sqlx issues the rollback when the
/// connection returns to the pool).
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn user_relations(&mut self, id: Uuid) -> StoreResult<Option<UserRelations>> {
        let row = sqlx::query_as::<_, UserRelationsRow>(
            "SELECT id, followers, following, attending FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(|row| UserRelations {
            id: row.id,
            followers: RelationSet::from(row.followers),
            following: RelationSet::from(row.following),
            attending: RelationSet::from(row.attending),
        }))
    }

    async fn event_attendees(&mut self, id: Uuid) -> StoreResult<Option<EventAttendees>> {
        let row = sqlx::query_as::<_, EventAttendeesRow>(
            "SELECT id, attendees FROM events WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(|row| EventAttendees {
            id: row.id,
            attendees: RelationSet::from(row.attendees),
        }))
    }

    async fn put_user_relations(&mut self, relations: &UserRelations) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET followers = $2, following = $3, attending = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(relations.id)
        .bind(relations.followers.to_vec())
        .bind(relations.following.to_vec())
        .bind(relations.attending.to_vec())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingReference(format!("users({})", relations.id)));
        }
        Ok(())
    }

    async fn put_event_attendees(&mut self, attendees: &EventAttendees) -> StoreResult<()> {
        let result = sqlx::query("UPDATE events SET attendees = $2 WHERE id = $1")
            .bind(attendees.id)
            .bind(attendees.attendees.to_vec())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingReference(format!("events({})", attendees.id)));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn abort(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
