//! # Huddle Shared Library
//!
//! Domain types, persistence and business logic used by the Huddle API
//! server.
//!
//! ## Module Organization
//!
//! - `models`: users, events, activities and the relation sets between them
//! - `store`: the persistence trait and its in-memory implementation
//! - `db`: PostgreSQL pool, migrations and the sqlx-backed store
//! - `relations`: the relationship updater (follow, unfollow, RSVP)
//! - `auth`: passwords, tokens, verification codes and bearer auth
//! - `mail`: outbound email

pub mod auth;
pub mod db;
pub mod mail;
pub mod models;
pub mod relations;
pub mod store;

/// Current version of the Huddle shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
