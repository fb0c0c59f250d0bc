//! # Huddle API Server Library
//!
//! HTTP surface of Huddle: accounts, profiles, the follow graph, events and
//! RSVPs, and the activity feed.
//!
//! ## Modules
//!
//! - `app`: application state and router builder
//! - `config`: configuration from environment variables
//! - `error`: error handling and HTTP response mapping
//! - `extract`: request extractors with JSON rejections
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
