/// Common test utilities for integration tests
///
/// Every test gets its own router over a fresh `MemoryStore`, so tests run
/// in parallel without a database. Requests are driven in-process with
/// `tower::ServiceExt::oneshot`.

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use huddle_api::{
    app::{build_router, AppState},
    config::{ApiConfig, Config, DatabaseConfig, JwtConfig, LogFormat, MailConfig},
};
use huddle_shared::{
    auth::jwt::{issue_token, TokenType},
    mail::LogMailer,
    models::{
        event::{CreateEvent, Event, Location},
        user::{CreateUser, User},
    },
    store::{memory::MemoryStore, Store},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            request_timeout_seconds: 30,
        },
        database: DatabaseConfig {
            url: "postgresql://unused".to_string(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
        mail: MailConfig {
            sendgrid_api_key: None,
            from: "info@huddle.local".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
        },
        log_format: LogFormat::Pretty,
    }
}

/// Response captured for assertions
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Test context containing the router and its backing store
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: Router,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), Arc::new(LogMailer), test_config());

        Self {
            store,
            app: build_router(state),
        }
    }

    /// Inserts a user directly, bypassing password hashing
    pub async fn user(&self, email: &str) -> User {
        self.store
            .create_user(CreateUser {
                email: email.to_string(),
                password_hash: "not-a-real-hash".to_string(),
                sign_up_ip: None,
            })
            .await
            .unwrap()
    }

    pub async fn event(&self, owner: &User, name: &str) -> Event {
        let start = Utc::now() + Duration::days(7);

        self.store
            .create_event(CreateEvent {
                event_name: name.to_string(),
                short_description: "Test event".to_string(),
                location_name: "The Deck".to_string(),
                venue_location: "12 Harbor St".to_string(),
                start_time: start,
                end_time: start + Duration::hours(3),
                event_category: "music".to_string(),
                location: Location {
                    city: "Austin".to_string(),
                    state: "TX".to_string(),
                    country: "US".to_string(),
                },
                created_by: owner.id,
            })
            .await
            .unwrap()
    }

    /// Access token for `user`
    pub fn token(&self, user: &User) -> String {
        issue_token(user.id, TokenType::Access, JWT_SECRET).unwrap()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("Non-JSON body ({}): {}", status, String::from_utf8_lossy(&bytes))
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }
}
