/// Application state and router builder
///
/// `AppState` carries every long-lived dependency (store, relationship
/// updater, mailer, configuration). It is built once in `main`, or in tests
/// with an in-memory store, and cloned into each handler by Axum.
///
/// # Example
///
/// ```no_run
/// use huddle_api::{app::{build_router, AppState}, config::Config};
/// use huddle_shared::{mail::LogMailer, store::memory::MemoryStore};
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), Arc::new(LogMailer), config);
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3001").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use huddle_shared::{
    auth::middleware::authenticate_bearer, mail::Mailer, relations::RelationshipUpdater,
    store::Store,
};
use std::{sync::Arc, time::Duration};
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every field
/// is reference counted.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub relations: RelationshipUpdater,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, config: Config) -> Self {
        Self {
            relations: RelationshipUpdater::new(store.clone()),
            store,
            mailer,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health                          public
/// └── /v1
///     ├── /auth/...                        public
///     ├── GET  /me                         bearer
///     ├── /profile/...                     bearer
///     ├── GET  /members                    bearer
///     ├── /users/:user_id[/follow|/unfollow]  bearer
///     ├── /events[/:event_id[/rsvp]]       bearer
///     └── /activities                      bearer
/// ```
///
/// Layers, outermost first: CORS, tracing, request timeout. Bearer
/// authentication is applied to the protected sub-router only.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/forgot-password", post(routes::account::forgot_password))
        .route("/reset-password", post(routes::account::reset_password))
        .route("/verify-email", post(routes::account::verify_email))
        .route("/verify-code", post(routes::account::verify_code));

    let protected_routes = Router::new()
        .route("/me", get(routes::profile::me))
        .route(
            "/profile",
            get(routes::profile::get_profile).post(routes::profile::create_profile),
        )
        .route("/profile/following", get(routes::profile::following))
        .route("/profile/followers", get(routes::profile::followers))
        .route("/profile/attending", get(routes::profile::attending))
        .route("/profile/settings/general", put(routes::profile::update_general))
        .route("/profile/settings/privacy", put(routes::profile::update_privacy))
        .route("/profile/settings/security", put(routes::profile::update_security))
        .route("/members", get(routes::users::list_members))
        .route("/users/:user_id", get(routes::users::get_user))
        .route("/users/:user_id/follow", post(routes::users::follow))
        .route("/users/:user_id/unfollow", post(routes::users::unfollow))
        .route(
            "/events",
            get(routes::events::list_events).post(routes::events::create_event),
        )
        .route("/events/:event_id", get(routes::events::get_event))
        .route("/events/:event_id/rsvp", post(routes::events::rsvp))
        .route(
            "/activities",
            get(routes::activities::list_activities).post(routes::activities::create_activity),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(protected_routes);

    let cors = if state.config.cors_is_permissive() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(Duration::from_secs(3600))
    };

    let timeout = Duration::from_secs(state.config.api.request_timeout_seconds);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(TimeoutLayer::new(timeout))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Bearer authentication layer
///
/// Validates the access token and stores the caller's `AuthContext` in the
/// request extensions.
async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate_bearer(req.headers(), state.jwt_secret())?;
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
