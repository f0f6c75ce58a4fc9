/// Application state and router builder
///
/// This module defines the shared application state and builds the Axum
/// router with all routes and middleware. Everything request handlers need
/// (pool, configuration, the channel registry) is constructed once at
/// process start and injected through the state, not reached through
/// module-level globals.

use crate::config::Config;
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskcrew_shared::auth::middleware::{authenticate, bearer_token};
use taskcrew_shared::realtime::ChannelRegistry;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into each handler via Axum's `State` extractor; internals are
/// behind `Arc` (or are pools) so the clone is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Real-time channel registry
    pub channels: Arc<ChannelRegistry>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
            channels: Arc::new(ChannelRegistry::new()),
        }
    }

    /// Gets the JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router
///
/// # Route layout
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// ├── /ws                              # WebSocket, token via query param
/// └── /api/
///     ├── /auth/
///     │   ├── POST /register           # public
///     │   ├── POST /login              # public
///     │   └── GET|PUT /profile         # bearer
///     ├── /tasks/                      # bearer
///     │   ├── POST /
///     │   ├── GET  /my-tasks
///     │   ├── GET  /stats
///     │   ├── GET  /team/:team_id
///     │   ├── GET|PUT|DELETE /:id
///     │   └── POST /:id/comments
///     └── /teams/                      # bearer
///         ├── POST|GET /
///         ├── GET|PUT|DELETE /:id
///         ├── GET|POST /:id/members
///         ├── PUT|DELETE /:id/members/:user_id
///         └── POST /join/:invite_code
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Public auth routes
    let auth_public = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    // Profile routes require a bearer token
    let auth_protected = Router::new()
        .route(
            "/profile",
            get(routes::auth::get_profile).put(routes::auth::update_profile),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let task_routes = Router::new()
        .route("/", post(routes::tasks::create_task))
        .route("/my-tasks", get(routes::tasks::get_my_tasks))
        .route("/stats", get(routes::tasks::get_task_stats))
        .route("/team/:team_id", get(routes::tasks::get_team_tasks))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/comments", post(routes::tasks::add_comment))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let team_routes = Router::new()
        .route(
            "/",
            post(routes::teams::create_team).get(routes::teams::get_my_teams),
        )
        .route(
            "/:id",
            get(routes::teams::get_team)
                .put(routes::teams::update_team)
                .delete(routes::teams::delete_team),
        )
        .route(
            "/:id/members",
            get(routes::teams::get_team_members).post(routes::teams::invite_member),
        )
        .route(
            "/:id/members/:user_id",
            put(routes::teams::update_member_role).delete(routes::teams::remove_member),
        )
        .route("/join/:invite_code", post(routes::teams::join_team))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let api_routes = Router::new()
        .nest("/auth", auth_public.merge(auth_protected))
        .nest("/tasks", task_routes)
        .nest("/teams", team_routes);

    let cors = build_cors_layer(&state);

    Router::new()
        .merge(health_routes)
        .route("/ws", get(routes::ws::ws_handler))
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Configures CORS from the configured origins
fn build_cors_layer(state: &AppState) -> CorsLayer {
    if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Development mode
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
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    }
}

/// JWT authentication middleware layer
///
/// Extracts and validates the bearer token, then injects `AuthContext`
/// into request extensions for handlers downstream.
async fn jwt_auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let token = bearer_token(&req)?;
    let auth_context = authenticate(token, state.jwt_secret())?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
