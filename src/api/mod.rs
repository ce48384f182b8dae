//! HTTP API for the bookshelf daemon.
//!
//! This is the entire surface the view layer is allowed to depend on:
//! - Authentication and profile management
//! - Owner-scoped book entries (list/add/update/remove)
//! - Catalog search
//! - Cover image relay
//! - Derived reading stats and the notification slot

pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, patch, post},
    Router,
};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::catalog::CatalogClient;
use crate::library::Shelf;
use crate::notify::Notifier;
use crate::session::SessionManager;

/// Bound on cover relay fetches; upstream image hosts are untrusted.
const RELAY_TIMEOUT: Duration = Duration::from_secs(15);

/// Shared state for API handlers.
pub struct ApiState {
    /// Owner-scoped book entries.
    pub shelf: Shelf,

    /// Process-wide session; mutations (login/logout) need the write half.
    pub sessions: RwLock<SessionManager>,

    /// External book catalog.
    pub catalog: CatalogClient,

    /// Single-slot user notification channel.
    pub notifier: Notifier,

    /// HTTP client for the cover relay.
    pub http_client: reqwest::Client,
}

impl ApiState {
    /// Assemble API state from already-initialized components.
    pub fn new(shelf: Shelf, sessions: SessionManager, catalog: CatalogClient) -> Self {
        // Static settings; a builder failure here is a programming error,
        // and falling back to an unbounded client would lose the timeout.
        let http_client = reqwest::Client::builder()
            .timeout(RELAY_TIMEOUT)
            .build()
            .expect("relay HTTP client construction cannot fail");

        Self {
            shelf,
            sessions: RwLock::new(sessions),
            catalog,
            notifier: Notifier::new(),
            http_client,
        }
    }
}

/// Build the API router with all routes.
pub fn router(state: Arc<ApiState>) -> Router {
    // CORS configuration - the view layer is served from a different origin
    // during development.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status/health
        .route("/api/v1/status", get(handlers::status::health))
        // Authentication
        .route("/api/v1/auth/register", post(handlers::auth::register))
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route("/api/v1/auth/logout", post(handlers::auth::logout))
        .route("/api/v1/auth/me", get(handlers::auth::me))
        .route("/api/v1/auth/profile", patch(handlers::auth::update_profile))
        // Catalog search
        .route("/api/v1/search", get(handlers::search::search_catalog))
        // Cover image relay
        .route("/api/v1/covers", get(handlers::covers::relay_cover))
        // Book entries
        .route(
            "/api/v1/books",
            get(handlers::books::list_books).post(handlers::books::add_book),
        )
        .route(
            "/api/v1/books/:id",
            patch(handlers::books::update_book).delete(handlers::books::delete_book),
        )
        // Derived stats
        .route("/api/v1/stats", get(handlers::status::stats))
        // Notification slot
        .route(
            "/api/v1/notice",
            get(handlers::notice::current).delete(handlers::notice::dismiss),
        )
        // Middleware
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                // Only log requests/responses that are NOT 200 OK
                .on_request(())
                .on_response(|response: &axum::http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                    let status = response.status();
                    if !status.is_success() {
                        tracing::warn!(
                            status = %status,
                            latency_ms = latency.as_millis(),
                            "request failed"
                        );
                    }
                })
        )
        .with_state(state)
}

/// Start the API server.
pub async fn serve(state: Arc<ApiState>, bind_addr: &str) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;

    tracing::info!("Bookshelf API listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
