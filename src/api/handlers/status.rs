//! Status, health, and derived stats handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::api::ApiState;
use crate::library::ShelfFilter;
use crate::stats::{self, ReadingStats};

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,

    /// Whether a session is live.
    pub logged_in: bool,

    /// Session owner, when logged in.
    pub user_email: Option<String>,

    /// Owner-scoped reading stats, when logged in.
    pub stats: Option<ReadingStats>,
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let owner = {
        let sessions = state.sessions.read().await;
        sessions.current_user().map(|u| u.email.clone())
    };

    let stats = match &owner {
        Some(email) => state
            .shelf
            .list_by_owner(email, ShelfFilter::default())
            .await
            .map(|entries| stats::compute(&entries))
            .ok(),
        None => None,
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        logged_in: owner.is_some(),
        user_email: owner,
        stats,
    })
}

/// Reading stats for the session owner.
pub async fn stats(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ReadingStats>, (StatusCode, String)> {
    let owner = {
        let sessions = state.sessions.read().await;
        sessions
            .current_user()
            .map(|u| u.email.clone())
            .ok_or((StatusCode::UNAUTHORIZED, "Not logged in".to_string()))?
    };

    let entries = state
        .shelf
        .list_by_owner(&owner, ShelfFilter::default())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list entries for stats");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    Ok(Json(stats::compute(&entries)))
}
