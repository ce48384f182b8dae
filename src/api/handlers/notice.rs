//! Notification slot handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use crate::api::ApiState;
use crate::notify::Notice;

/// The visible notice, if any.
pub async fn current(State(state): State<Arc<ApiState>>) -> Json<Option<Notice>> {
    Json(state.notifier.current().await)
}

/// Dismiss the visible notice ahead of its expiry.
pub async fn dismiss(State(state): State<Arc<ApiState>>) -> StatusCode {
    state.notifier.dismiss().await;
    StatusCode::NO_CONTENT
}
