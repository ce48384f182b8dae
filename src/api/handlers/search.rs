//! Catalog search handler.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::ApiState;
use crate::catalog::BookRecord;

#[derive(Deserialize)]
pub struct SearchQuery {
    /// Search query string.
    pub q: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    /// Number of results returned.
    pub total: usize,

    /// Normalized catalog records.
    pub items: Vec<BookRecord>,
}

/// Search the external catalog.
///
/// A provider failure degrades to an empty result set plus a notice; it
/// never surfaces as an HTTP error to the view.
pub async fn search_catalog(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<SearchQuery>,
) -> Json<SearchResponse> {
    match state.catalog.search(&query.q).await {
        Ok(items) => Json(SearchResponse {
            total: items.len(),
            items,
        }),
        Err(err) => {
            tracing::warn!(
                error = %err,
                retryable = err.is_retryable(),
                query = %query.q,
                "Catalog search failed"
            );
            state
                .notifier
                .post("Failed to search books. Please try again.")
                .await;
            Json(SearchResponse {
                total: 0,
                items: Vec::new(),
            })
        }
    }
}
