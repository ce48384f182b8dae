//! Cover image relay.
//!
//! A stateless pass-through for cover art: the browser cannot fetch many
//! catalog image hosts directly (CORS, mixed content), so the daemon
//! streams them through. Responses are marked cacheable for a day. Any
//! upstream failure degrades to a placeholder image - a missing cover is
//! best-effort and never worth a notification.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::api::ApiState;

/// Shown when the upstream image cannot be fetched.
const PLACEHOLDER_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="128" height="192" viewBox="0 0 128 192"><rect width="128" height="192" fill="#e5e7eb"/><path d="M40 56h48v80H40z" fill="none" stroke="#9ca3af" stroke-width="4"/><path d="M64 56v80" stroke="#9ca3af" stroke-width="4"/></svg>"##;

#[derive(Deserialize)]
pub struct CoverQuery {
    /// Upstream image URL.
    pub url: String,
}

fn placeholder() -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/svg+xml")
        .header(header::CACHE_CONTROL, "public, max-age=86400")
        .body(Body::from(PLACEHOLDER_SVG))
        .unwrap_or_default()
}

/// Relay a cover image from its upstream host.
pub async fn relay_cover(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<CoverQuery>,
) -> impl IntoResponse {
    if !query.url.starts_with("http://") && !query.url.starts_with("https://") {
        return Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .body(Body::from("url must be http(s)"))
            .unwrap_or_default();
    }

    match state.http_client.get(&query.url).send().await {
        Ok(response) => {
            if !response.status().is_success() {
                tracing::debug!(url = %query.url, status = %response.status(), "Cover fetch failed");
                return placeholder();
            }

            let content_type = response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("image/jpeg")
                .to_string();

            let stream = response.bytes_stream();

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CACHE_CONTROL, "public, max-age=86400")
                .body(Body::from_stream(stream))
                .unwrap_or_else(|_| placeholder())
        }
        Err(err) => {
            tracing::debug!(url = %query.url, error = %err, "Cover fetch unreachable");
            placeholder()
        }
    }
}
