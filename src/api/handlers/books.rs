//! Book entry handlers.
//!
//! Every route here requires a live session and is scoped to that owner's
//! shelf. Mutation responses carry freshly recomputed stats so the view
//! always observes the post-commit state.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::ApiState;
use crate::catalog::BookRecord;
use crate::library::{BookEntry, EntryPatch, ReadingStatus, ShelfError, ShelfFilter};
use crate::stats::{self, ReadingStats};

/// Listing predicates, all optional.
#[derive(Deserialize, Default)]
pub struct ListQuery {
    pub status: Option<ReadingStatus>,

    pub favourite: Option<bool>,

    /// Newest-first head of the listing (recently-added view).
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct AddBookRequest {
    #[serde(flatten)]
    pub record: BookRecord,

    /// Defaults to `to-read`.
    #[serde(default)]
    pub status: ReadingStatus,
}

/// A mutation outcome: the affected entry plus recomputed stats.
#[derive(Serialize)]
pub struct MutationResponse {
    pub entry: BookEntry,

    pub stats: ReadingStats,
}

/// A removal outcome: stats only, the entry is gone.
#[derive(Serialize)]
pub struct RemovalResponse {
    pub stats: ReadingStats,
}

/// Resolve the session owner or reject with 401.
async fn require_owner(state: &ApiState) -> Result<String, (StatusCode, String)> {
    let sessions = state.sessions.read().await;
    sessions
        .current_user()
        .map(|user| user.email.clone())
        .ok_or((StatusCode::UNAUTHORIZED, "Not logged in".to_string()))
}

fn shelf_error(err: ShelfError) -> (StatusCode, String) {
    match err {
        ShelfError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        ShelfError::Storage(_) => {
            tracing::error!(error = %err, "Shelf operation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

/// Recompute the owner's stats from the post-mutation listing.
async fn recompute_stats(
    state: &ApiState,
    owner: &str,
) -> Result<ReadingStats, (StatusCode, String)> {
    let entries = state
        .shelf
        .list_by_owner(owner, ShelfFilter::default())
        .await
        .map_err(shelf_error)?;
    Ok(stats::compute(&entries))
}

/// List the owner's entries, filtered and newest first.
pub async fn list_books(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<BookEntry>>, (StatusCode, String)> {
    let owner = require_owner(&state).await?;

    let filter = ShelfFilter {
        status: query.status,
        favourite: query.favourite,
    };

    let mut entries = state
        .shelf
        .list_by_owner(&owner, filter)
        .await
        .map_err(shelf_error)?;

    if let Some(limit) = query.limit {
        entries.truncate(limit);
    }

    Ok(Json(entries))
}

/// Add a catalog record to the owner's shelf.
pub async fn add_book(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<AddBookRequest>,
) -> Result<(StatusCode, Json<MutationResponse>), (StatusCode, String)> {
    let owner = require_owner(&state).await?;

    let entry = state
        .shelf
        .add(&owner, request.record, request.status)
        .await
        .map_err(shelf_error)?;

    let stats = recompute_stats(&state, &owner).await?;

    state
        .notifier
        .post(format!("\"{}\" added to your library!", entry.title))
        .await;

    Ok((StatusCode::CREATED, Json(MutationResponse { entry, stats })))
}

/// Patch an entry's status, favourite flag, or notes.
pub async fn update_book(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Json(patch): Json<EntryPatch>,
) -> Result<Json<MutationResponse>, (StatusCode, String)> {
    let owner = require_owner(&state).await?;

    let favourite_change = patch.favourite;

    let entry = match state.shelf.update(&owner, &id, patch).await {
        Ok(entry) => entry,
        Err(err) => {
            let response = shelf_error(err);
            if response.0 == StatusCode::NOT_FOUND {
                state.notifier.post("Book not found.").await;
            }
            return Err(response);
        }
    };

    let stats = recompute_stats(&state, &owner).await?;

    let message = match favourite_change {
        Some(true) => "Added to favourites!".to_string(),
        Some(false) => "Removed from favourites".to_string(),
        None => "Book updated successfully!".to_string(),
    };
    state.notifier.post(message).await;

    Ok(Json(MutationResponse { entry, stats }))
}

/// Remove an entry. Removing an already-removed id is 404, not a no-op.
pub async fn delete_book(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<RemovalResponse>, (StatusCode, String)> {
    let owner = require_owner(&state).await?;

    // Fetch first so the notice can name the title.
    let entry = match state.shelf.get(&owner, &id).await {
        Ok(entry) => entry,
        Err(err) => {
            let response = shelf_error(err);
            if response.0 == StatusCode::NOT_FOUND {
                state.notifier.post("Book not found.").await;
            }
            return Err(response);
        }
    };
    state.shelf.remove(&owner, &id).await.map_err(shelf_error)?;

    let stats = recompute_stats(&state, &owner).await?;

    state
        .notifier
        .post(format!("\"{}\" removed from library", entry.title))
        .await;

    Ok(Json(RemovalResponse { stats }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    use crate::api::ApiState;
    use crate::catalog::CatalogClient;
    use crate::library::Shelf;
    use crate::session::SessionManager;
    use crate::store::RecordStore;

    async fn state_with_login(dir: &std::path::Path, email: &str) -> Arc<ApiState> {
        let store = RecordStore::open(dir).unwrap();
        let shelf = Shelf::new(store.clone());
        let mut sessions = SessionManager::new(store);
        sessions.register("", email, "secret1").await.unwrap();
        Arc::new(ApiState::new(shelf, sessions, CatalogClient::new()))
    }

    #[tokio::test]
    async fn mutations_cannot_touch_another_owners_entry() {
        let dir = tempdir().unwrap();
        let state = state_with_login(dir.path(), "alice@example.com").await;

        let bobs = state
            .shelf
            .add(
                "bob@example.com",
                BookRecord {
                    external_id: "x1".to_string(),
                    title: "Dune".to_string(),
                    ..Default::default()
                },
                ReadingStatus::ToRead,
            )
            .await
            .unwrap();

        let result = update_book(
            State(state.clone()),
            Path(bobs.id.clone()),
            Json(EntryPatch {
                notes: Some("mine now".to_string()),
                ..Default::default()
            }),
        )
        .await;
        assert_eq!(
            result.err().map(|(status, _)| status),
            Some(StatusCode::NOT_FOUND)
        );

        let result = delete_book(State(state.clone()), Path(bobs.id.clone())).await;
        assert_eq!(
            result.err().map(|(status, _)| status),
            Some(StatusCode::NOT_FOUND)
        );

        // Bob's entry survives untouched.
        let entry = state.shelf.get("bob@example.com", &bobs.id).await.unwrap();
        assert_eq!(entry.notes, "");
    }
}
