//! The library shelf: a user's owned book entries.
//!
//! All operations are scoped by the owner's normalized email: an entry id
//! belonging to another owner is indistinguishable from a missing one. The
//! shelf deliberately does not deduplicate: adding the same catalog book
//! twice produces two independent entries, and deleting an already-removed
//! entry surfaces [`ShelfError::NotFound`] rather than silently succeeding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::catalog::BookRecord;
use crate::session::normalize_email;
use crate::store::{Record, RecordStore, StoreError};

/// Errors from shelf operations.
#[derive(Debug, Error)]
pub enum ShelfError {
    #[error("Book entry not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ShelfError>;

/// Where a book sits in the reading lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadingStatus {
    /// On the pile, not started.
    #[default]
    ToRead,

    /// Currently being read.
    Reading,

    /// Read to the end.
    Finished,
}

impl std::fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ReadingStatus::ToRead => "to-read",
            ReadingStatus::Reading => "reading",
            ReadingStatus::Finished => "finished",
        };
        f.write_str(label)
    }
}

/// A user's relationship to one catalog book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookEntry {
    /// Store-assigned unique id.
    pub id: String,

    /// Catalog-provider id. Not unique here: several users (or duplicate
    /// adds) may reference the same catalog book.
    pub external_id: String,

    /// Normalized email of the owning user. Every query is scoped by it.
    pub owner_email: String,

    pub title: String,

    pub authors: Vec<String>,

    pub thumbnail: Option<String>,

    pub description: String,

    pub published_date: String,

    pub page_count: u32,

    /// Reading lifecycle position.
    pub status: ReadingStatus,

    pub favourite: bool,

    /// Free-text notes.
    pub notes: String,

    /// Set once at creation, immutable thereafter.
    pub added_at: DateTime<Utc>,
}

impl Record for BookEntry {
    const KIND: &'static str = "books";

    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Predicates for shelf listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShelfFilter {
    pub status: Option<ReadingStatus>,
    pub favourite: Option<bool>,
}

impl ShelfFilter {
    fn matches(&self, entry: &BookEntry) -> bool {
        if let Some(status) = self.status {
            if entry.status != status {
                return false;
            }
        }
        if let Some(favourite) = self.favourite {
            if entry.favourite != favourite {
                return false;
            }
        }
        true
    }
}

/// Partial patch applied by [`Shelf::update`].
///
/// Only the reading status, favourite flag, and notes are mutable after
/// creation; `added_at`, ownership, and descriptive metadata are not.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryPatch {
    pub status: Option<ReadingStatus>,
    pub favourite: Option<bool>,
    pub notes: Option<String>,
}

/// Owner-scoped CRUD over [`BookEntry`] records.
///
/// The shelf never pushes notifications or recomputes stats itself; callers
/// do both after a mutation commits.
#[derive(Debug, Clone)]
pub struct Shelf {
    store: RecordStore,
}

impl Shelf {
    /// Create a shelf over an open record store.
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// List an owner's entries, newest first, optionally filtered.
    pub async fn list_by_owner(&self, email: &str, filter: ShelfFilter) -> Result<Vec<BookEntry>> {
        let owner = normalize_email(email);

        let mut entries: Vec<BookEntry> = self
            .store
            .list::<BookEntry>()
            .await?
            .into_iter()
            .filter(|e| e.owner_email == owner && filter.matches(e))
            .collect();

        entries.sort_by(|a, b| b.added_at.cmp(&a.added_at));

        Ok(entries)
    }

    /// The owner's most recently added entries.
    pub async fn recent(&self, email: &str, limit: usize) -> Result<Vec<BookEntry>> {
        let mut entries = self.list_by_owner(email, ShelfFilter::default()).await?;
        entries.truncate(limit);
        Ok(entries)
    }

    /// Add a catalog record to an owner's shelf.
    ///
    /// No dedup check: the same catalog book can be added twice and both
    /// entries live independently.
    pub async fn add(
        &self,
        email: &str,
        record: BookRecord,
        initial_status: ReadingStatus,
    ) -> Result<BookEntry> {
        let authors = if record.authors.is_empty() {
            vec!["Unknown Author".to_string()]
        } else {
            record.authors
        };

        let entry = BookEntry {
            id: uuid::Uuid::new_v4().to_string(),
            external_id: record.external_id,
            owner_email: normalize_email(email),
            title: record.title,
            authors,
            thumbnail: record.thumbnail,
            description: record.description,
            published_date: record.published_date,
            page_count: record.page_count,
            status: initial_status,
            favourite: false,
            notes: String::new(),
            added_at: Utc::now(),
        };

        self.store.put(&entry).await?;

        debug!(id = %entry.id, title = %entry.title, owner = %entry.owner_email, "Added book entry");

        Ok(entry)
    }

    /// Fetch one of the owner's entries by id.
    ///
    /// An id owned by someone else reports [`ShelfError::NotFound`], the
    /// same as a missing id: entry ids are not enumerable across owners.
    pub async fn get(&self, email: &str, id: &str) -> Result<BookEntry> {
        let owner = normalize_email(email);
        self.store
            .get::<BookEntry>(id)
            .await?
            .filter(|e| e.owner_email == owner)
            .ok_or_else(|| ShelfError::NotFound(id.to_string()))
    }

    /// Apply a partial patch to the mutable fields of an owner's entry.
    pub async fn update(&self, email: &str, id: &str, patch: EntryPatch) -> Result<BookEntry> {
        let mut entry = self.get(email, id).await?;

        if let Some(status) = patch.status {
            entry.status = status;
        }
        if let Some(favourite) = patch.favourite {
            entry.favourite = favourite;
        }
        if let Some(notes) = patch.notes {
            entry.notes = notes;
        }

        self.store.put(&entry).await?;

        debug!(id = %id, status = %entry.status, favourite = entry.favourite, "Updated book entry");

        Ok(entry)
    }

    /// Delete one of the owner's entries. A second delete of the same id is
    /// an error, not a silent no-op.
    pub async fn remove(&self, email: &str, id: &str) -> Result<()> {
        // Ownership check first; the raw store is not owner-aware.
        self.get(email, id).await?;

        if !self.store.delete::<BookEntry>(id).await? {
            return Err(ShelfError::NotFound(id.to_string()));
        }

        debug!(id = %id, "Removed book entry");

        Ok(())
    }
}
