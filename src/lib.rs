//! Bookshelf - personal book tracking service.
//!
//! Users authenticate, search an external book catalog, and keep a shelf of
//! entries with a reading status, favourite flag, and notes. The daemon
//! exposes a REST API for the view layer and persists everything as JSON
//! records on disk.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      VIEW LAYER                           │
//! │  Talks only to the REST API (api module)                  │
//! └──────────────────────────────┬────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┴────────────────────────────┐
//! │                      BOOKSHELF CORE                        │
//! │  session  - who is logged in (one session per process)    │
//! │  library  - owner-scoped shelf of book entries            │
//! │  stats    - derived finished/reading/total counts         │
//! │  notify   - single-slot, self-expiring notices            │
//! │  catalog  - external search, normalized to BookRecord     │
//! └──────────────────────────────┬────────────────────────────┘
//!                                │
//! ┌──────────────────────────────┴────────────────────────────┐
//! │                      RECORD STORE                          │
//! │  One JSON document per record, atomic writes               │
//! └───────────────────────────────────────────────────────────┘
//! ```

// === Core Modules ===

/// Persistent record store.
pub mod store;

/// Catalog search and normalization.
pub mod catalog;

/// The library shelf: owner-scoped book entries.
pub mod library;

/// Derived reading statistics.
pub mod stats;

/// Identity and session management.
pub mod session;

/// Ephemeral user notifications.
pub mod notify;

/// REST API.
pub mod api;

// === Re-exports ===

pub use catalog::{normalize, BookRecord, CatalogClient, CatalogError};
pub use library::{BookEntry, EntryPatch, ReadingStatus, Shelf, ShelfError, ShelfFilter};
pub use notify::Notifier;
pub use session::{normalize_email, AuthError, SessionManager, User};
pub use stats::{compute, ReadingStats};
pub use store::{Record, RecordStore, StoreError};
