//! API request handlers.

pub mod auth;
pub mod books;
pub mod covers;
pub mod notice;
pub mod search;
pub mod status;
