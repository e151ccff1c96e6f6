//! Thin adapter stubs for capabilities adjacent to user-memory but out of
//! this crate's scope: wall-clock time, chat mood, and web access.
//!
//! None of these are referenced by [`crate::memory`] — they exist only so a
//! host wiring this crate's binary can offer the same tool surface as the
//! original assistant plugin set they were distilled from.

pub mod chat_mood;
pub mod duckduckgo;
pub mod system_time;
pub mod visit_website;
mod web;

pub use web::{SearchResult, WebHost, WebLink, WebPayload};
