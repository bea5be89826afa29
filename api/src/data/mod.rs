//! Repositories over a single SQLite connection.
//!
//! Each repository borrows a connection for the duration of one unit of work
//! and returns plain `rusqlite` results; handlers decide how failures map to
//! HTTP statuses.

pub mod comment;
pub mod file;
pub mod like;
pub mod notice;
pub mod user;

/// Converts a 1-based page number into a SQL offset. Pages past the end
/// saturate to an offset that yields no rows.
pub fn page_offset(page: i64, per_page: i64) -> i64 {
    (page.max(1) - 1).saturating_mul(per_page)
}
