//! Storage layer for bookshelf.
//!
//! Rows live in memory inside a [`Table`], keyed by an autoincrement integer
//! id. A table opened with a snapshot path rewrites a JSON snapshot of itself
//! after every mutation so data survives restarts.

pub mod error;
pub mod table;

pub use error::DbError;
pub use table::{Record, Table};
