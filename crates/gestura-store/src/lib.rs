//! Gestura Store — SQLite repository for samples, trained models and action bindings.

pub mod schema;
pub mod sqlite;
pub mod types;

pub use sqlite::SqliteStore;
pub use types::*;
