//! Database Layer
//!
//! This module handles all persistence using libsql (embedded SQLite):
//!
//! - Connection management and idempotent schema initialization
//! - The `RecordStore` trait separating services from SQL
//! - The `SqliteStore` implementation with row conversion and transactions
//!
//! The hierarchy is re-derived per call from the indexed `parent_id` column,
//! never cached across requests.

mod database;
mod error;
mod record_store;
mod sqlite_store;

pub use database::DatabaseService;
pub use error::DatabaseError;
pub use record_store::{AssociationRow, RecordStore};
pub use sqlite_store::SqliteStore;
