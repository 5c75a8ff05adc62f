//! Archcore - Archival Records Hierarchy Core
//!
//! This crate provides the record store, hierarchy engine, association
//! manager, and tree-delivery operation surface for an archival records
//! management system.
//!
//! # Architecture
//!
//! - **Flat relational hierarchy**: nodes are rows with a nullable, indexed
//!   `parent_id`; structure is re-derived per call, never cached in memory
//! - **libsql/SQLite**: embedded database with WAL mode and foreign keys
//! - **Stateless delivery**: clients materialize the tree lazily, one level
//!   at a time; the engine holds no session over the tree
//!
//! # Modules
//!
//! - [`models`] - data structures (Node, Agent, tree views, pages)
//! - [`db`] - database layer: connection, schema, `RecordStore` trait
//! - [`services`] - hierarchy engine, associations, agents, tree delivery

pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use db::*;
pub use models::*;
pub use services::*;
