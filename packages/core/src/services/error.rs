//! Service Layer Error Types
//!
//! This module defines the error taxonomy surfaced to callers of the
//! hierarchy engine, association manager, and tree delivery layer. All of
//! these are boundary errors: they are returned typed, never swallowed and
//! never used as internal control flow.

use crate::db::DatabaseError;
use thiserror::Error;

/// Service operation errors
#[derive(Error, Debug)]
pub enum ServiceError {
    /// An id passed to a lookup or mutation does not resolve to a live row
    #[error("Node not found: {id}")]
    NodeNotFound { id: String },

    /// An agent id does not resolve to a live row
    #[error("Agent not found: {id}")]
    AgentNotFound { id: String },

    /// create_node named a parent that does not exist
    #[error("Parent node not found: {parent_id}")]
    ParentNotFound { parent_id: String },

    /// A write would give two siblings the same reference code
    #[error("Duplicate reference code '{ref_code}' under parent {parent_id:?}")]
    DuplicateSibling {
        ref_code: String,
        parent_id: Option<String>,
    },

    /// An ancestor walk exceeded the safety bound: a cycle or dangling parent
    /// reference exists in the store. Fatal for the request, never retried.
    #[error("Corrupt hierarchy: ancestor walk from {id} exceeded {bound} steps")]
    CorruptHierarchy { id: String, bound: u64 },

    /// Pagination arguments outside the contract (1-based page, page_size >= 1)
    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    /// Database operation failed; transaction failures from the store
    /// surface through here, already rolled back
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),
}

impl ServiceError {
    /// Create a node not found error
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    /// Create an agent not found error
    pub fn agent_not_found(id: impl Into<String>) -> Self {
        Self::AgentNotFound { id: id.into() }
    }

    /// Create a parent not found error
    pub fn parent_not_found(parent_id: impl Into<String>) -> Self {
        Self::ParentNotFound {
            parent_id: parent_id.into(),
        }
    }

    /// Create a duplicate sibling error
    pub fn duplicate_sibling(ref_code: impl Into<String>, parent_id: Option<String>) -> Self {
        Self::DuplicateSibling {
            ref_code: ref_code.into(),
            parent_id,
        }
    }

    /// Create a corrupt hierarchy error
    pub fn corrupt_hierarchy(id: impl Into<String>, bound: u64) -> Self {
        Self::CorruptHierarchy {
            id: id.into(),
            bound,
        }
    }

    /// Create an invalid pagination error
    pub fn invalid_pagination(msg: impl Into<String>) -> Self {
        Self::InvalidPagination(msg.into())
    }
}
