//! RecordStore Trait - Database Abstraction Layer
//!
//! This trait sits between the services (hierarchy, associations, agents) and
//! the SQL implementation. Everything above it operates on model types and
//! never sees a row or a connection; everything below it is SQL.
//!
//! # Design Decisions
//!
//! 1. **Async-first**: all methods are async; the embedded backend still does
//!    blocking-style I/O per request, which is the intended concurrency model
//!    (one worker, one transaction, no server-side tree state between calls).
//! 2. **Typed errors**: methods return `DatabaseError`; business-rule errors
//!    (not found, duplicate sibling, corrupt hierarchy) are decided above this
//!    layer where the context to name them exists.
//! 3. **No lazy collections**: children, siblings, and links are explicit
//!    query methods, re-read from the store on every call.

use crate::db::error::DatabaseError;
use crate::models::{Agent, Identifier, Node, NodeUpdate};
use async_trait::async_trait;

/// A typed, directed link row between two nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationRow {
    pub parent_id: String,
    pub child_id: String,
    pub association_type: String,
}

/// Abstraction layer for record persistence.
///
/// Implementations must be `Send + Sync`; futures may be moved between
/// threads by the async runtime.
#[async_trait]
pub trait RecordStore: Send + Sync {
    //
    // NODE ROWS
    //

    /// Insert a node row. The caller owns id and ref_code generation.
    ///
    /// Fails with [`DatabaseError::UniqueViolation`] if `(ref_code, parent)`
    /// collides with an existing sibling.
    async fn create_node(&self, node: Node) -> Result<Node, DatabaseError>;

    /// Point lookup by id. `Ok(None)` when the row does not exist.
    async fn get_node(&self, id: &str) -> Result<Option<Node>, DatabaseError>;

    /// Apply a sparse update and return the full updated row.
    ///
    /// `None` fields keep their current value; for nullable columns the inner
    /// `Option` distinguishes "set" from "clear". Errors if the row is gone.
    async fn update_node(&self, id: &str, update: NodeUpdate) -> Result<Node, DatabaseError>;

    /// Delete the subtree rooted at `id` in one transaction.
    ///
    /// Collects the descendant set (cycle-safe walk over `parent_id`),
    /// removes every association row touching a collected id,
    /// then removes the node rows. All-or-nothing: any failure rolls the
    /// transaction back. Returns the number of node rows removed.
    async fn delete_subtree(&self, id: &str) -> Result<u64, DatabaseError>;

    /// Immediate children of `parent_id`, in stable creation order.
    /// `None` selects the top nodes.
    async fn get_children(&self, parent_id: Option<&str>) -> Result<Vec<Node>, DatabaseError>;

    /// Top nodes in stable creation order, one page at a time.
    async fn list_roots(&self, limit: u32, offset: u32) -> Result<Vec<Node>, DatabaseError>;

    /// Total number of node rows. Used as the ancestor-walk safety bound.
    async fn count_nodes(&self) -> Result<u64, DatabaseError>;

    /// Whether another node with `ref_code` already sits under `parent_id`
    /// (both `None` meaning "among the top nodes"), excluding `exclude_id`.
    async fn sibling_ref_code_exists(
        &self,
        ref_code: &str,
        parent_id: Option<&str>,
        exclude_id: Option<&str>,
    ) -> Result<bool, DatabaseError>;

    //
    // NODE-TO-NODE ASSOCIATIONS
    //

    /// Insert a typed link; idempotent per (source, target, type) triple.
    async fn create_association(
        &self,
        source_id: &str,
        target_id: &str,
        association_type: &str,
    ) -> Result<(), DatabaseError>;

    /// Remove a typed link; removing a missing link succeeds.
    async fn delete_association(
        &self,
        source_id: &str,
        target_id: &str,
        association_type: &str,
    ) -> Result<(), DatabaseError>;

    /// Links where `node_id` is the source.
    async fn outgoing_associations(
        &self,
        node_id: &str,
    ) -> Result<Vec<AssociationRow>, DatabaseError>;

    /// Links where `node_id` is the target.
    async fn incoming_associations(
        &self,
        node_id: &str,
    ) -> Result<Vec<AssociationRow>, DatabaseError>;

    //
    // AGENTS
    //

    async fn create_agent(&self, agent: Agent) -> Result<Agent, DatabaseError>;

    async fn get_agent(&self, id: &str) -> Result<Option<Agent>, DatabaseError>;

    /// Delete an agent, its identifiers, and its node links in one
    /// transaction. Returns the number of agent rows removed (0 or 1).
    async fn delete_agent(&self, id: &str) -> Result<u64, DatabaseError>;

    async fn create_identifier(
        &self,
        identifier: Identifier,
    ) -> Result<Identifier, DatabaseError>;

    async fn get_identifiers(&self, agent_id: &str) -> Result<Vec<Identifier>, DatabaseError>;

    /// Insert a typed agent-node link; idempotent per triple.
    async fn link_agent(
        &self,
        agent_id: &str,
        node_id: &str,
        association_type: &str,
    ) -> Result<(), DatabaseError>;

    /// Remove a typed agent-node link; removing a missing link succeeds.
    async fn unlink_agent(
        &self,
        agent_id: &str,
        node_id: &str,
        association_type: &str,
    ) -> Result<(), DatabaseError>;

    /// Agents linked to a node, with the relation label.
    async fn agents_for_node(
        &self,
        node_id: &str,
    ) -> Result<Vec<(Agent, String)>, DatabaseError>;

    /// Nodes linked to an agent, with the relation label.
    async fn nodes_for_agent(
        &self,
        agent_id: &str,
    ) -> Result<Vec<(Node, String)>, DatabaseError>;
}
