//! Association Service - Non-Hierarchical Links
//!
//! Manages the two typed many-to-many link tables: related-record links
//! between nodes, and agent-to-node links. Links are directed, carry a
//! free-form relation label, and are idempotent per (source, target, type)
//! triple. They are not subject to the forest invariant.
//!
//! Referential integrity is enforced by cascade: deleting either endpoint
//! removes every link touching it in the same transaction (see
//! `RecordStore::delete_subtree` / `delete_agent`), so a link can never
//! outlive a node or agent.

use crate::db::RecordStore;
use crate::models::{AgentLink, Node};
use crate::services::error::ServiceError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A node together with the relation label of a link to or from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedNode {
    pub node: Node,
    pub association_type: String,
}

/// Business logic for the two association tables.
pub struct AssociationService {
    store: Arc<dyn RecordStore>,
}

impl AssociationService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    async fn require_node(&self, id: &str) -> Result<Node, ServiceError> {
        self.store
            .get_node(id)
            .await?
            .ok_or_else(|| ServiceError::node_not_found(id))
    }

    /// Create a typed, directed link between two nodes.
    ///
    /// Idempotent: creating the same (source, target, type) triple twice
    /// leaves a single row. Both endpoints must resolve.
    pub async fn relate(
        &self,
        source_id: &str,
        target_id: &str,
        association_type: &str,
    ) -> Result<(), ServiceError> {
        self.require_node(source_id).await?;
        self.require_node(target_id).await?;

        self.store
            .create_association(source_id, target_id, association_type)
            .await?;
        tracing::debug!(source = %source_id, target = %target_id, label = %association_type, "related nodes");
        Ok(())
    }

    /// Remove a typed link. Removing a link that does not exist succeeds.
    pub async fn unrelate(
        &self,
        source_id: &str,
        target_id: &str,
        association_type: &str,
    ) -> Result<(), ServiceError> {
        self.store
            .delete_association(source_id, target_id, association_type)
            .await?;
        Ok(())
    }

    /// Nodes this node links to (outgoing), with relation labels.
    pub async fn related_nodes(&self, node_id: &str) -> Result<Vec<RelatedNode>, ServiceError> {
        self.require_node(node_id).await?;

        let rows = self.store.outgoing_associations(node_id).await?;
        let mut related = Vec::with_capacity(rows.len());
        for row in rows {
            // Cascade keeps links and rows consistent, so the target resolves
            let node = self.require_node(&row.child_id).await?;
            related.push(RelatedNode {
                node,
                association_type: row.association_type,
            });
        }
        Ok(related)
    }

    /// Nodes linking to this node (incoming), with relation labels.
    pub async fn referencing_nodes(
        &self,
        node_id: &str,
    ) -> Result<Vec<RelatedNode>, ServiceError> {
        self.require_node(node_id).await?;

        let rows = self.store.incoming_associations(node_id).await?;
        let mut referencing = Vec::with_capacity(rows.len());
        for row in rows {
            let node = self.require_node(&row.parent_id).await?;
            referencing.push(RelatedNode {
                node,
                association_type: row.association_type,
            });
        }
        Ok(referencing)
    }

    /// Link an agent to a node with a typed relation. Idempotent per triple.
    pub async fn link_agent(
        &self,
        agent_id: &str,
        node_id: &str,
        association_type: &str,
    ) -> Result<(), ServiceError> {
        self.store
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| ServiceError::agent_not_found(agent_id))?;
        self.require_node(node_id).await?;

        self.store
            .link_agent(agent_id, node_id, association_type)
            .await?;
        tracing::debug!(agent = %agent_id, node = %node_id, label = %association_type, "linked agent");
        Ok(())
    }

    /// Remove an agent-node link. Removing a missing link succeeds.
    pub async fn unlink_agent(
        &self,
        agent_id: &str,
        node_id: &str,
        association_type: &str,
    ) -> Result<(), ServiceError> {
        self.store
            .unlink_agent(agent_id, node_id, association_type)
            .await?;
        Ok(())
    }

    /// Agents linked to a node, with relation labels.
    pub async fn node_agents(&self, node_id: &str) -> Result<Vec<AgentLink>, ServiceError> {
        self.require_node(node_id).await?;

        let linked = self.store.agents_for_node(node_id).await?;
        Ok(linked
            .into_iter()
            .map(|(agent, association_type)| AgentLink {
                agent,
                association_type,
            })
            .collect())
    }

    /// Nodes linked to an agent, with relation labels.
    pub async fn agent_nodes(&self, agent_id: &str) -> Result<Vec<RelatedNode>, ServiceError> {
        self.store
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| ServiceError::agent_not_found(agent_id))?;

        let linked = self.store.nodes_for_agent(agent_id).await?;
        Ok(linked
            .into_iter()
            .map(|(node, association_type)| RelatedNode {
                node,
                association_type,
            })
            .collect())
    }
}
