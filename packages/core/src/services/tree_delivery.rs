//! Tree Delivery - Lazy Tree-Loading Operation Surface
//!
//! The request/response contract a consumer (web route layer, API client)
//! uses to progressively materialize a very large hierarchy without ever
//! fetching the whole thing:
//!
//! 1. Fetch the paginated top-node listing.
//! 2. Pick a root and fetch its detail plus first-level children.
//! 3. For any displayed child, independently fetch that child's children -
//!    recursive on demand, never pre-fetched.
//! 4. Node detail and children list are two separate fetches, so editing
//!    fields never forces a subtree re-fetch and vice versa.
//! 5. An "expand full ancestry" request re-roots the display at the top of
//!    the hierarchy containing the requested node.
//!
//! The engine is stateless between calls; collapse/expand state lives
//! entirely in the client.

use crate::models::{DeletedSummary, Node, NodeUpdate, TreeView};
use crate::services::error::ServiceError;
use crate::services::hierarchy_service::{CreateNodeParams, HierarchyService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One page of top nodes with 1-based next/prev page markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootListing {
    pub nodes: Vec<Node>,
    pub page: u32,
    pub next_page: Option<u32>,
    pub prev_page: Option<u32>,
}

/// A freshly created node plus the redirect signal for the caller: a new
/// top node has no surrounding tree to re-render, so the caller should
/// navigate to its detail view instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedNode {
    pub node: Node,
    pub is_new_root: bool,
}

/// The operation surface consumed by the (out-of-scope) route layer.
pub struct TreeDelivery {
    hierarchy: Arc<HierarchyService>,
}

impl TreeDelivery {
    pub fn new(hierarchy: Arc<HierarchyService>) -> Self {
        Self { hierarchy }
    }

    /// Paginated top-node browse view.
    pub async fn list_roots(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<RootListing, ServiceError> {
        let page = self.hierarchy.list_roots(page, page_size).await?;

        Ok(RootListing {
            next_page: page.next_page(),
            prev_page: page.prev_page(),
            page: page.page,
            nodes: page.items,
        })
    }

    /// Node detail view. Independent of the children fetch by design.
    pub async fn node_detail(&self, id: &str) -> Result<Node, ServiceError> {
        self.hierarchy.get_node(id).await
    }

    /// Immediate children of a node, in stable order. Never grandchildren.
    pub async fn node_children(&self, id: &str) -> Result<Vec<Node>, ServiceError> {
        Ok(self.hierarchy.one_level_view(id).await?.children)
    }

    /// One-level view of a node; with `full_tree` set, of the top ancestor of
    /// the node's hierarchy instead, letting the client re-root its display.
    pub async fn expand_node(&self, id: &str, full_tree: bool) -> Result<TreeView, ServiceError> {
        let node = self.hierarchy.get_node(id).await?;

        let target_id = if full_tree && !node.is_top_node() {
            self.hierarchy.get_top_node(id).await?.id
        } else {
            node.id
        };

        self.hierarchy.one_level_view(&target_id).await
    }

    /// Create a node; the result tells the caller whether to redirect to a
    /// brand-new root or refresh the parent's children in place.
    pub async fn create_node(
        &self,
        params: CreateNodeParams,
    ) -> Result<CreatedNode, ServiceError> {
        let node = self.hierarchy.create_node(params).await?;
        let is_new_root = node.is_top_node();
        Ok(CreatedNode { node, is_new_root })
    }

    /// Edit node fields. The children list is untouched; clients keep their
    /// expanded subtree and refresh only the detail panel.
    pub async fn edit_node(&self, id: &str, update: NodeUpdate) -> Result<Node, ServiceError> {
        self.hierarchy.edit_node(id, update).await
    }

    /// Delete a node and its subtree. The summary carries the surviving top
    /// ancestor (if any) so the caller knows where to re-root the display.
    pub async fn delete_node(&self, id: &str) -> Result<DeletedSummary, ServiceError> {
        self.hierarchy.delete_node(id).await
    }
}
