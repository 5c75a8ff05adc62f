//! Hierarchy Service - Core Tree Operations
//!
//! This module is the business logic layer for the description hierarchy:
//!
//! - CRUD operations (create, read, edit, cascading delete)
//! - Traversals (top node, ancestor chain, siblings, subtree)
//! - Paginated top-node listing
//!
//! # Structural invariants
//!
//! - The parent relation forms a forest; a node is never its own ancestor.
//! - `(ref_code, parent_id)` is unique among siblings, top nodes included.
//! - `is_top_node()` holds iff `parent_id` is absent.
//!
//! Every traversal re-reads from the store; nothing is cached between calls.
//! Ancestor walks are bounded by the total node count, so a cyclic or dangling
//! parent chain (store corruption) surfaces as `CorruptHierarchy` instead of
//! an infinite loop.

use crate::db::{DatabaseError, RecordStore};
use crate::models::{
    DeletedSummary, Node, NodeTree, NodeUpdate, Page, SubtreeDepth, SubtreeView, TreeView,
};
use crate::services::error::ServiceError;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Parameters for creating a node.
///
/// The reference code is not a parameter: it is always engine-generated
/// (UUID v4), which is what makes sibling collisions unreachable on the
/// create path. The level of description defaults to the most granular
/// level (`box`) when unspecified.
#[derive(Debug, Clone, Default)]
pub struct CreateNodeParams {
    pub title: String,
    /// Parent node id; `None` creates a new top node.
    pub parent_id: Option<String>,
    /// Level of description; defaults to `levels::DEFAULT_LEVEL_OF_DESCRIPTION`.
    pub level_of_description: Option<String>,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub extent: Option<String>,
    pub archival_history: Option<String>,
}

/// Business logic for the description hierarchy.
pub struct HierarchyService {
    store: Arc<dyn RecordStore>,
}

impl HierarchyService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Create a node, as a new top node or as a child of `parent_id`.
    ///
    /// # Errors
    ///
    /// - `ParentNotFound` if `parent_id` is given but does not resolve
    pub async fn create_node(&self, params: CreateNodeParams) -> Result<Node, ServiceError> {
        if let Some(parent_id) = &params.parent_id {
            self.store
                .get_node(parent_id)
                .await?
                .ok_or_else(|| ServiceError::parent_not_found(parent_id.clone()))?;
        }

        let mut node = Node::new(
            params.title,
            params.parent_id,
            params.level_of_description,
        );
        node.date_start = params.date_start;
        node.date_end = params.date_end;
        node.extent = params.extent;
        node.archival_history = params.archival_history;

        let created = self.store.create_node(node).await?;
        tracing::debug!(id = %created.id, parent = ?created.parent_id, "created node");
        Ok(created)
    }

    /// Resolve a node by id.
    pub async fn get_node(&self, id: &str) -> Result<Node, ServiceError> {
        self.store
            .get_node(id)
            .await?
            .ok_or_else(|| ServiceError::node_not_found(id))
    }

    /// Apply field-level updates to a node.
    ///
    /// Reparenting is not part of the edit contract; `NodeUpdate` has no
    /// parent field. A reference-code edit that collides with a sibling is
    /// rejected with `DuplicateSibling`.
    pub async fn edit_node(&self, id: &str, update: NodeUpdate) -> Result<Node, ServiceError> {
        let current = self.get_node(id).await?;
        let requested_ref_code = update.ref_code.clone();

        if let Some(new_ref_code) = &requested_ref_code {
            if *new_ref_code != current.ref_code
                && self
                    .store
                    .sibling_ref_code_exists(new_ref_code, current.parent_id.as_deref(), Some(id))
                    .await?
            {
                return Err(ServiceError::duplicate_sibling(
                    new_ref_code.clone(),
                    current.parent_id.clone(),
                ));
            }
        }

        // The pre-check can race a concurrent write; the unique index is the
        // backstop and its violation still means a sibling collision
        let updated = match self.store.update_node(id, update).await {
            Ok(updated) => updated,
            Err(DatabaseError::UniqueViolation { .. }) => {
                return Err(ServiceError::duplicate_sibling(
                    requested_ref_code.unwrap_or(current.ref_code),
                    current.parent_id,
                ));
            }
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(id = %updated.id, "edited node");
        Ok(updated)
    }

    /// Delete a node, its whole subtree, and every association row touching a
    /// deleted id, in one transaction.
    ///
    /// The top ancestor is captured before deletion so the caller knows what
    /// is left to re-render; it is `None` when the deleted node was itself
    /// the top of its tree.
    pub async fn delete_node(&self, id: &str) -> Result<DeletedSummary, ServiceError> {
        let node = self.get_node(id).await?;

        let top_ancestor_id = if node.is_top_node() {
            None
        } else {
            Some(self.get_top_node(id).await?.id)
        };

        let deleted_count = self.store.delete_subtree(id).await?;
        tracing::info!(id = %id, deleted = deleted_count, "deleted subtree");

        Ok(DeletedSummary {
            deleted_count,
            top_ancestor_id,
        })
    }

    /// Walk `parent_id` upward until a node with no parent is reached.
    ///
    /// Runs in O(depth). The walk is bounded by the total node count; if the
    /// bound is exceeded, or a parent reference dangles, the store is corrupt
    /// and the request fails with `CorruptHierarchy`.
    pub async fn get_top_node(&self, id: &str) -> Result<Node, ServiceError> {
        let bound = self.store.count_nodes().await?;
        let mut current = self.get_node(id).await?;
        let mut steps: u64 = 0;

        while let Some(parent_id) = current.parent_id.clone() {
            steps += 1;
            if steps > bound {
                tracing::error!(id = %id, bound, "ancestor walk exceeded node count, hierarchy is corrupt");
                return Err(ServiceError::corrupt_hierarchy(id, bound));
            }
            current = match self.store.get_node(&parent_id).await? {
                Some(parent) => parent,
                None => {
                    tracing::error!(id = %id, parent_id = %parent_id, "dangling parent reference, hierarchy is corrupt");
                    return Err(ServiceError::corrupt_hierarchy(id, bound));
                }
            };
        }

        Ok(current)
    }

    /// All ancestors of a node, in root-to-immediate-parent order.
    ///
    /// The raw walk is leaf-to-root; the result is reversed before returning.
    pub async fn get_ancestor_chain(&self, id: &str) -> Result<Vec<Node>, ServiceError> {
        let bound = self.store.count_nodes().await?;
        let mut current = self.get_node(id).await?;
        let mut ancestors: Vec<Node> = Vec::new();

        while let Some(parent_id) = current.parent_id.clone() {
            if ancestors.len() as u64 >= bound {
                tracing::error!(id = %id, bound, "ancestor walk exceeded node count, hierarchy is corrupt");
                return Err(ServiceError::corrupt_hierarchy(id, bound));
            }
            current = match self.store.get_node(&parent_id).await? {
                Some(parent) => parent,
                None => {
                    tracing::error!(id = %id, parent_id = %parent_id, "dangling parent reference, hierarchy is corrupt");
                    return Err(ServiceError::corrupt_hierarchy(id, bound));
                }
            };
            ancestors.push(current.clone());
        }

        ancestors.reverse();
        Ok(ancestors)
    }

    /// All other children of the node's parent. Empty for a top node.
    pub async fn get_siblings(&self, id: &str) -> Result<Vec<Node>, ServiceError> {
        let node = self.get_node(id).await?;

        match node.parent_id.as_deref() {
            None => Ok(Vec::new()),
            Some(parent_id) => {
                let children = self.store.get_children(Some(parent_id)).await?;
                Ok(children.into_iter().filter(|c| c.id != id).collect())
            }
        }
    }

    /// The node plus only its direct children. Backs the lazy tree-delivery
    /// protocol; grandchildren are never included.
    pub async fn one_level_view(&self, id: &str) -> Result<TreeView, ServiceError> {
        let node = self.get_node(id).await?;
        let children = self.store.get_children(Some(id)).await?;
        Ok(TreeView { node, children })
    }

    /// Materialize a subtree.
    ///
    /// `OneLevel` is [`one_level_view`](Self::one_level_view) in the shared
    /// result shape. `Full` recursively materializes the whole subtree and is
    /// intended for small-tree export only, never interactive paging.
    pub async fn get_subtree(
        &self,
        id: &str,
        depth: SubtreeDepth,
    ) -> Result<SubtreeView, ServiceError> {
        match depth {
            SubtreeDepth::OneLevel => Ok(SubtreeView::OneLevel(self.one_level_view(id).await?)),
            SubtreeDepth::Full => {
                let node = self.get_node(id).await?;
                Ok(SubtreeView::Full(self.build_full_tree(node).await?))
            }
        }
    }

    /// Collects every child list in the subtree first, then assembles the
    /// tree synchronously. Collection carries a visited set: revisiting an id means the
    /// parent chain is cyclic, which is store corruption, not a valid tree.
    async fn build_full_tree(&self, root: Node) -> Result<NodeTree, ServiceError> {
        let bound = self.store.count_nodes().await?;
        let mut children_by_parent: HashMap<String, Vec<Node>> = HashMap::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: Vec<String> = vec![root.id.clone()];
        visited.insert(root.id.clone());

        while let Some(id) = queue.pop() {
            if visited.len() as u64 > bound {
                tracing::error!(id = %root.id, bound, "subtree walk exceeded node count, hierarchy is corrupt");
                return Err(ServiceError::corrupt_hierarchy(root.id.clone(), bound));
            }
            let children = self.store.get_children(Some(&id)).await?;
            for child in &children {
                if !visited.insert(child.id.clone()) {
                    tracing::error!(id = %child.id, "node reachable twice in subtree walk, hierarchy is corrupt");
                    return Err(ServiceError::corrupt_hierarchy(child.id.clone(), bound));
                }
                queue.push(child.id.clone());
            }
            children_by_parent.insert(id, children);
        }

        Ok(Self::assemble_tree(&root, &children_by_parent))
    }

    fn assemble_tree(node: &Node, children_by_parent: &HashMap<String, Vec<Node>>) -> NodeTree {
        let children = children_by_parent
            .get(&node.id)
            .map(|children| {
                children
                    .iter()
                    .map(|child| Self::assemble_tree(child, children_by_parent))
                    .collect()
            })
            .unwrap_or_default();

        NodeTree {
            id: node.id.clone(),
            title: node.title.clone(),
            created_at: node.created_at,
            children,
        }
    }

    /// Paginated, stable-ordered listing of all top nodes.
    ///
    /// Pages are 1-based; `page_size` is whatever the call site wants, as
    /// long as it is at least 1. One extra row is fetched to decide whether a
    /// next page exists without a count query.
    pub async fn list_roots(&self, page: u32, page_size: u32) -> Result<Page<Node>, ServiceError> {
        if page < 1 {
            return Err(ServiceError::invalid_pagination("page numbers are 1-based"));
        }
        if page_size < 1 {
            return Err(ServiceError::invalid_pagination("page_size must be >= 1"));
        }

        let offset = (page - 1) * page_size;
        let mut items = self.store.list_roots(page_size + 1, offset).await?;

        let has_next = items.len() as u32 > page_size;
        items.truncate(page_size as usize);

        Ok(Page {
            items,
            page,
            page_size,
            has_next,
            has_prev: page > 1,
        })
    }
}
