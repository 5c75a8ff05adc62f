//! Tree View Structures
//!
//! Shapes returned by subtree reads. Two modes exist and they are not
//! interchangeable: the one-level view backs the lazy tree-delivery protocol
//! (a node plus only its direct children, grandchildren never included), and
//! the full view recursively materializes an entire subtree for small-tree
//! export. The full view is expensive and must never back interactive paging.

use crate::models::Node;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How deep a subtree read materializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubtreeDepth {
    /// The node plus its direct children only.
    OneLevel,
    /// The entire subtree, recursively. Export use only.
    Full,
}

/// One-level view: a node and its immediate children, fully hydrated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeView {
    pub node: Node,
    pub children: Vec<Node>,
}

/// Recursive export shape: id, title, creation time, children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTree {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub children: Vec<NodeTree>,
}

/// Result of a subtree read, shaped by the requested [`SubtreeDepth`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubtreeView {
    OneLevel(TreeView),
    Full(NodeTree),
}

/// One page of a stable-ordered listing.
///
/// Pages are 1-based; `page_size` is chosen by the caller per call site (the
/// engine only requires it to be at least 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> Page<T> {
    /// 1-based number of the next page, if any.
    pub fn next_page(&self) -> Option<u32> {
        self.has_next.then(|| self.page + 1)
    }

    /// 1-based number of the previous page, if any.
    pub fn prev_page(&self) -> Option<u32> {
        self.has_prev.then(|| self.page - 1)
    }
}
