//! Node Data Structures
//!
//! This module defines the core `Node` struct: one archival description unit
//! (fonds, series, sub-series, box, item) in the record hierarchy.
//!
//! # Architecture
//!
//! - **Flat rows, not pointers**: the hierarchy lives in the `parent_id`
//!   column; no in-memory pointer tree is ever materialized across requests.
//! - **Forest invariant**: a node can never be its own ancestor. The services
//!   layer enforces this with bounded ancestor walks.
//! - **Sibling uniqueness**: `(ref_code, parent_id)` is unique among siblings,
//!   including among top nodes.
//!
//! # Examples
//!
//! ```rust
//! use archcore::models::{levels, Node};
//!
//! // A top node (a fonds)
//! let fonds = Node::new(
//!     "Municipal council records".to_string(),
//!     None,
//!     Some(levels::FONDS.to_string()),
//! );
//! assert!(fonds.is_top_node());
//!
//! // A child defaults to the most granular level
//! let child = Node::new("Minutes 1921".to_string(), Some(fonds.id.clone()), None);
//! assert_eq!(child.level_of_description, levels::DEFAULT_LEVEL_OF_DESCRIPTION);
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known levels of description.
///
/// The level is an open string (repositories add their own), but these are the
/// values the system itself knows about, and `DEFAULT_LEVEL_OF_DESCRIPTION`
/// is the documented creation default: the most granular physical level.
pub mod levels {
    pub const FONDS: &str = "fonds";
    pub const SERIES: &str = "series";
    pub const SUB_SERIES: &str = "sub-series";
    pub const BOX: &str = "box";
    pub const ITEM: &str = "item";

    /// Level assigned when a node is created without an explicit level.
    pub const DEFAULT_LEVEL_OF_DESCRIPTION: &str = BOX;
}

/// One archival description unit in the hierarchy.
///
/// # Fields
///
/// - `id`: surrogate identifier (UUID string), stable for the record's lifetime
/// - `ref_code`: reference code, unique among siblings but not globally
/// - `level_of_description`: archival granularity label (see [`levels`])
/// - `title`: descriptive title
/// - `date_start` / `date_end`: optional covering dates
/// - `extent` / `archival_history`: optional free-text descriptive fields
/// - `parent_id`: parent node, `None` only for a top node
/// - `created_at` / `modified_at`: row timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,

    /// Reference code; generated (UUID v4) at creation, editable afterwards.
    pub ref_code: String,

    /// Archival granularity label (open string, see [`levels`]).
    pub level_of_description: String,

    pub title: String,

    pub date_start: Option<NaiveDate>,

    pub date_end: Option<NaiveDate>,

    /// Extent and medium of the unit (free text).
    pub extent: Option<String>,

    /// Custodial/archival history (free text).
    pub archival_history: Option<String>,

    /// Parent node id; `None` marks a top node.
    pub parent_id: Option<String>,

    pub created_at: DateTime<Utc>,

    pub modified_at: DateTime<Utc>,
}

impl Node {
    /// Create a new Node with a generated id and reference code.
    ///
    /// The reference code is always engine-generated (UUID v4 string) so that
    /// freshly created siblings can never collide; callers rename it later via
    /// an edit if a human-meaningful code is wanted. The level of description
    /// defaults to [`levels::DEFAULT_LEVEL_OF_DESCRIPTION`] when unspecified.
    pub fn new(
        title: String,
        parent_id: Option<String>,
        level_of_description: Option<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            ref_code: Uuid::new_v4().to_string(),
            level_of_description: level_of_description
                .unwrap_or_else(|| levels::DEFAULT_LEVEL_OF_DESCRIPTION.to_string()),
            title,
            date_start: None,
            date_end: None,
            extent: None,
            archival_history: None,
            parent_id,
            created_at: now,
            modified_at: now,
        }
    }

    /// True iff this node has no parent (it is the root of one hierarchy tree).
    pub fn is_top_node(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Sparse field-level update for [`Node`].
///
/// `None` leaves a field untouched. For nullable fields the double option
/// distinguishes "don't change" (`None`) from "clear" (`Some(None)`).
///
/// There is deliberately no `parent_id` here: the edit contract cannot
/// reparent a node. Moving a subtree is not an operation this system exposes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    pub title: Option<String>,

    /// Direct reference-code edits are checked for sibling collisions.
    pub ref_code: Option<String>,

    pub level_of_description: Option<String>,

    pub date_start: Option<Option<NaiveDate>>,

    pub date_end: Option<Option<NaiveDate>>,

    pub extent: Option<Option<String>>,

    pub archival_history: Option<Option<String>>,
}

/// Outcome of a cascading node deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedSummary {
    /// Node rows removed: the node itself plus every descendant.
    pub deleted_count: u64,

    /// Top ancestor of the deleted node, captured before deletion so the
    /// caller can re-render the surviving tree. `None` when the deleted node
    /// was itself the top of its tree.
    pub top_ancestor_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_node_defaults_to_box_level() {
        let node = Node::new("Untitled".to_string(), None, None);
        assert_eq!(node.level_of_description, levels::BOX);
    }

    #[test]
    fn new_node_generates_distinct_ref_codes() {
        let a = Node::new("A".to_string(), None, None);
        let b = Node::new("B".to_string(), None, None);
        assert_ne!(a.ref_code, b.ref_code);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn top_node_predicate_follows_parent() {
        let top = Node::new("Top".to_string(), None, None);
        let child = Node::new("Child".to_string(), Some(top.id.clone()), None);
        assert!(top.is_top_node());
        assert!(!child.is_top_node());
    }
}
