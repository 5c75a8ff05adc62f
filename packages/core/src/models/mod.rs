//! Data Models
//!
//! This module contains the core data structures of the archival records core:
//!
//! - `Node` - one archival description unit in the hierarchy
//! - `Agent` / `Identifier` - actors linked to nodes, never owned by them
//! - Tree view shapes (`TreeView`, `NodeTree`, `Page`) returned by reads
//!
//! The hierarchy itself is never held as an in-memory pointer tree; every
//! structure here is re-derived per call from the indexed `parent_id` column.

mod agent;
mod node;
mod tree;

pub use agent::{agent_types, Agent, AgentLink, Identifier};
pub use node::{levels, DeletedSummary, Node, NodeUpdate};
pub use tree::{NodeTree, Page, SubtreeDepth, SubtreeView, TreeView};
