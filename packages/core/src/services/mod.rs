//! Business Services
//!
//! - [`HierarchyService`] - tree CRUD, traversals, paginated root listing
//! - [`AssociationService`] - typed node-to-node and agent-to-node links
//! - [`AgentService`] - actor registry with external identifiers
//! - [`TreeDelivery`] - the lazy tree-loading operation surface

mod agent_service;
mod association_service;
mod error;
mod hierarchy_service;
mod tree_delivery;

pub use agent_service::{AgentService, CreateAgentParams};
pub use association_service::{AssociationService, RelatedNode};
pub use error::ServiceError;
pub use hierarchy_service::{CreateNodeParams, HierarchyService};
pub use tree_delivery::{CreatedNode, RootListing, TreeDelivery};
