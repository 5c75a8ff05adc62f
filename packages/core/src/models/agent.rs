//! Agent Data Structures
//!
//! Agents are named actors (persons, organizations, families) linked to
//! description nodes through a typed association table. An agent is never
//! owned by a node: the link table carries shared references with independent
//! lifetimes, and cascade cleanup only removes the links, never the agent.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known agent types. Open strings, like levels of description.
pub mod agent_types {
    pub const PERSON: &str = "person";
    pub const ORGANIZATION: &str = "organization";
    pub const FAMILY: &str = "family";
}

/// A named actor independent of the record hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,

    /// Kind of actor (see [`agent_types`]).
    pub agent_type: String,

    pub name: String,

    pub description: Option<String>,

    pub date_start: Option<NaiveDate>,

    pub date_end: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,
}

impl Agent {
    /// Create a new Agent with a generated id.
    pub fn new(agent_type: String, name: String, description: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            agent_type,
            name,
            description,
            date_start: None,
            date_end: None,
            created_at: Utc::now(),
        }
    }
}

/// A typed external identifier value owned by an agent (e.g. VIAF, ORCID).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    pub id: String,

    pub identifier_type: String,

    pub value: String,

    pub agent_id: String,
}

impl Identifier {
    pub fn new(agent_id: String, identifier_type: String, value: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            identifier_type,
            value,
            agent_id,
        }
    }
}

/// An agent together with the relation label of its link to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentLink {
    pub agent: Agent,
    pub association_type: String,
}
