//! Agent Service - Actor Registry
//!
//! Agents (persons, organizations, families) live outside the hierarchy and
//! are linked to nodes through the association layer. Deleting an agent
//! removes its identifiers and its node links in one transaction; it never
//! touches the nodes themselves.

use crate::db::RecordStore;
use crate::models::{Agent, Identifier};
use crate::services::error::ServiceError;
use chrono::NaiveDate;
use std::sync::Arc;

/// Parameters for creating an agent.
#[derive(Debug, Clone, Default)]
pub struct CreateAgentParams {
    /// Kind of actor (see `agent_types`).
    pub agent_type: String,
    pub name: String,
    pub description: Option<String>,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
}

pub struct AgentService {
    store: Arc<dyn RecordStore>,
}

impl AgentService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn create_agent(&self, params: CreateAgentParams) -> Result<Agent, ServiceError> {
        let mut agent = Agent::new(params.agent_type, params.name, params.description);
        agent.date_start = params.date_start;
        agent.date_end = params.date_end;

        let created = self.store.create_agent(agent).await?;
        tracing::debug!(id = %created.id, "created agent");
        Ok(created)
    }

    pub async fn get_agent(&self, id: &str) -> Result<Agent, ServiceError> {
        self.store
            .get_agent(id)
            .await?
            .ok_or_else(|| ServiceError::agent_not_found(id))
    }

    /// Delete an agent, its identifiers, and its node links.
    pub async fn delete_agent(&self, id: &str) -> Result<(), ServiceError> {
        let deleted = self.store.delete_agent(id).await?;
        if deleted == 0 {
            return Err(ServiceError::agent_not_found(id));
        }
        tracing::info!(id = %id, "deleted agent");
        Ok(())
    }

    /// Attach a typed external identifier (e.g. VIAF, ORCID) to an agent.
    pub async fn add_identifier(
        &self,
        agent_id: &str,
        identifier_type: &str,
        value: &str,
    ) -> Result<Identifier, ServiceError> {
        self.get_agent(agent_id).await?;

        let identifier = Identifier::new(
            agent_id.to_string(),
            identifier_type.to_string(),
            value.to_string(),
        );
        Ok(self.store.create_identifier(identifier).await?)
    }

    pub async fn identifiers(&self, agent_id: &str) -> Result<Vec<Identifier>, ServiceError> {
        self.get_agent(agent_id).await?;
        Ok(self.store.get_identifiers(agent_id).await?)
    }
}
