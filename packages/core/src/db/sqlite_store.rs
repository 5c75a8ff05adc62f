//! SqliteStore - RecordStore Implementation for libsql
//!
//! Thin SQL layer over [`DatabaseService`]. All row conversion happens here;
//! the services above only ever see model types.
//!
//! # Transactions
//!
//! Single-row writes ride on SQLite's implicit per-statement transaction.
//! Multi-table mutations (`delete_subtree`, `delete_agent`) run inside an
//! explicit `BEGIN IMMEDIATE … COMMIT`, with a rollback on any failure, so a
//! half-deleted subtree can never be observed or persisted.

use crate::db::error::DatabaseError;
use crate::db::record_store::{AssociationRow, RecordStore};
use crate::db::DatabaseService;
use crate::models::{Agent, Identifier, Node, NodeUpdate};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use libsql::Row;
use std::collections::HashSet;
use std::sync::Arc;

/// Column list shared by every node SELECT, so row_to_node indices stay valid.
const NODE_COLUMNS: &str = "id, ref_code, level_of_description, title, date_start, date_end, \
                            extent, archival_history, parent_id, created_at, modified_at";

/// Column list for agent SELECTs.
const AGENT_COLUMNS: &str = "id, agent_type, name, description, date_start, date_end, created_at";

/// Ids per DELETE statement. Keeps parameter counts far below SQLite's limit
/// even when both sides of an OR take the full id list.
const DELETE_CHUNK: usize = 500;

/// RecordStore implementation backed by libsql/SQLite.
pub struct SqliteStore {
    db: Arc<DatabaseService>,
}

impl SqliteStore {
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Parse a timestamp from the database.
    ///
    /// SQLite CURRENT_TIMESTAMP produces "YYYY-MM-DD HH:MM:SS"; rows written
    /// by older tooling may carry RFC3339.
    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(naive.and_utc());
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }

        Err(DatabaseError::sql_execution(format!(
            "Unable to parse timestamp '{}' as SQLite or RFC3339 format",
            s
        )))
    }

    /// Parse an optional "YYYY-MM-DD" date column.
    fn parse_date(s: Option<String>) -> Result<Option<NaiveDate>, DatabaseError> {
        match s {
            None => Ok(None),
            Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d").map(Some).map_err(|e| {
                DatabaseError::sql_execution(format!("Unable to parse date '{}': {}", s, e))
            }),
        }
    }

    /// Convert a libsql row (NODE_COLUMNS order) to a Node.
    fn row_to_node(row: &Row) -> Result<Node, DatabaseError> {
        let id: String = row.get(0)?;
        let ref_code: String = row.get(1)?;
        let level_of_description: String = row.get(2)?;
        let title: String = row.get(3)?;
        let date_start: Option<String> = row.get(4)?;
        let date_end: Option<String> = row.get(5)?;
        let extent: Option<String> = row.get(6)?;
        let archival_history: Option<String> = row.get(7)?;
        let parent_id: Option<String> = row.get(8)?;
        let created_at_str: String = row.get(9)?;
        let modified_at_str: String = row.get(10)?;

        Ok(Node {
            id,
            ref_code,
            level_of_description,
            title,
            date_start: Self::parse_date(date_start)?,
            date_end: Self::parse_date(date_end)?,
            extent,
            archival_history,
            parent_id,
            created_at: Self::parse_timestamp(&created_at_str)?,
            modified_at: Self::parse_timestamp(&modified_at_str)?,
        })
    }

    /// Convert a libsql row (AGENT_COLUMNS order) to an Agent.
    fn row_to_agent(row: &Row) -> Result<Agent, DatabaseError> {
        let id: String = row.get(0)?;
        let agent_type: String = row.get(1)?;
        let name: String = row.get(2)?;
        let description: Option<String> = row.get(3)?;
        let date_start: Option<String> = row.get(4)?;
        let date_end: Option<String> = row.get(5)?;
        let created_at_str: String = row.get(6)?;

        Ok(Agent {
            id,
            agent_type,
            name,
            description,
            date_start: Self::parse_date(date_start)?,
            date_end: Self::parse_date(date_end)?,
            created_at: Self::parse_timestamp(&created_at_str)?,
        })
    }

    /// Map a libsql error, recognizing unique-index violations.
    fn map_write_error(context: &str, e: libsql::Error) -> DatabaseError {
        let msg = e.to_string();
        if msg.contains("UNIQUE constraint failed") {
            DatabaseError::unique_violation(format!("{}: {}", context, msg))
        } else {
            DatabaseError::sql_execution(format!("{}: {}", context, msg))
        }
    }

    /// Collect the node plus all descendants by walking parent_id edges.
    ///
    /// The visited set guards against a cyclic parent chain in corrupted data;
    /// a cycle would otherwise turn collection into an infinite loop.
    async fn collect_subtree_ids(
        conn: &libsql::Connection,
        root_id: &str,
    ) -> Result<Vec<String>, DatabaseError> {
        let mut collected: Vec<String> = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: Vec<String> = vec![root_id.to_string()];

        while let Some(id) = queue.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }
            collected.push(id.clone());

            let mut stmt = conn
                .prepare("SELECT id FROM nodes WHERE parent_id = ?")
                .await
                .map_err(|e| {
                    DatabaseError::sql_execution(format!(
                        "Failed to prepare child collection query: {}",
                        e
                    ))
                })?;
            let mut rows = stmt.query([id.as_str()]).await.map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to collect children: {}", e))
            })?;
            while let Some(row) = rows
                .next()
                .await
                .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
            {
                let child_id: String = row.get(0)?;
                queue.push(child_id);
            }
        }

        Ok(collected)
    }

    /// Delete association and node rows for the collected ids. Runs inside an
    /// open transaction owned by the caller.
    async fn delete_rows_for_ids(
        conn: &libsql::Connection,
        ids: &[String],
    ) -> Result<u64, DatabaseError> {
        let mut deleted: u64 = 0;

        for chunk in ids.chunks(DELETE_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let values: Vec<libsql::Value> = chunk
                .iter()
                .map(|id| libsql::Value::from(id.clone()))
                .collect();

            // Related-record links touching any deleted id, either direction
            let mut both_sides: Vec<libsql::Value> = values.clone();
            both_sides.extend(values.iter().cloned());
            conn.execute(
                &format!(
                    "DELETE FROM node_association WHERE parent_id IN ({}) OR child_id IN ({})",
                    placeholders, placeholders
                ),
                both_sides,
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to delete node associations: {}", e))
            })?;

            // Agent links touching any deleted id
            conn.execute(
                &format!(
                    "DELETE FROM agent_node_association WHERE node_id IN ({})",
                    placeholders
                ),
                values.clone(),
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to delete agent links: {}", e))
            })?;

            let rows_affected = conn
                .execute(
                    &format!("DELETE FROM nodes WHERE id IN ({})", placeholders),
                    values,
                )
                .await
                .map_err(|e| {
                    DatabaseError::sql_execution(format!("Failed to delete node rows: {}", e))
                })?;
            deleted += rows_affected;
        }

        Ok(deleted)
    }

    /// Query nodes with NODE_COLUMNS shape and collect the results.
    async fn query_nodes(
        conn: &libsql::Connection,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<Node>, DatabaseError> {
        let mut stmt = conn.prepare(sql).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to prepare node query: {}", e))
        })?;
        let mut rows = stmt.query(params).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute node query: {}", e))
        })?;

        let mut nodes = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            nodes.push(Self::row_to_node(&row)?);
        }
        Ok(nodes)
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn create_node(&self, node: Node) -> Result<Node, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO nodes (id, ref_code, level_of_description, title, date_start, date_end, \
             extent, archival_history, parent_id) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                node.id.as_str(),
                node.ref_code.as_str(),
                node.level_of_description.as_str(),
                node.title.as_str(),
                node.date_start.map(|d| d.to_string()),
                node.date_end.map(|d| d.to_string()),
                node.extent.as_deref(),
                node.archival_history.as_deref(),
                node.parent_id.as_deref(),
            ),
        )
        .await
        .map_err(|e| Self::map_write_error("Failed to insert node", e))?;

        // Re-read so timestamps reflect what the database actually stored
        self.get_node(&node.id).await?.ok_or_else(|| {
            DatabaseError::sql_execution(format!("Node {} not found after insert", node.id))
        })
    }

    async fn get_node(&self, id: &str) -> Result<Option<Node>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(&format!("SELECT {} FROM nodes WHERE id = ?", NODE_COLUMNS))
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare get_node query: {}", e))
            })?;
        let mut rows = stmt.query([id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute get_node query: {}", e))
        })?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            Some(row) => Ok(Some(Self::row_to_node(&row)?)),
            None => Ok(None),
        }
    }

    async fn update_node(&self, id: &str, update: NodeUpdate) -> Result<Node, DatabaseError> {
        let current = self.get_node(id).await?.ok_or_else(|| {
            DatabaseError::sql_execution(format!("Node {} vanished during update", id))
        })?;

        // Merge the sparse update over the current row
        let title = update.title.unwrap_or(current.title);
        let ref_code = update.ref_code.unwrap_or(current.ref_code);
        let level_of_description = update
            .level_of_description
            .unwrap_or(current.level_of_description);
        let date_start = update.date_start.unwrap_or(current.date_start);
        let date_end = update.date_end.unwrap_or(current.date_end);
        let extent = update.extent.unwrap_or(current.extent);
        let archival_history = update.archival_history.unwrap_or(current.archival_history);

        let conn = self.db.connect_with_timeout().await?;
        conn.execute(
            "UPDATE nodes SET ref_code = ?, level_of_description = ?, title = ?, date_start = ?, \
             date_end = ?, extent = ?, archival_history = ?, modified_at = CURRENT_TIMESTAMP \
             WHERE id = ?",
            (
                ref_code.as_str(),
                level_of_description.as_str(),
                title.as_str(),
                date_start.map(|d| d.to_string()),
                date_end.map(|d| d.to_string()),
                extent.as_deref(),
                archival_history.as_deref(),
                id,
            ),
        )
        .await
        .map_err(|e| Self::map_write_error("Failed to update node", e))?;

        self.get_node(id).await?.ok_or_else(|| {
            DatabaseError::sql_execution(format!("Node {} not found after update", id))
        })
    }

    async fn delete_subtree(&self, id: &str) -> Result<u64, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        // IMMEDIATE takes the write lock before the descendant walk, so a
        // concurrent mutation cannot slip between collection and deletion.
        conn.execute("BEGIN IMMEDIATE", ()).await.map_err(|e| {
            DatabaseError::transaction_failed(format!("Failed to begin transaction: {}", e))
        })?;

        let result = async {
            let ids = Self::collect_subtree_ids(&conn, id).await?;
            Self::delete_rows_for_ids(&conn, &ids).await
        }
        .await;

        let deleted = match result {
            Ok(deleted) => deleted,
            Err(e) => {
                let _rollback = conn.execute("ROLLBACK", ()).await;
                return Err(e);
            }
        };

        if let Err(e) = conn.execute("COMMIT", ()).await {
            let _rollback = conn.execute("ROLLBACK", ()).await;
            return Err(DatabaseError::transaction_failed(format!(
                "Failed to commit subtree delete: {}",
                e
            )));
        }

        Ok(deleted)
    }

    async fn get_children(&self, parent_id: Option<&str>) -> Result<Vec<Node>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        // rowid reflects insertion order, which is the stable display order
        match parent_id {
            Some(parent_id) => {
                Self::query_nodes(
                    &conn,
                    &format!(
                        "SELECT {} FROM nodes WHERE parent_id = ? ORDER BY rowid",
                        NODE_COLUMNS
                    ),
                    [parent_id],
                )
                .await
            }
            None => {
                Self::query_nodes(
                    &conn,
                    &format!(
                        "SELECT {} FROM nodes WHERE parent_id IS NULL ORDER BY rowid",
                        NODE_COLUMNS
                    ),
                    (),
                )
                .await
            }
        }
    }

    async fn list_roots(&self, limit: u32, offset: u32) -> Result<Vec<Node>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        Self::query_nodes(
            &conn,
            &format!(
                "SELECT {} FROM nodes WHERE parent_id IS NULL ORDER BY rowid LIMIT ? OFFSET ?",
                NODE_COLUMNS
            ),
            (limit as i64, offset as i64),
        )
        .await
    }

    async fn count_nodes(&self) -> Result<u64, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare("SELECT COUNT(*) FROM nodes")
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare count query: {}", e))
            })?;
        let mut rows = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to count nodes: {}", e))
        })?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
            .ok_or_else(|| DatabaseError::sql_execution("COUNT(*) returned no row".to_string()))?;
        let count: i64 = row.get(0)?;
        Ok(count as u64)
    }

    async fn sibling_ref_code_exists(
        &self,
        ref_code: &str,
        parent_id: Option<&str>,
        exclude_id: Option<&str>,
    ) -> Result<bool, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        // IFNULL collapses "no parent" to '' on both sides so top nodes
        // compete for reference codes too. Node ids are UUIDs, so comparing
        // against '' when there is no exclusion is always true.
        let mut stmt = conn
            .prepare(
                "SELECT COUNT(*) FROM nodes \
                 WHERE ref_code = ? AND IFNULL(parent_id, '') = IFNULL(?, '') \
                 AND id <> IFNULL(?, '')",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!(
                    "Failed to prepare sibling ref_code query: {}",
                    e
                ))
            })?;
        let mut rows = stmt
            .query((ref_code, parent_id, exclude_id))
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to check sibling ref_code: {}", e))
            })?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
            .ok_or_else(|| DatabaseError::sql_execution("COUNT(*) returned no row".to_string()))?;
        let count: i64 = row.get(0)?;
        Ok(count > 0)
    }

    async fn create_association(
        &self,
        source_id: &str,
        target_id: &str,
        association_type: &str,
    ) -> Result<(), DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        conn.execute(
            "INSERT OR IGNORE INTO node_association (parent_id, child_id, association_type) \
             VALUES (?, ?, ?)",
            (source_id, target_id, association_type),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create association: {}", e))
        })?;

        Ok(())
    }

    async fn delete_association(
        &self,
        source_id: &str,
        target_id: &str,
        association_type: &str,
    ) -> Result<(), DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        conn.execute(
            "DELETE FROM node_association \
             WHERE parent_id = ? AND child_id = ? AND association_type = ?",
            (source_id, target_id, association_type),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to delete association: {}", e))
        })?;

        Ok(())
    }

    async fn outgoing_associations(
        &self,
        node_id: &str,
    ) -> Result<Vec<AssociationRow>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT parent_id, child_id, association_type FROM node_association \
                 WHERE parent_id = ? ORDER BY rowid",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!(
                    "Failed to prepare outgoing associations query: {}",
                    e
                ))
            })?;
        let mut rows = stmt.query([node_id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to query outgoing associations: {}", e))
        })?;

        let mut links = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            links.push(AssociationRow {
                parent_id: row.get(0)?,
                child_id: row.get(1)?,
                association_type: row.get(2)?,
            });
        }
        Ok(links)
    }

    async fn incoming_associations(
        &self,
        node_id: &str,
    ) -> Result<Vec<AssociationRow>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT parent_id, child_id, association_type FROM node_association \
                 WHERE child_id = ? ORDER BY rowid",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!(
                    "Failed to prepare incoming associations query: {}",
                    e
                ))
            })?;
        let mut rows = stmt.query([node_id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to query incoming associations: {}", e))
        })?;

        let mut links = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            links.push(AssociationRow {
                parent_id: row.get(0)?,
                child_id: row.get(1)?,
                association_type: row.get(2)?,
            });
        }
        Ok(links)
    }

    async fn create_agent(&self, agent: Agent) -> Result<Agent, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO agents (id, agent_type, name, description, date_start, date_end) \
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                agent.id.as_str(),
                agent.agent_type.as_str(),
                agent.name.as_str(),
                agent.description.as_deref(),
                agent.date_start.map(|d| d.to_string()),
                agent.date_end.map(|d| d.to_string()),
            ),
        )
        .await
        .map_err(|e| Self::map_write_error("Failed to insert agent", e))?;

        self.get_agent(&agent.id).await?.ok_or_else(|| {
            DatabaseError::sql_execution(format!("Agent {} not found after insert", agent.id))
        })
    }

    async fn get_agent(&self, id: &str) -> Result<Option<Agent>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(&format!("SELECT {} FROM agents WHERE id = ?", AGENT_COLUMNS))
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare get_agent query: {}", e))
            })?;
        let mut rows = stmt.query([id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute get_agent query: {}", e))
        })?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            Some(row) => Ok(Some(Self::row_to_agent(&row)?)),
            None => Ok(None),
        }
    }

    async fn delete_agent(&self, id: &str) -> Result<u64, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        conn.execute("BEGIN IMMEDIATE", ()).await.map_err(|e| {
            DatabaseError::transaction_failed(format!("Failed to begin transaction: {}", e))
        })?;

        let result = async {
            conn.execute("DELETE FROM identifiers WHERE agent_id = ?", [id])
                .await
                .map_err(|e| {
                    DatabaseError::sql_execution(format!("Failed to delete identifiers: {}", e))
                })?;
            conn.execute("DELETE FROM agent_node_association WHERE agent_id = ?", [id])
                .await
                .map_err(|e| {
                    DatabaseError::sql_execution(format!("Failed to delete agent links: {}", e))
                })?;
            conn.execute("DELETE FROM agents WHERE id = ?", [id])
                .await
                .map_err(|e| {
                    DatabaseError::sql_execution(format!("Failed to delete agent: {}", e))
                })
        }
        .await;

        let deleted = match result {
            Ok(deleted) => deleted,
            Err(e) => {
                let _rollback = conn.execute("ROLLBACK", ()).await;
                return Err(e);
            }
        };

        if let Err(e) = conn.execute("COMMIT", ()).await {
            let _rollback = conn.execute("ROLLBACK", ()).await;
            return Err(DatabaseError::transaction_failed(format!(
                "Failed to commit agent delete: {}",
                e
            )));
        }

        Ok(deleted)
    }

    async fn create_identifier(
        &self,
        identifier: Identifier,
    ) -> Result<Identifier, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        conn.execute(
            "INSERT INTO identifiers (id, identifier_type, value, agent_id) VALUES (?, ?, ?, ?)",
            (
                identifier.id.as_str(),
                identifier.identifier_type.as_str(),
                identifier.value.as_str(),
                identifier.agent_id.as_str(),
            ),
        )
        .await
        .map_err(|e| Self::map_write_error("Failed to insert identifier", e))?;

        Ok(identifier)
    }

    async fn get_identifiers(&self, agent_id: &str) -> Result<Vec<Identifier>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT id, identifier_type, value, agent_id FROM identifiers \
                 WHERE agent_id = ? ORDER BY rowid",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!("Failed to prepare identifiers query: {}", e))
            })?;
        let mut rows = stmt.query([agent_id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to query identifiers: {}", e))
        })?;

        let mut identifiers = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            identifiers.push(Identifier {
                id: row.get(0)?,
                identifier_type: row.get(1)?,
                value: row.get(2)?,
                agent_id: row.get(3)?,
            });
        }
        Ok(identifiers)
    }

    async fn link_agent(
        &self,
        agent_id: &str,
        node_id: &str,
        association_type: &str,
    ) -> Result<(), DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        conn.execute(
            "INSERT OR IGNORE INTO agent_node_association (agent_id, node_id, association_type) \
             VALUES (?, ?, ?)",
            (agent_id, node_id, association_type),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to link agent: {}", e)))?;

        Ok(())
    }

    async fn unlink_agent(
        &self,
        agent_id: &str,
        node_id: &str,
        association_type: &str,
    ) -> Result<(), DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        conn.execute(
            "DELETE FROM agent_node_association \
             WHERE agent_id = ? AND node_id = ? AND association_type = ?",
            (agent_id, node_id, association_type),
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to unlink agent: {}", e)))?;

        Ok(())
    }

    async fn agents_for_node(
        &self,
        node_id: &str,
    ) -> Result<Vec<(Agent, String)>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT a.id, a.agent_type, a.name, a.description, a.date_start, a.date_end, \
                        a.created_at, ana.association_type \
                 FROM agents a \
                 JOIN agent_node_association ana ON ana.agent_id = a.id \
                 WHERE ana.node_id = ? ORDER BY a.rowid",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!(
                    "Failed to prepare agents_for_node query: {}",
                    e
                ))
            })?;
        let mut rows = stmt.query([node_id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to query agents for node: {}", e))
        })?;

        let mut linked = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            let agent = Self::row_to_agent(&row)?;
            let association_type: String = row.get(7)?;
            linked.push((agent, association_type));
        }
        Ok(linked)
    }

    async fn nodes_for_agent(
        &self,
        agent_id: &str,
    ) -> Result<Vec<(Node, String)>, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;

        let mut stmt = conn
            .prepare(
                "SELECT n.id, n.ref_code, n.level_of_description, n.title, n.date_start, \
                        n.date_end, n.extent, n.archival_history, n.parent_id, n.created_at, \
                        n.modified_at, ana.association_type \
                 FROM nodes n \
                 JOIN agent_node_association ana ON ana.node_id = n.id \
                 WHERE ana.agent_id = ? ORDER BY n.rowid",
            )
            .await
            .map_err(|e| {
                DatabaseError::sql_execution(format!(
                    "Failed to prepare nodes_for_agent query: {}",
                    e
                ))
            })?;
        let mut rows = stmt.query([agent_id]).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to query nodes for agent: {}", e))
        })?;

        let mut linked = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            let node = Self::row_to_node(&row)?;
            let association_type: String = row.get(11)?;
            linked.push((node, association_type));
        }
        Ok(linked)
    }
}
