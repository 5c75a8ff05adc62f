//! Database Connection Management
//!
//! This module provides the core database connection and initialization
//! functionality using libsql for the archival record store.
//!
//! # Architecture
//!
//! - **Path-agnostic**: accepts any valid PathBuf
//! - **Idempotent schema**: CREATE TABLE IF NOT EXISTS, safe to re-run
//! - **WAL mode**: Write-Ahead Logging for better concurrency
//! - **Foreign keys**: enabled for referential integrity
//!
//! # Database Connection Patterns
//!
//! **Always use `connect_with_timeout()` in async functions** to avoid SQLite
//! thread-safety violations when the Tokio runtime moves futures between
//! threads. The 5-second busy timeout lets concurrent operations wait and
//! retry instead of failing immediately with `SQLITE_BUSY`.
//!
//! Use `connect()` only in single-threaded synchronous contexts where the
//! connection is never held across an await point.

use crate::db::error::DatabaseError;
use libsql::{Builder, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Database service for managing the libsql connection and schema
///
/// # Examples
///
/// ```no_run
/// use archcore::db::DatabaseService;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db_path = PathBuf::from("/path/to/archcore.db");
///     let db_service = DatabaseService::new(db_path).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

impl DatabaseService {
    /// Create a new DatabaseService with the specified database path
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Initialize the schema (CREATE TABLE IF NOT EXISTS)
    /// 4. Enable SQLite features (WAL mode, foreign keys, busy timeout)
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the parent directory cannot be created,
    /// the connection fails, or schema initialization fails.
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        service.initialize_schema().await?;

        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead of
    /// execute(). This helper encapsulates that pattern.
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Initialize database schema and configuration
    ///
    /// # Schema
    ///
    /// - `nodes`: the description hierarchy (nullable `parent_id` self reference)
    /// - `node_association`: typed, directed related-record links
    /// - `agents` / `identifiers`: actors and their external identifiers
    /// - `agent_node_association`: typed agent-to-node links
    ///
    /// Sibling reference-code uniqueness is enforced with a unique index over
    /// `(ref_code, IFNULL(parent_id, ''))`. The IFNULL is load-bearing: SQLite
    /// treats NULLs as distinct in unique indexes, so a plain two-column index
    /// would let two top nodes share a reference code.
    async fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        // Enable WAL mode for better concurrency
        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        // Wait up to 5s on a locked database instead of failing immediately
        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;

        // Enable foreign key constraints
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS nodes (
                id TEXT PRIMARY KEY,
                ref_code TEXT NOT NULL,
                level_of_description TEXT NOT NULL,
                title TEXT NOT NULL,
                date_start TEXT,
                date_end TEXT,
                extent TEXT,
                archival_history TEXT,
                parent_id TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                modified_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (parent_id) REFERENCES nodes(id) ON DELETE CASCADE
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create nodes table: {}", e))
        })?;

        // Typed, directed node-to-node links. The three-column primary key is
        // what makes link creation idempotent per (source, target, type).
        conn.execute(
            "CREATE TABLE IF NOT EXISTS node_association (
                parent_id TEXT NOT NULL,
                child_id TEXT NOT NULL,
                association_type TEXT NOT NULL,
                PRIMARY KEY (parent_id, child_id, association_type),
                FOREIGN KEY (parent_id) REFERENCES nodes(id) ON DELETE CASCADE,
                FOREIGN KEY (child_id) REFERENCES nodes(id) ON DELETE CASCADE
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create node_association table: {}", e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS agents (
                id TEXT PRIMARY KEY,
                agent_type TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                date_start TEXT,
                date_end TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create agents table: {}", e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS identifiers (
                id TEXT PRIMARY KEY,
                identifier_type TEXT NOT NULL,
                value TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                FOREIGN KEY (agent_id) REFERENCES agents(id) ON DELETE CASCADE
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create identifiers table: {}", e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS agent_node_association (
                agent_id TEXT NOT NULL,
                node_id TEXT NOT NULL,
                association_type TEXT NOT NULL,
                PRIMARY KEY (agent_id, node_id, association_type),
                FOREIGN KEY (agent_id) REFERENCES agents(id) ON DELETE CASCADE,
                FOREIGN KEY (node_id) REFERENCES nodes(id) ON DELETE CASCADE
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to create agent_node_association table: {}",
                e
            ))
        })?;

        self.create_core_indexes(&conn).await?;

        Ok(())
    }

    /// Create core indexes
    ///
    /// These indexes never change, so no ALTER TABLE is ever required.
    async fn create_core_indexes(&self, conn: &libsql::Connection) -> Result<(), DatabaseError> {
        // Index on parent_id (hierarchy queries: children, siblings, roots)
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_id)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to create index 'idx_nodes_parent': {}",
                e
            ))
        })?;

        // Index on created_at (listing order)
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_nodes_created ON nodes(created_at)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to create index 'idx_nodes_created': {}",
                e
            ))
        })?;

        // Sibling uniqueness: (ref_code, parent) with NULL parents collapsed
        conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_nodes_ref_code_sibling
             ON nodes(ref_code, IFNULL(parent_id, ''))",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to create index 'idx_nodes_ref_code_sibling': {}",
                e
            ))
        })?;

        // Association lookups from either endpoint
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_assoc_child ON node_association(child_id)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to create index 'idx_assoc_child': {}", e))
        })?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_agent_assoc_node ON agent_node_association(node_id)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to create index 'idx_agent_assoc_node': {}",
                e
            ))
        })?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_identifiers_agent ON identifiers(agent_id)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::sql_execution(format!(
                "Failed to create index 'idx_identifiers_agent': {}",
                e
            ))
        })?;

        Ok(())
    }

    /// Get a synchronous connection to the database
    ///
    /// Only use this in synchronous, single-threaded contexts. In async
    /// functions use `connect_with_timeout()` instead to avoid SQLite
    /// thread-safety violations.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get an async connection with the busy timeout configured
    ///
    /// This is the safe default for all async code: the 5-second busy timeout
    /// makes concurrent operations wait and retry instead of failing when the
    /// Tokio runtime moves futures between threads at await points.
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(&conn, "PRAGMA busy_timeout = 5000")
            .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON").await?;

        Ok(conn)
    }
}
