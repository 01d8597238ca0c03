//! # vestige-db
//!
//! Cascade-aware deletion auditing over libSQL.
//!
//! Every `delete`/`delete_many` routed through [`interceptor::DeleteInterceptor`]
//! reads the target rows, captures the child rows that `ON DELETE CASCADE`
//! is about to remove, runs the real delete, and appends a
//! [`DeletionAuditRecord`](vestige_core::audit::DeletionAuditRecord) per
//! deleted row attributed to the ambient actor. The audit side-channel never
//! fails or blocks the delete itself.
//!
//! Uses the `libsql` crate (C `SQLite` fork) for both the record store and the
//! append-only `deleted_history` table.

pub mod actor;
pub mod audit;
pub mod catalog;
pub mod error;
pub mod helpers;
pub mod interceptor;
mod migrations;
pub mod service;
pub mod snapshot;
mod sql;
pub mod store;

use error::DatabaseError;
use libsql::Builder;

/// Central database handle.
///
/// Wraps a libSQL database and a single connection shared by the record
/// store and the audit store.
pub struct VestigeDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl VestigeDb {
    /// Open a local database at the given path with foreign keys enforced.
    ///
    /// Runs migrations automatically on first open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        Self::open_local_with(path, true).await
    }

    /// Open a local database, choosing whether to enforce foreign keys.
    ///
    /// With `foreign_keys` off `SQLite` performs no cascades, so captured
    /// children are recorded but not actually removed.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local_with(path: &str, foreign_keys: bool) -> Result<Self, DatabaseError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if path != ":memory:" && !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Other(e.into()))?;
            }
        }

        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Must be set per-connection in SQLite
        let pragma = if foreign_keys {
            "PRAGMA foreign_keys = ON"
        } else {
            "PRAGMA foreign_keys = OFF"
        };
        conn.execute(pragma, ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("{pragma}: {e}")))?;

        let vestige_db = Self { db, conn };
        vestige_db.run_migrations().await?;
        Ok(vestige_db)
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Execute a batch of DDL statements (application tables, fixtures).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Query` if any statement fails.
    pub async fn execute_batch(&self, sql: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(sql)
            .await
            .map_err(|e| DatabaseError::Query(format!("batch: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support;
