//! Database error types for vestige-db.

use thiserror::Error;
use vestige_core::errors::SchemaError;

/// Errors from store and audit operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A SQL query failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Expected a result row but none was returned.
    #[error("No result returned")]
    NoResult,

    /// The entity type is not declared in the schema descriptor.
    #[error("Unknown entity type: {0}")]
    UnknownEntity(String),

    /// A single-record operation was given a predicate that does not pin
    /// one row (no full primary key or unique set bound by equality).
    #[error("Predicate does not identify a unique {entity} record")]
    NotUnique { entity: String },

    /// A column or table name is not a plain SQL identifier.
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Schema descriptor could not be loaded.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Underlying libSQL error.
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// Catch-all for unexpected errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
