//! Schema error types.
//!
//! Store-level errors (`DatabaseError`) live in `vestige-db`; configuration
//! errors live in `vestige-config`.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating a schema descriptor.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The TOML descriptor could not be parsed.
    #[error("Schema parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The descriptor file could not be read.
    #[error("Failed to read schema file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two entities share the same name.
    #[error("Duplicate entity declaration: {0}")]
    DuplicateEntity(String),

    /// An entity declares no primary key fields.
    #[error("Entity {0} declares no primary key")]
    MissingPrimaryKey(String),

    /// A relation points at an entity the schema does not declare.
    #[error("Relation {entity}.{field} targets undeclared entity {target}")]
    UnknownTarget {
        entity: String,
        field: String,
        target: String,
    },

    /// The foreign-key column count does not match the referenced key.
    #[error(
        "Relation {entity}.{field} has {fields} foreign-key column(s) but {target} has a {key}-column key"
    )]
    KeyArity {
        entity: String,
        field: String,
        target: String,
        fields: usize,
        key: usize,
    },

    /// The relation references columns other than the target's primary key.
    #[error("Relation {entity}.{field} must reference the primary key of {target}")]
    ReferencesNotKey {
        entity: String,
        field: String,
        target: String,
    },
}
