//! Declarative schema descriptor.
//!
//! The descriptor is written once (in Rust or as a TOML file) and consumed
//! at startup to build the relationship catalog. It mirrors what the
//! database DDL declares: entities, their keys, and which relational fields
//! carry foreign keys with an `ON DELETE` action.
//!
//! ```toml
//! [[entity]]
//! name = "OrderLine"
//! table = "order_lines"
//! primary_key = ["id"]
//!
//! [[entity.field]]
//! name = "order"
//! relation = { target = "Order", fields = ["order_id"], on_delete = "cascade" }
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::SchemaError;
use crate::record::{Predicate, Record, RecordKey};

// ---------------------------------------------------------------------------
// OnDelete
// ---------------------------------------------------------------------------

/// Referential action declared for a foreign key when its parent row is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    #[default]
    NoAction,
    Restrict,
    SetNull,
    SetDefault,
    Cascade,
}

impl OnDelete {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoAction => "no_action",
            Self::Restrict => "restrict",
            Self::SetNull => "set_null",
            Self::SetDefault => "set_default",
            Self::Cascade => "cascade",
        }
    }
}

impl fmt::Display for OnDelete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// Relational side of a field.
///
/// Only the owning side (the one with `fields`) carries foreign-key columns;
/// back-references leave `fields` empty and never produce a cascade edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    /// Entity the foreign key points at.
    pub target: String,
    /// Foreign-key columns on the declaring entity.
    #[serde(default)]
    pub fields: Vec<String>,
    /// Referenced columns on `target`. Empty means its primary key.
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub on_delete: OnDelete,
}

impl RelationDescriptor {
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            fields: Vec::new(),
            references: Vec::new(),
            on_delete: OnDelete::default(),
        }
    }

    /// Owning side with `ON DELETE CASCADE` over the given columns.
    #[must_use]
    pub fn cascade<S: Into<String>>(
        target: impl Into<String>,
        fields: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(target)
            .fields(fields)
            .on_delete(OnDelete::Cascade)
    }

    #[must_use]
    pub fn fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn references<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.references = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub const fn on_delete(mut self, action: OnDelete) -> Self {
        self.on_delete = action;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<RelationDescriptor>,
}

/// One named record collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub name: String,
    /// Backing table. Defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    pub primary_key: Vec<String>,
    /// Additional unique column sets usable as single-record predicates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique: Vec<Vec<String>>,
    #[serde(default, rename = "field", skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDescriptor>,
}

impl EntityDescriptor {
    #[must_use]
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        primary_key: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            table: None,
            primary_key: primary_key.into_iter().map(Into::into).collect(),
            unique: Vec::new(),
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    #[must_use]
    pub fn unique<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.unique.push(columns.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            relation: None,
        });
        self
    }

    #[must_use]
    pub fn relation(mut self, name: impl Into<String>, relation: RelationDescriptor) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            relation: Some(relation),
        });
        self
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.name)
    }

    /// Relational fields in declaration order.
    pub fn relations(&self) -> impl Iterator<Item = (&str, &RelationDescriptor)> {
        self.fields
            .iter()
            .filter_map(|f| f.relation.as_ref().map(|r| (f.name.as_str(), r)))
    }

    /// Primary key of `record`, if every key column is present and non-null.
    #[must_use]
    pub fn key_of(&self, record: &Record) -> Option<RecordKey> {
        RecordKey::from_record(record, &self.primary_key)
    }

    /// Whether `predicate` pins at most one row: it binds the whole primary
    /// key or one whole declared unique set with equality conditions.
    #[must_use]
    pub fn is_unique_predicate(&self, predicate: &Predicate) -> bool {
        let covers = |columns: &[String]| !columns.is_empty() && columns.iter().all(|c| predicate.binds(c));
        covers(&self.primary_key) || self.unique.iter().any(|set| covers(set))
    }
}

/// The whole declared schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    #[serde(default, rename = "entity")]
    entities: Vec<EntityDescriptor>,
}

impl SchemaDescriptor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_entity(mut self, entity: EntityDescriptor) -> Self {
        self.entities.push(entity);
        self
    }

    #[must_use]
    pub fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Entities in declaration order.
    #[must_use]
    pub fn entities(&self) -> &[EntityDescriptor] {
        &self.entities
    }

    /// Parse a TOML descriptor and check its structural invariants.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Parse` on malformed TOML, or the first
    /// structural error found by [`validate`](Self::validate).
    pub fn from_toml_str(s: &str) -> Result<Self, SchemaError> {
        let schema: Self = toml::from_str(s)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Read and parse a TOML descriptor file.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Io` if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn from_path(path: &Path) -> Result<Self, SchemaError> {
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check entity-level invariants: unique names and non-empty keys.
    ///
    /// Relation-level problems are not fatal here; the relationship catalog
    /// reports and skips them individually.
    ///
    /// # Errors
    ///
    /// Returns the first `DuplicateEntity` or `MissingPrimaryKey` found.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for (i, entity) in self.entities.iter().enumerate() {
            if entity.primary_key.is_empty() {
                return Err(SchemaError::MissingPrimaryKey(entity.name.clone()));
            }
            if self.entities[..i].iter().any(|e| e.name == entity.name) {
                return Err(SchemaError::DuplicateEntity(entity.name.clone()));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CascadeEdge
// ---------------------------------------------------------------------------

/// Deleting a `parent` row physically removes the `child` rows whose
/// `foreign_key` columns equal the parent's primary key.
///
/// `foreign_key[i]` binds to component `i` of the parent key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeEdge {
    pub parent: String,
    pub child: String,
    /// Name of the relational field on `child` that declared the edge.
    pub relation: String,
    pub foreign_key: Vec<String>,
}

impl fmt::Display for CascadeEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}.{} ({})",
            self.parent,
            self.child,
            self.relation,
            self.foreign_key.join(", ")
        )
    }
}
