//! Relationship catalog and cascade resolver.
//!
//! The catalog is built once from the schema descriptor: every relational
//! field that owns foreign-key columns and declares `on_delete = cascade`
//! becomes a [`CascadeEdge`] from its target (the parent) to the declaring
//! entity (the child). Edges never change after construction.

use std::collections::BTreeMap;

use vestige_core::errors::SchemaError;
use vestige_core::schema::{CascadeEdge, EntityDescriptor, OnDelete, RelationDescriptor, SchemaDescriptor};

/// Parent entity type → cascade edges, in child declaration order.
#[derive(Debug, Clone, Default)]
pub struct RelationshipCatalog {
    edges: BTreeMap<String, Vec<CascadeEdge>>,
}

impl RelationshipCatalog {
    /// Scan every declared entity once and collect its cascade relations.
    ///
    /// Entity-level schema errors are fatal. A single malformed relation is
    /// logged and skipped so the rest of the catalog stays usable.
    ///
    /// # Errors
    ///
    /// Returns the `SchemaError` from [`SchemaDescriptor::validate`].
    pub fn build(schema: &SchemaDescriptor) -> Result<Self, SchemaError> {
        schema.validate()?;

        let mut edges: BTreeMap<String, Vec<CascadeEdge>> = BTreeMap::new();
        for child in schema.entities() {
            for (field, relation) in child.relations() {
                if relation.on_delete != OnDelete::Cascade || relation.fields.is_empty() {
                    continue;
                }
                match foreign_key_for(schema, child, field, relation) {
                    Ok(foreign_key) => {
                        edges
                            .entry(relation.target.clone())
                            .or_default()
                            .push(CascadeEdge {
                                parent: relation.target.clone(),
                                child: child.name.clone(),
                                relation: field.to_string(),
                                foreign_key,
                            });
                    }
                    Err(error) => {
                        tracing::warn!(
                            entity = %child.name,
                            field,
                            %error,
                            "catalog: skipping cascade relation"
                        );
                    }
                }
            }
        }

        let catalog = Self { edges };
        tracing::debug!(edges = catalog.len(), "catalog: built");
        Ok(catalog)
    }

    /// Edges whose parent is `entity`.
    #[must_use]
    pub fn edges_from(&self, entity: &str) -> &[CascadeEdge] {
        self.edges.get(entity).map_or(&[], Vec::as_slice)
    }

    /// All edges, grouped by parent name.
    pub fn iter(&self) -> impl Iterator<Item = &CascadeEdge> {
        self.edges.values().flatten()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// A cascade relation must point at a declared entity and bind every
/// column of that entity's primary key.
///
/// Returns the relation's columns in parent-key order. `references` may list
/// the key columns in any order; anything other than the key is rejected.
fn foreign_key_for(
    schema: &SchemaDescriptor,
    child: &EntityDescriptor,
    field: &str,
    relation: &RelationDescriptor,
) -> Result<Vec<String>, SchemaError> {
    let Some(parent) = schema.entity(&relation.target) else {
        return Err(SchemaError::UnknownTarget {
            entity: child.name.clone(),
            field: field.to_string(),
            target: relation.target.clone(),
        });
    };
    if relation.fields.len() != parent.primary_key.len() {
        return Err(SchemaError::KeyArity {
            entity: child.name.clone(),
            field: field.to_string(),
            target: parent.name.clone(),
            fields: relation.fields.len(),
            key: parent.primary_key.len(),
        });
    }
    if relation.references.is_empty() {
        return Ok(relation.fields.clone());
    }

    let not_key = || SchemaError::ReferencesNotKey {
        entity: child.name.clone(),
        field: field.to_string(),
        target: parent.name.clone(),
    };
    if relation.references.len() != relation.fields.len() {
        return Err(not_key());
    }
    parent
        .primary_key
        .iter()
        .map(|column| {
            relation
                .references
                .iter()
                .position(|r| r == column)
                .and_then(|i| relation.fields.get(i).cloned())
                .ok_or_else(not_key)
        })
        .collect()
}

/// Answers "which cascade edges leave this entity type?".
///
/// Never fails at lookup time: a schema that cannot be cataloged leaves the
/// resolver empty, so deletes still proceed and are audited without
/// cascade children.
#[derive(Debug, Clone, Default)]
pub struct CascadeResolver {
    catalog: RelationshipCatalog,
}

impl CascadeResolver {
    #[must_use]
    pub const fn new(catalog: RelationshipCatalog) -> Self {
        Self { catalog }
    }

    /// Build from a schema, degrading to an empty catalog on error.
    #[must_use]
    pub fn from_schema(schema: &SchemaDescriptor) -> Self {
        match RelationshipCatalog::build(schema) {
            Ok(catalog) => Self::new(catalog),
            Err(error) => {
                tracing::error!(%error, "catalog: failed to build, cascade capture disabled");
                Self::default()
            }
        }
    }

    #[must_use]
    pub fn resolve(&self, entity: &str) -> &[CascadeEdge] {
        self.catalog.edges_from(entity)
    }

    #[must_use]
    pub const fn catalog(&self) -> &RelationshipCatalog {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vestige_core::schema::EntityDescriptor;

    fn shop() -> SchemaDescriptor {
        SchemaDescriptor::new()
            .with_entity(EntityDescriptor::new("Order", ["id"]))
            .with_entity(
                EntityDescriptor::new("OrderLine", ["id"])
                    .relation("order", RelationDescriptor::cascade("Order", ["order_id"]))
                    .relation(
                        "product",
                        RelationDescriptor::new("Product")
                            .fields(["sku"])
                            .on_delete(OnDelete::Restrict),
                    ),
            )
            .with_entity(
                EntityDescriptor::new("Note", ["id"])
                    .relation("order", RelationDescriptor::cascade("Order", ["order_id"])),
            )
            .with_entity(EntityDescriptor::new("Product", ["sku"]))
    }

    #[test]
    fn cascade_relations_become_edges_in_declaration_order() {
        let catalog = RelationshipCatalog::build(&shop()).unwrap();
        let children: Vec<_> = catalog
            .edges_from("Order")
            .iter()
            .map(|e| e.child.as_str())
            .collect();
        assert_eq!(children, vec!["OrderLine", "Note"]);
        assert_eq!(
            catalog.edges_from("Order")[0].to_string(),
            "Order -> OrderLine.order (order_id)"
        );
        assert!(catalog.edges_from("Product").is_empty());
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn back_references_without_columns_are_ignored() {
        let schema = SchemaDescriptor::new().with_entity(
            EntityDescriptor::new("Order", ["id"]).relation(
                "lines",
                RelationDescriptor::new("OrderLine").on_delete(OnDelete::Cascade),
            ),
        );
        assert!(RelationshipCatalog::build(&schema).unwrap().is_empty());
    }

    #[test]
    fn malformed_relations_are_skipped() {
        let schema = SchemaDescriptor::new()
            .with_entity(EntityDescriptor::new("Tenant", ["tenant_id", "id"]))
            .with_entity(
                EntityDescriptor::new("User", ["id"])
                    .relation("ghost", RelationDescriptor::cascade("Ghost", ["ghost_id"]))
                    .relation("tenant", RelationDescriptor::cascade("Tenant", ["tenant_id"]))
                    .relation(
                        "by_code",
                        RelationDescriptor::cascade("Tenant", ["a", "b"]).references(["code", "id"]),
                    ),
            );
        let catalog = RelationshipCatalog::build(&schema).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn reordered_key_references_bind_in_key_order() {
        let schema = SchemaDescriptor::new()
            .with_entity(EntityDescriptor::new("Account", ["tenant_id", "id"]))
            .with_entity(
                EntityDescriptor::new("Membership", ["id"]).relation(
                    "account",
                    RelationDescriptor::cascade("Account", ["account_id", "tenant_id"])
                        .references(["id", "tenant_id"]),
                ),
            );
        let catalog = RelationshipCatalog::build(&schema).unwrap();
        let edges = catalog.edges_from("Account");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].foreign_key, vec!["tenant_id", "account_id"]);
    }

    #[test]
    fn partial_or_repeated_references_are_rejected() {
        let schema = SchemaDescriptor::new()
            .with_entity(EntityDescriptor::new("Account", ["tenant_id", "id"]))
            .with_entity(
                EntityDescriptor::new("Membership", ["id"])
                    .relation(
                        "twice",
                        RelationDescriptor::cascade("Account", ["a", "b"]).references(["id", "id"]),
                    )
                    .relation(
                        "short",
                        RelationDescriptor::cascade("Account", ["a", "b"]).references(["id"]),
                    ),
            );
        assert!(RelationshipCatalog::build(&schema).unwrap().is_empty());
    }

    #[test]
    fn resolver_degrades_to_empty_on_invalid_schema() {
        let schema = SchemaDescriptor::new()
            .with_entity(EntityDescriptor::new("Order", ["id"]))
            .with_entity(EntityDescriptor::new("Order", ["id"]));
        let resolver = CascadeResolver::from_schema(&schema);
        assert!(resolver.resolve("Order").is_empty());
    }

    #[test]
    fn unknown_entity_resolves_to_nothing() {
        let resolver = CascadeResolver::from_schema(&shop());
        assert!(resolver.resolve("Invoice").is_empty());
        assert_eq!(resolver.resolve("Order").len(), 2);
    }
}
