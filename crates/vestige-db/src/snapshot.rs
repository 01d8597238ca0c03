//! Pre-delete capture of the rows a cascade is about to remove.

use std::future::Future;
use std::pin::Pin;

use vestige_core::audit::{CASCADE_KEY, CaptureDepth, CascadeMap, cascade_value};
use vestige_core::record::{Predicate, RecordKey};
use vestige_core::schema::SchemaDescriptor;

use crate::catalog::CascadeResolver;
use crate::store::RecordStore;

type CaptureFuture<'a> = Pin<Box<dyn Future<Output = CascadeMap> + Send + 'a>>;

/// Reads the children of one parent row through the cascade resolver.
///
/// Capture is read-only and never fails: a child query that errors is
/// logged and that child type is left out of the map.
pub struct SnapshotCapturer<'a, S: ?Sized> {
    store: &'a S,
    schema: &'a SchemaDescriptor,
    resolver: &'a CascadeResolver,
    depth: CaptureDepth,
    max_depth: usize,
}

impl<'a, S: RecordStore + ?Sized> SnapshotCapturer<'a, S> {
    #[must_use]
    pub const fn new(
        store: &'a S,
        schema: &'a SchemaDescriptor,
        resolver: &'a CascadeResolver,
    ) -> Self {
        Self {
            store,
            schema,
            resolver,
            depth: CaptureDepth::Direct,
            max_depth: 1,
        }
    }

    /// Follow edges past the direct children, up to `max_depth` levels.
    #[must_use]
    pub const fn depth(mut self, depth: CaptureDepth, max_depth: usize) -> Self {
        self.depth = depth;
        self.max_depth = max_depth;
        self
    }

    /// Child type → matching rows for every cascade edge leaving `entity`.
    ///
    /// Child types with no matching rows are omitted.
    pub async fn capture(&self, entity: &str, key: &RecordKey) -> CascadeMap {
        let mut path = vec![entity.to_string()];
        self.capture_level(entity, key.clone(), &mut path).await
    }

    fn capture_level<'s>(
        &'s self,
        entity: &'s str,
        key: RecordKey,
        path: &'s mut Vec<String>,
    ) -> CaptureFuture<'s> {
        Box::pin(async move {
            let mut cascade = CascadeMap::new();

            for edge in self.resolver.resolve(entity) {
                if edge.foreign_key.len() != key.len() {
                    tracing::warn!(
                        entity,
                        %key,
                        edge = %edge,
                        "capture: key arity does not match edge, skipping"
                    );
                    continue;
                }

                let predicate = Predicate::for_key(&edge.foreign_key, &key);
                let mut rows = match self.store.find_many(&edge.child, &predicate).await {
                    Ok(rows) => rows,
                    Err(error) => {
                        tracing::warn!(
                            entity,
                            %key,
                            child = %edge.child,
                            %error,
                            "capture: cascade query failed, child omitted"
                        );
                        continue;
                    }
                };
                if rows.is_empty() {
                    continue;
                }

                if self.descends_into(&edge.child, path) {
                    path.push(edge.child.clone());
                    for row in &mut rows {
                        let Some(child_key) = self
                            .schema
                            .entity(&edge.child)
                            .and_then(|child| child.key_of(row))
                        else {
                            continue;
                        };
                        let nested = self.capture_level(&edge.child, child_key, path).await;
                        if !nested.is_empty() {
                            row.insert(CASCADE_KEY.to_string(), cascade_value(&nested));
                        }
                    }
                    path.pop();
                }

                tracing::debug!(entity, %key, child = %edge.child, rows = rows.len(), "capture: children");
                cascade.entry(edge.child.clone()).or_default().extend(rows);
            }

            cascade
        })
    }

    fn descends_into(&self, child: &str, path: &[String]) -> bool {
        if self.depth != CaptureDepth::Transitive {
            return false;
        }
        if path.len() >= self.max_depth {
            return false;
        }
        if path.iter().any(|visited| visited == child) {
            tracing::debug!(child, ?path, "capture: cycle, not descending");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::store::{LibsqlStore, RecordStore};
    use crate::test_support::{FailingFindStore, order_line, seeded_store, shop_schema};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use vestige_core::schema::{EntityDescriptor, RelationDescriptor};

    #[tokio::test]
    async fn captures_direct_children() {
        let (_db, store) = seeded_store().await;
        let schema = shop_schema();
        let resolver = CascadeResolver::from_schema(&schema);
        let capturer = SnapshotCapturer::new(&store, &schema, &resolver);

        let cascade = capturer.capture("Order", &RecordKey::single("o1")).await;
        assert_eq!(
            cascade.get("OrderLine"),
            Some(&vec![order_line("l1", "o1", 1), order_line("l2", "o1", 2)])
        );
        assert_eq!(cascade.len(), 1);
    }

    #[tokio::test]
    async fn no_edges_or_no_rows_yield_empty_map() {
        let (_db, store) = seeded_store().await;
        let schema = shop_schema();
        let resolver = CascadeResolver::from_schema(&schema);
        let capturer = SnapshotCapturer::new(&store, &schema, &resolver);

        assert!(capturer.capture("OrderLine", &RecordKey::single("l1")).await.is_empty());
        assert!(capturer.capture("Order", &RecordKey::single("o404")).await.is_empty());
    }

    #[tokio::test]
    async fn failing_child_query_is_omitted() {
        let (_db, store) = seeded_store().await;
        let store = FailingFindStore::new(store, "OrderLine");
        let schema = shop_schema();
        let resolver = CascadeResolver::from_schema(&schema);
        let capturer = SnapshotCapturer::new(&store, &schema, &resolver);

        assert!(capturer.capture("Order", &RecordKey::single("o1")).await.is_empty());
    }

    #[tokio::test]
    async fn failing_child_query_leaves_sibling_edges_intact() {
        let (db, _) = seeded_store().await;
        db.execute_batch(
            "CREATE TABLE order_notes (
                id TEXT PRIMARY KEY,
                order_id TEXT NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
                body TEXT NOT NULL
            );",
        )
        .await
        .unwrap();
        let schema = shop_schema().with_entity(
            EntityDescriptor::new("OrderNote", ["id"])
                .table("order_notes")
                .relation("order", RelationDescriptor::cascade("Order", ["order_id"])),
        );
        let raw = LibsqlStore::new(Arc::clone(&db), Arc::new(schema.clone()));
        let note = json!({"id": "n1", "order_id": "o1", "body": "gift wrap"})
            .as_object()
            .cloned()
            .unwrap();
        raw.create("OrderNote", &note).await.unwrap();

        let store = FailingFindStore::new(raw, "OrderLine");
        let resolver = CascadeResolver::from_schema(&schema);
        assert_eq!(resolver.resolve("Order").len(), 2);
        let capturer = SnapshotCapturer::new(&store, &schema, &resolver);

        let cascade = capturer.capture("Order", &RecordKey::single("o1")).await;
        assert_eq!(cascade.len(), 1);
        assert!(!cascade.contains_key("OrderLine"));
        assert_eq!(cascade.get("OrderNote"), Some(&vec![note]));
    }
}
