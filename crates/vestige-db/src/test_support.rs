//! Shared fixtures and fault-injecting doubles for vestige-db unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use vestige_core::audit::DeletionAuditRecord;
use vestige_core::record::{Predicate, Record};
use vestige_core::schema::{EntityDescriptor, RelationDescriptor, SchemaDescriptor};

use crate::VestigeDb;
use crate::audit::AuditStore;
use crate::error::DatabaseError;
use crate::store::{LibsqlStore, RecordStore};

pub const SHOP_DDL: &str = "
CREATE TABLE orders (
    id TEXT PRIMARY KEY,
    status TEXT NOT NULL
);
CREATE TABLE order_lines (
    id TEXT PRIMARY KEY,
    order_id TEXT NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
    line_no INTEGER NOT NULL,
    UNIQUE (order_id, line_no)
);
";

/// `Order` ← `OrderLine.order` (cascade via `order_id`).
pub fn shop_schema() -> SchemaDescriptor {
    SchemaDescriptor::new()
        .with_entity(EntityDescriptor::new("Order", ["id"]).table("orders"))
        .with_entity(
            EntityDescriptor::new("OrderLine", ["id"])
                .table("order_lines")
                .unique(["order_id", "line_no"])
                .relation("order", RelationDescriptor::cascade("Order", ["order_id"])),
        )
}

pub fn order(id: &str, status: &str) -> Record {
    json!({"id": id, "status": status})
        .as_object()
        .cloned()
        .unwrap()
}

pub fn order_line(id: &str, order_id: &str, line_no: i64) -> Record {
    json!({"id": id, "order_id": order_id, "line_no": line_no})
        .as_object()
        .cloned()
        .unwrap()
}

/// In-memory shop with orders `o1` (lines `l1`, `l2`) and `o2` (line `l3`).
pub async fn seeded_store() -> (Arc<VestigeDb>, LibsqlStore) {
    let db = Arc::new(VestigeDb::open_local(":memory:").await.unwrap());
    db.execute_batch(SHOP_DDL).await.unwrap();
    let store = LibsqlStore::new(Arc::clone(&db), Arc::new(shop_schema()));

    for o in [order("o1", "OPEN"), order("o2", "OPEN")] {
        store.create("Order", &o).await.unwrap();
    }
    for line in [
        order_line("l1", "o1", 1),
        order_line("l2", "o1", 2),
        order_line("l3", "o2", 1),
    ] {
        store.create("OrderLine", &line).await.unwrap();
    }
    (db, store)
}

/// Store whose `find_many` fails for one entity type.
pub struct FailingFindStore<S> {
    inner: S,
    entity: &'static str,
}

impl<S> FailingFindStore<S> {
    pub const fn new(inner: S, entity: &'static str) -> Self {
        Self { inner, entity }
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for FailingFindStore<S> {
    async fn find_unique(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<Option<Record>, DatabaseError> {
        if entity == self.entity {
            return Err(DatabaseError::Query("injected find failure".into()));
        }
        self.inner.find_unique(entity, predicate).await
    }

    async fn find_many(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<Vec<Record>, DatabaseError> {
        if entity == self.entity {
            return Err(DatabaseError::Query("injected find failure".into()));
        }
        self.inner.find_many(entity, predicate).await
    }

    async fn create(&self, entity: &str, record: &Record) -> Result<Record, DatabaseError> {
        self.inner.create(entity, record).await
    }

    async fn delete(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<Option<Record>, DatabaseError> {
        self.inner.delete(entity, predicate).await
    }

    async fn delete_many(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<u64, DatabaseError> {
        self.inner.delete_many(entity, predicate).await
    }
}

/// Store whose deletes always fail, reads pass through.
pub struct FailingDeleteStore<S>(pub S);

#[async_trait]
impl<S: RecordStore> RecordStore for FailingDeleteStore<S> {
    async fn find_unique(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<Option<Record>, DatabaseError> {
        self.0.find_unique(entity, predicate).await
    }

    async fn find_many(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<Vec<Record>, DatabaseError> {
        self.0.find_many(entity, predicate).await
    }

    async fn create(&self, entity: &str, record: &Record) -> Result<Record, DatabaseError> {
        self.0.create(entity, record).await
    }

    async fn delete(
        &self,
        _entity: &str,
        _predicate: &Predicate,
    ) -> Result<Option<Record>, DatabaseError> {
        Err(DatabaseError::Query("injected delete failure".into()))
    }

    async fn delete_many(
        &self,
        _entity: &str,
        _predicate: &Predicate,
    ) -> Result<u64, DatabaseError> {
        Err(DatabaseError::Query("injected delete failure".into()))
    }
}

/// Store whose `delete` loses a race: another deleter removes the row
/// first, then the real delete runs and finds nothing.
pub struct RacingDeleteStore<S>(pub S);

#[async_trait]
impl<S: RecordStore> RecordStore for RacingDeleteStore<S> {
    async fn find_unique(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<Option<Record>, DatabaseError> {
        self.0.find_unique(entity, predicate).await
    }

    async fn find_many(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<Vec<Record>, DatabaseError> {
        self.0.find_many(entity, predicate).await
    }

    async fn create(&self, entity: &str, record: &Record) -> Result<Record, DatabaseError> {
        self.0.create(entity, record).await
    }

    async fn delete(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<Option<Record>, DatabaseError> {
        self.0.delete(entity, predicate).await?;
        self.0.delete(entity, predicate).await
    }

    async fn delete_many(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<u64, DatabaseError> {
        self.0.delete_many(entity, predicate).await
    }
}

/// Audit store that keeps appended records in memory, optionally refusing
/// one primary key.
#[derive(Default)]
pub struct RecordingAuditStore {
    records: Mutex<Vec<DeletionAuditRecord>>,
    fail_key: Option<String>,
}

impl RecordingAuditStore {
    pub fn failing_for(key: &str) -> Self {
        Self {
            records: Mutex::default(),
            fail_key: Some(key.to_string()),
        }
    }

    pub fn records(&self) -> Vec<DeletionAuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditStore for RecordingAuditStore {
    async fn append(&self, record: &DeletionAuditRecord) -> Result<i64, DatabaseError> {
        if self.fail_key.as_deref() == Some(record.primary_key.as_str()) {
            return Err(DatabaseError::Query("injected audit failure".into()));
        }
        let mut records = self.records.lock().unwrap();
        records.push(record.clone());
        Ok(i64::try_from(records.len()).unwrap())
    }
}

/// Audit store whose writes always fail.
pub struct FailingAuditStore;

#[async_trait]
impl AuditStore for FailingAuditStore {
    async fn append(&self, _record: &DeletionAuditRecord) -> Result<i64, DatabaseError> {
        Err(DatabaseError::Query("injected audit failure".into()))
    }
}
