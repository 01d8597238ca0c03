//! Raw record access over the declared schema.
//!
//! [`RecordStore`] is the data-access seam: the libSQL implementation talks
//! to tables directly, and the deletion interceptor implements the same trait
//! on top of any inner store so callers cannot tell the two apart.

use std::sync::Arc;

use async_trait::async_trait;
use vestige_core::record::{Predicate, Record};
use vestige_core::schema::{EntityDescriptor, SchemaDescriptor};

use crate::VestigeDb;
use crate::error::DatabaseError;
use crate::helpers::{collect_records, json_to_sql};
use crate::sql::{quote_ident, where_clause};

/// Entity-typed record operations.
///
/// Single-record operations (`find_unique`, `delete`) require a predicate
/// that binds the primary key or a declared unique field set.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// The one record matching `predicate`, if any.
    async fn find_unique(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<Option<Record>, DatabaseError>;

    /// Every record matching `predicate`. The empty predicate matches all.
    async fn find_many(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<Vec<Record>, DatabaseError>;

    /// Insert `record` and return the row as stored.
    async fn create(&self, entity: &str, record: &Record) -> Result<Record, DatabaseError>;

    /// Delete the one record matching `predicate`, returning its last state.
    /// `None` when nothing matched.
    async fn delete(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<Option<Record>, DatabaseError>;

    /// Delete every record matching `predicate`, returning how many were removed.
    async fn delete_many(&self, entity: &str, predicate: &Predicate)
    -> Result<u64, DatabaseError>;
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    async fn find_unique(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<Option<Record>, DatabaseError> {
        (**self).find_unique(entity, predicate).await
    }

    async fn find_many(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<Vec<Record>, DatabaseError> {
        (**self).find_many(entity, predicate).await
    }

    async fn create(&self, entity: &str, record: &Record) -> Result<Record, DatabaseError> {
        (**self).create(entity, record).await
    }

    async fn delete(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<Option<Record>, DatabaseError> {
        (**self).delete(entity, predicate).await
    }

    async fn delete_many(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<u64, DatabaseError> {
        (**self).delete_many(entity, predicate).await
    }
}

/// [`RecordStore`] backed by the tables of a [`VestigeDb`].
#[derive(Clone)]
pub struct LibsqlStore {
    db: Arc<VestigeDb>,
    schema: Arc<SchemaDescriptor>,
}

impl LibsqlStore {
    #[must_use]
    pub const fn new(db: Arc<VestigeDb>, schema: Arc<SchemaDescriptor>) -> Self {
        Self { db, schema }
    }

    #[must_use]
    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    fn entity(&self, name: &str) -> Result<&EntityDescriptor, DatabaseError> {
        self.schema
            .entity(name)
            .ok_or_else(|| DatabaseError::UnknownEntity(name.to_string()))
    }

    fn unique_entity(
        &self,
        name: &str,
        predicate: &Predicate,
    ) -> Result<&EntityDescriptor, DatabaseError> {
        let entity = self.entity(name)?;
        if !entity.is_unique_predicate(predicate) {
            return Err(DatabaseError::NotUnique {
                entity: name.to_string(),
            });
        }
        Ok(entity)
    }

    async fn select(
        &self,
        entity: &EntityDescriptor,
        predicate: &Predicate,
        limit: Option<u32>,
    ) -> Result<Vec<Record>, DatabaseError> {
        let mut params = Vec::new();
        let filter = where_clause(predicate, &mut params)?;
        let limit = limit.map(|n| format!(" LIMIT {n}")).unwrap_or_default();
        let sql = format!(
            "SELECT * FROM {}{filter}{limit}",
            quote_ident(entity.table_name())?
        );
        let rows = self
            .db
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await
            .map_err(|e| DatabaseError::Query(format!("{}: {e}", entity.name)))?;
        collect_records(rows).await
    }
}

#[async_trait]
impl RecordStore for LibsqlStore {
    async fn find_unique(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<Option<Record>, DatabaseError> {
        let entity = self.unique_entity(entity, predicate)?;
        Ok(self.select(entity, predicate, Some(1)).await?.into_iter().next())
    }

    async fn find_many(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<Vec<Record>, DatabaseError> {
        let entity = self.entity(entity)?;
        self.select(entity, predicate, None).await
    }

    async fn create(&self, entity: &str, record: &Record) -> Result<Record, DatabaseError> {
        let entity = self.entity(entity)?;
        let table = quote_ident(entity.table_name())?;

        let sql = if record.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES RETURNING *")
        } else {
            let columns = record
                .keys()
                .map(|c| quote_ident(c))
                .collect::<Result<Vec<_>, _>>()?
                .join(", ");
            let placeholders = (1..=record.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("INSERT INTO {table} ({columns}) VALUES ({placeholders}) RETURNING *")
        };
        let params: Vec<libsql::Value> = record.values().map(json_to_sql).collect();

        let rows = self
            .db
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await
            .map_err(|e| DatabaseError::Query(format!("insert {}: {e}", entity.name)))?;
        collect_records(rows)
            .await?
            .into_iter()
            .next()
            .ok_or(DatabaseError::NoResult)
    }

    async fn delete(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<Option<Record>, DatabaseError> {
        let entity = self.unique_entity(entity, predicate)?;
        let mut params = Vec::new();
        let filter = where_clause(predicate, &mut params)?;
        let sql = format!(
            "DELETE FROM {}{filter} RETURNING *",
            quote_ident(entity.table_name())?
        );
        let rows = self
            .db
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await
            .map_err(|e| DatabaseError::Query(format!("delete {}: {e}", entity.name)))?;
        // Drain fully so the statement runs to completion.
        Ok(collect_records(rows).await?.into_iter().next())
    }

    async fn delete_many(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<u64, DatabaseError> {
        let entity = self.entity(entity)?;
        let mut params = Vec::new();
        let filter = where_clause(predicate, &mut params)?;
        let sql = format!("DELETE FROM {}{filter}", quote_ident(entity.table_name())?);
        self.db
            .conn()
            .execute(&sql, libsql::params_from_iter(params))
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_many {}: {e}", entity.name)))
    }
}
