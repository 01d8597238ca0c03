//! Append-only deletion history.
//!
//! Rows land in `deleted_history`; triggers on that table reject any
//! `UPDATE` or `DELETE`, so the only write path is [`AuditStore::append`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use vestige_core::audit::DeletionAuditRecord;

use crate::VestigeDb;
use crate::error::DatabaseError;
use crate::helpers::parse_datetime;

/// Sink for deletion audit records.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist one record and return its assigned id.
    async fn append(&self, record: &DeletionAuditRecord) -> Result<i64, DatabaseError>;
}

/// Filter criteria for deletion history queries.
#[derive(Debug, Default, Clone)]
pub struct AuditFilter {
    pub entity_type: Option<String>,
    pub object_id: Option<String>,
    pub actor_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

/// [`AuditStore`] writing to the `deleted_history` table.
#[derive(Clone)]
pub struct LibsqlAuditStore {
    db: Arc<VestigeDb>,
}

const SELECT_COLUMNS: &str =
    "SELECT id, entity_type, object_id, data, deleted_by, created_at FROM deleted_history";

impl LibsqlAuditStore {
    #[must_use]
    pub const fn new(db: Arc<VestigeDb>) -> Self {
        Self { db }
    }

    /// Query deletion history, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or a row cannot be decoded.
    pub async fn query(
        &self,
        filter: &AuditFilter,
    ) -> Result<Vec<DeletionAuditRecord>, DatabaseError> {
        let mut conditions = Vec::new();
        let mut params: Vec<libsql::Value> = Vec::new();

        if let Some(ref et) = filter.entity_type {
            params.push(libsql::Value::Text(et.clone()));
            conditions.push(format!("entity_type = ?{}", params.len()));
        }
        if let Some(ref oid) = filter.object_id {
            params.push(libsql::Value::Text(oid.clone()));
            conditions.push(format!("object_id = ?{}", params.len()));
        }
        if let Some(ref actor) = filter.actor_id {
            params.push(libsql::Value::Text(actor.clone()));
            conditions.push(format!("deleted_by = ?{}", params.len()));
        }
        if let Some(since) = filter.since {
            params.push(libsql::Value::Text(since.to_rfc3339()));
            conditions.push(format!("created_at >= ?{}", params.len()));
        }
        if let Some(until) = filter.until {
            params.push(libsql::Value::Text(until.to_rfc3339()));
            conditions.push(format!("created_at <= ?{}", params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let limit = filter.limit.unwrap_or(100);
        let sql = format!("{SELECT_COLUMNS} {where_clause} ORDER BY created_at DESC, id DESC LIMIT {limit}");

        let mut rows = self
            .db
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(row_to_audit(&row)?);
        }
        Ok(records)
    }

    /// Fetch one history row by id.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` if no row has that id.
    pub async fn get(&self, id: i64) -> Result<DeletionAuditRecord, DatabaseError> {
        let mut rows = self
            .db
            .conn()
            .query(&format!("{SELECT_COLUMNS} WHERE id = ?1"), libsql::params![id])
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_audit(&row)
    }

    /// Number of history rows.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn count(&self) -> Result<u64, DatabaseError> {
        let mut rows = self
            .db
            .conn()
            .query("SELECT COUNT(*) FROM deleted_history", ())
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(u64::try_from(row.get::<i64>(0)?).unwrap_or_default())
    }
}

#[async_trait]
impl AuditStore for LibsqlAuditStore {
    async fn append(&self, record: &DeletionAuditRecord) -> Result<i64, DatabaseError> {
        let data = serde_json::to_string(&record.payload())
            .map_err(|e| DatabaseError::Query(format!("payload: {e}")))?;
        let mut rows = self
            .db
            .conn()
            .query(
                "INSERT INTO deleted_history (entity_type, object_id, data, deleted_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING id",
                libsql::params![
                    record.entity_type.as_str(),
                    record.primary_key.as_str(),
                    data,
                    record.actor_id.as_deref(),
                    record.created_at.to_rfc3339()
                ],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<i64>(0)?)
    }
}

fn row_to_audit(row: &libsql::Row) -> Result<DeletionAuditRecord, DatabaseError> {
    let data = row.get::<String>(3)?;
    let payload: serde_json::Value = serde_json::from_str(&data)
        .map_err(|e| DatabaseError::Query(format!("history payload: {e}")))?;
    let (record, cascade_deleted) = DeletionAuditRecord::split_payload(payload);
    Ok(DeletionAuditRecord {
        id: Some(row.get::<i64>(0)?),
        entity_type: row.get::<String>(1)?,
        primary_key: row.get::<String>(2)?,
        record,
        cascade_deleted,
        actor_id: row.get::<Option<String>>(4)?,
        created_at: parse_datetime(&row.get::<String>(5)?)?,
    })
}
