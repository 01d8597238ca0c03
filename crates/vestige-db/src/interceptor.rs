//! Delete interception with cascade capture and audit.
//!
//! [`DeleteInterceptor`] wraps any [`RecordStore`] and is itself one, so it
//! drops in wherever the raw store was used. Reads and creates pass straight
//! through. Each `delete`/`delete_many` runs:
//!
//! ```text
//! Idle -> Capturing -> Deleting -> Auditing -> Done
//!             |            ^
//!             +-> CaptureFailed
//! ```
//!
//! Capture happens before the real delete and audit writes after it. Only
//! the real delete can fail the call; capture and audit problems are logged
//! and swallowed. Nothing is locked between capture and delete, so a row
//! changed in that window is audited as it was read. A single delete that
//! removes nothing (another request got there first) writes no entry.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use vestige_config::AuditConfig;
use vestige_core::audit::{CaptureDepth, CascadeMap, DeletionAuditRecord};
use vestige_core::record::{Predicate, Record, RecordKey};
use vestige_core::schema::SchemaDescriptor;

use crate::actor::{ActorContext, ActorSupplier};
use crate::audit::AuditStore;
use crate::catalog::CascadeResolver;
use crate::error::DatabaseError;
use crate::snapshot::SnapshotCapturer;
use crate::store::RecordStore;

/// Per-invocation progress, reported in log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePhase {
    Idle,
    Capturing,
    CaptureFailed,
    Deleting,
    Auditing,
    Done,
}

impl DeletePhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Capturing => "capturing",
            Self::CaptureFailed => "capture_failed",
            Self::Deleting => "deleting",
            Self::Auditing => "auditing",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for DeletePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime switches for the interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterceptOptions {
    /// When false, deletes pass straight through.
    pub enabled: bool,
    pub depth: CaptureDepth,
    pub max_depth: usize,
}

impl Default for InterceptOptions {
    fn default() -> Self {
        Self::from(&AuditConfig::default())
    }
}

impl From<&AuditConfig> for InterceptOptions {
    fn from(config: &AuditConfig) -> Self {
        Self {
            enabled: config.enabled,
            depth: config.capture_depth,
            max_depth: config.max_depth,
        }
    }
}

/// A row read before deletion, with its key and captured children.
struct Snapshot {
    key: Option<RecordKey>,
    record: Record,
    cascade: CascadeMap,
}

/// [`RecordStore`] that audits every delete of the store it wraps.
pub struct DeleteInterceptor<S> {
    inner: S,
    schema: Arc<SchemaDescriptor>,
    resolver: Arc<CascadeResolver>,
    audit: Arc<dyn AuditStore>,
    actor: ActorSupplier,
    options: InterceptOptions,
}

impl<S: RecordStore> DeleteInterceptor<S> {
    /// Wrap `inner`, resolving cascades from `schema` and attributing
    /// deletes to the ambient [`ActorContext`].
    pub fn new(inner: S, schema: Arc<SchemaDescriptor>, audit: Arc<dyn AuditStore>) -> Self {
        let resolver = Arc::new(CascadeResolver::from_schema(&schema));
        Self {
            inner,
            schema,
            resolver,
            audit,
            actor: ActorContext::supplier(),
            options: InterceptOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: InterceptOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the actor accessor (defaults to [`ActorContext::current`]).
    #[must_use]
    pub fn with_actor_supplier(mut self, actor: ActorSupplier) -> Self {
        self.actor = actor;
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<CascadeResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// The wrapped store. Deletes through it are not audited.
    #[must_use]
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    #[must_use]
    pub fn resolver(&self) -> &CascadeResolver {
        &self.resolver
    }

    #[must_use]
    pub const fn options(&self) -> InterceptOptions {
        self.options
    }

    async fn snapshot(&self, entity: &str, record: Record) -> Snapshot {
        let key = self.schema.entity(entity).and_then(|e| e.key_of(&record));
        let cascade = match key {
            Some(ref key) => {
                SnapshotCapturer::new(&self.inner, &self.schema, &self.resolver)
                    .depth(self.options.depth, self.options.max_depth)
                    .capture(entity, key)
                    .await
            }
            None => {
                tracing::warn!(
                    entity,
                    phase = %DeletePhase::CaptureFailed,
                    "intercept: record has no readable primary key, cascade not captured"
                );
                CascadeMap::new()
            }
        };
        Snapshot {
            key,
            record,
            cascade,
        }
    }

    async fn write_audit(&self, entity: &str, snapshot: Snapshot, actor: Option<String>) {
        let record = DeletionAuditRecord::new(
            entity,
            snapshot.key.as_ref(),
            snapshot.record,
            snapshot.cascade,
            actor,
        );
        match self.audit.append(&record).await {
            Ok(id) => {
                tracing::debug!(
                    entity,
                    key = %record.primary_key,
                    audit_id = id,
                    cascade = record.cascade_summary().as_deref().unwrap_or("none"),
                    phase = %DeletePhase::Done,
                    "intercept: deletion audited"
                );
            }
            Err(error) => {
                tracing::error!(
                    entity,
                    key = %record.primary_key,
                    %error,
                    "intercept: failed to write deletion audit"
                );
            }
        }
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for DeleteInterceptor<S> {
    async fn find_unique(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<Option<Record>, DatabaseError> {
        self.inner.find_unique(entity, predicate).await
    }

    async fn find_many(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<Vec<Record>, DatabaseError> {
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
        tracing::debug!(
            entity,
            enabled = self.options.enabled,
            phase = %DeletePhase::Idle,
            "intercept: delete"
        );
        if !self.options.enabled {
            return self.inner.delete(entity, predicate).await;
        }

        tracing::debug!(entity, phase = %DeletePhase::Capturing, "intercept: delete");
        let snapshot = match self.inner.find_unique(entity, predicate).await {
            Ok(Some(record)) => Some(self.snapshot(entity, record).await),
            Ok(None) => None,
            Err(error) => {
                tracing::warn!(
                    entity,
                    %error,
                    phase = %DeletePhase::CaptureFailed,
                    "intercept: pre-delete read failed, deleting without audit"
                );
                None
            }
        };

        tracing::debug!(entity, phase = %DeletePhase::Deleting, "intercept: delete");
        let deleted = self.inner.delete(entity, predicate).await?;

        match (snapshot, &deleted) {
            (Some(snapshot), Some(_)) => {
                tracing::debug!(entity, phase = %DeletePhase::Auditing, "intercept: delete");
                self.write_audit(entity, snapshot, (self.actor)()).await;
            }
            (Some(snapshot), None) => {
                tracing::debug!(
                    entity,
                    key = ?snapshot.key,
                    phase = %DeletePhase::Done,
                    "intercept: row already gone, nothing to audit"
                );
            }
            (None, _) => {}
        }
        Ok(deleted)
    }

    async fn delete_many(
        &self,
        entity: &str,
        predicate: &Predicate,
    ) -> Result<u64, DatabaseError> {
        tracing::debug!(
            entity,
            enabled = self.options.enabled,
            phase = %DeletePhase::Idle,
            "intercept: delete_many"
        );
        if !self.options.enabled {
            return self.inner.delete_many(entity, predicate).await;
        }

        tracing::debug!(entity, phase = %DeletePhase::Capturing, "intercept: delete_many");
        let targets = match self.inner.find_many(entity, predicate).await {
            Ok(records) => records,
            Err(error) => {
                tracing::warn!(
                    entity,
                    %error,
                    phase = %DeletePhase::CaptureFailed,
                    "intercept: pre-delete read failed, deleting without audit"
                );
                Vec::new()
            }
        };
        let mut snapshots = Vec::with_capacity(targets.len());
        for record in targets {
            snapshots.push(self.snapshot(entity, record).await);
        }

        tracing::debug!(
            entity,
            targets = snapshots.len(),
            phase = %DeletePhase::Deleting,
            "intercept: delete_many"
        );
        let count = self.inner.delete_many(entity, predicate).await?;

        if !snapshots.is_empty() {
            tracing::debug!(entity, phase = %DeletePhase::Auditing, "intercept: delete_many");
            let actor = (self.actor)();
            for snapshot in snapshots {
                self.write_audit(entity, snapshot, actor.clone()).await;
            }
        }
        Ok(count)
    }
}
