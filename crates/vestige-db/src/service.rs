//! Service layer wiring the store, interceptor, and deletion history.
//!
//! `VestigeService` owns one `VestigeDb` shared by the raw record store and
//! the audit store, and exposes the intercepted store as the default way to
//! touch records.

use std::path::Path;
use std::sync::Arc;

use vestige_config::VestigeConfig;
use vestige_core::audit::DeletionAuditRecord;
use vestige_core::schema::SchemaDescriptor;

use crate::VestigeDb;
use crate::audit::{AuditFilter, AuditStore, LibsqlAuditStore};
use crate::error::DatabaseError;
use crate::interceptor::{DeleteInterceptor, InterceptOptions};
use crate::store::LibsqlStore;

/// Audited record access over one libSQL database.
pub struct VestigeService {
    db: Arc<VestigeDb>,
    schema: Arc<SchemaDescriptor>,
    store: DeleteInterceptor<LibsqlStore>,
    audit: Arc<LibsqlAuditStore>,
}

impl VestigeService {
    /// Open a local database and wire it to `schema` with default options.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new_local(db_path: &str, schema: SchemaDescriptor) -> Result<Self, DatabaseError> {
        let db = VestigeDb::open_local(db_path).await?;
        Ok(Self::from_db(db, schema, InterceptOptions::default()))
    }

    /// Open the configured database and schema file.
    ///
    /// An unset `schema.path` yields an empty schema: deletes are still
    /// audited, just without cascade children.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Schema` if the schema file cannot be loaded,
    /// or `DatabaseError` if the database cannot be opened.
    pub async fn from_config(config: &VestigeConfig) -> Result<Self, DatabaseError> {
        let schema = if config.schema.is_configured() {
            SchemaDescriptor::from_path(Path::new(&config.schema.path))?
        } else {
            tracing::debug!("service: no schema configured");
            SchemaDescriptor::new()
        };
        let db =
            VestigeDb::open_local_with(&config.database.path, config.database.foreign_keys).await?;
        Ok(Self::from_db(db, schema, InterceptOptions::from(&config.audit)))
    }

    /// Wire an already-open database.
    #[must_use]
    pub fn from_db(db: VestigeDb, schema: SchemaDescriptor, options: InterceptOptions) -> Self {
        let db = Arc::new(db);
        let schema = Arc::new(schema);
        let audit = Arc::new(LibsqlAuditStore::new(Arc::clone(&db)));
        let raw = LibsqlStore::new(Arc::clone(&db), Arc::clone(&schema));
        let store = DeleteInterceptor::new(
            raw,
            Arc::clone(&schema),
            Arc::clone(&audit) as Arc<dyn AuditStore>,
        )
        .with_options(options);
        Self {
            db,
            schema,
            store,
            audit,
        }
    }

    /// The intercepted store. Deletes through it are audited.
    #[must_use]
    pub const fn store(&self) -> &DeleteInterceptor<LibsqlStore> {
        &self.store
    }

    /// The raw store, bypassing deletion auditing.
    #[must_use]
    pub const fn raw(&self) -> &LibsqlStore {
        self.store.inner()
    }

    #[must_use]
    pub fn audit(&self) -> &LibsqlAuditStore {
        &self.audit
    }

    #[must_use]
    pub fn db(&self) -> &VestigeDb {
        &self.db
    }

    #[must_use]
    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    /// Deletion history matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn query_history(
        &self,
        filter: &AuditFilter,
    ) -> Result<Vec<DeletionAuditRecord>, DatabaseError> {
        self.audit.query(filter).await
    }

    /// One deletion history entry.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` if `id` does not exist.
    pub async fn history_entry(&self, id: i64) -> Result<DeletionAuditRecord, DatabaseError> {
        self.audit.get(id).await
    }
}
