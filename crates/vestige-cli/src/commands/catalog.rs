use std::path::Path;

use vestige_config::{ConfigError, VestigeConfig};
use vestige_core::schema::{CascadeEdge, SchemaDescriptor};
use vestige_db::catalog::RelationshipCatalog;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::CatalogArgs;
use crate::output::output;

/// Handle `vst catalog`.
pub fn handle(args: &CatalogArgs, config: &VestigeConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let edges = edges(args, config)?;
    output(&edges, flags.format)
}

/// Cascade edges of the configured schema, optionally limited to one parent.
pub fn edges(args: &CatalogArgs, config: &VestigeConfig) -> anyhow::Result<Vec<CascadeEdge>> {
    if !config.schema.is_configured() {
        return Err(ConfigError::NotConfigured {
            section: "schema".into(),
        }
        .into());
    }
    let schema = SchemaDescriptor::from_path(Path::new(&config.schema.path))?;
    let catalog = RelationshipCatalog::build(&schema)?;

    let edges = match args.entity.as_deref() {
        Some(entity) => catalog.edges_from(entity).to_vec(),
        None => catalog.iter().cloned().collect(),
    };
    tracing::debug!(edges = edges.len(), "catalog: listed");
    Ok(edges)
}
