use clap::{Args, Subcommand};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Print the cascade edges derived from the schema descriptor.
    Catalog(CatalogArgs),
    /// Query deletion history.
    History(HistoryArgs),
}

#[derive(Clone, Debug, Args)]
pub struct CatalogArgs {
    /// Only edges leaving this parent entity type.
    #[arg(long)]
    pub entity: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct HistoryArgs {
    /// Show a single history entry by id.
    #[arg(long, conflicts_with_all = ["entity_type", "object_id", "actor", "since", "until"])]
    pub id: Option<i64>,
    #[arg(long)]
    pub entity_type: Option<String>,
    #[arg(long)]
    pub object_id: Option<String>,
    #[arg(long)]
    pub actor: Option<String>,
    /// RFC 3339 lower bound, inclusive.
    #[arg(long)]
    pub since: Option<String>,
    /// RFC 3339 upper bound, inclusive.
    #[arg(long)]
    pub until: Option<String>,
}
