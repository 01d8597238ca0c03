use clap::Parser;

pub mod global;
pub mod root_commands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `vst` binary.
#[derive(Debug, Parser)]
#[command(name = "vst", version, about = "Vestige - cascade-aware deletion history")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, table, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Max results to return
    #[arg(short, long, global = true)]
    pub limit: Option<u32>,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Database path (overrides `database.path`)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Schema descriptor path (overrides `schema.path`)
    #[arg(long, global = true)]
    pub schema: Option<String>,
}

impl Cli {
    /// Extract ergonomic global flags struct for command handlers.
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            limit: self.limit,
            quiet: self.quiet,
            verbose: self.verbose,
            db: self.db.clone(),
            schema: self.schema.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Commands, OutputFormat};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_before_subcommand() {
        let cli = Cli::try_parse_from([
            "vst", "--format", "table", "--limit", "10", "--verbose", "catalog",
        ])
        .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Table);
        assert_eq!(cli.limit, Some(10));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Catalog(_)));
    }

    #[test]
    fn history_filters_parse() {
        let cli = Cli::try_parse_from([
            "vst",
            "history",
            "--entity-type",
            "Order",
            "--actor",
            "u1",
            "--db",
            "/tmp/v.db",
        ])
        .expect("cli should parse");

        let Commands::History(args) = &cli.command else {
            panic!("expected history");
        };
        assert_eq!(args.entity_type.as_deref(), Some("Order"));
        assert_eq!(args.actor.as_deref(), Some("u1"));
        assert_eq!(cli.global_flags().db.as_deref(), Some("/tmp/v.db"));
    }

    #[test]
    fn history_id_conflicts_with_filters() {
        let result = Cli::try_parse_from(["vst", "history", "--id", "3", "--actor", "u1"]);
        assert!(result.is_err());
    }
}
