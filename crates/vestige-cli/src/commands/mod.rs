pub mod catalog;
pub mod history;

use vestige_config::VestigeConfig;

use crate::cli::{Commands, GlobalFlags};

/// Load layered config and apply command-line overrides.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<VestigeConfig> {
    let mut config = VestigeConfig::load_with_dotenv()?;
    if let Some(db) = &flags.db {
        config.database.path.clone_from(db);
    }
    if let Some(schema) = &flags.schema {
        config.schema.path.clone_from(schema);
    }
    config.validate()?;
    Ok(config)
}

/// Route a parsed command to its handler.
pub async fn dispatch(
    command: &Commands,
    config: &VestigeConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Catalog(args) => catalog::handle(args, config, flags),
        Commands::History(args) => history::handle(args, config, flags).await,
    }
}

/// Compute effective limit with precedence: global flag -> fallback.
#[must_use]
pub fn effective_limit(global: Option<u32>, fallback: u32) -> u32 {
    global.unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::effective_limit;

    #[test]
    fn global_used_when_set() {
        assert_eq!(effective_limit(Some(10), 50), 10);
    }

    #[test]
    fn fallback_used_when_none_set() {
        assert_eq!(effective_limit(None, 50), 50);
    }
}
