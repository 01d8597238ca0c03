//! Project-local TOML layering.

use figment::Jail;
use pretty_assertions::assert_eq;
use vestige_config::{ConfigError, VestigeConfig};
use vestige_core::audit::CaptureDepth;

fn write_project_config(jail: &mut Jail, body: &str) -> figment::error::Result<()> {
    std::fs::create_dir_all(jail.directory().join(".vestige")).map_err(|e| e.to_string())?;
    jail.create_file(".vestige/config.toml", body)?;
    Ok(())
}

#[test]
fn defaults_without_files() {
    Jail::expect_with(|_jail| {
        let config = VestigeConfig::load().expect("config loads");
        assert_eq!(config.database.path, ".vestige/vestige.db");
        assert_eq!(config.audit.capture_depth, CaptureDepth::Direct);
        assert!(!config.schema.is_configured());
        Ok(())
    });
}

#[test]
fn project_toml_overrides_defaults() {
    Jail::expect_with(|jail| {
        write_project_config(
            jail,
            r#"
            [database]
            path = "data/app.db"

            [audit]
            capture_depth = "transitive"
            max_depth = 3

            [schema]
            path = "schema.toml"
            "#,
        )?;

        let config = VestigeConfig::load().expect("config loads");
        assert_eq!(config.database.path, "data/app.db");
        assert!(config.database.foreign_keys);
        assert_eq!(config.audit.capture_depth, CaptureDepth::Transitive);
        assert_eq!(config.audit.max_depth, 3);
        assert_eq!(config.schema.path, "schema.toml");
        Ok(())
    });
}

#[test]
fn invalid_depth_value_fails_extraction() {
    Jail::expect_with(|jail| {
        write_project_config(jail, "[audit]\ncapture_depth = \"sideways\"\n")?;
        let err = VestigeConfig::load().unwrap_err();
        assert!(matches!(err, ConfigError::Figment(_)), "got {err:?}");
        Ok(())
    });
}

#[test]
fn zero_max_depth_fails_validation() {
    Jail::expect_with(|jail| {
        write_project_config(jail, "[audit]\nmax_depth = 0\n")?;
        let err = VestigeConfig::load().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }), "got {err:?}");
        Ok(())
    });
}
