//! Configuration loader with multi-source merging

use crate::{MarqueeConfig, Paths};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "MARQUEE".to_string(),
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "MARQUEE")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<MarqueeConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = MarqueeConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. User config (~/.config/marquee/config.toml)
        let paths = Paths::new();
        if let Ok(user_config_file) = paths.user_config_file() {
            if user_config_file.exists() {
                builder = builder.add_source(
                    config::File::from(user_config_file)
                        .required(false)
                        .format(config::FileFormat::Toml),
                );
            }
        }

        // 3. Project config (marquee.toml)
        let project_config_file = Paths::project_config_file(&self.project_dir);
        if project_config_file.exists() {
            builder = builder.add_source(
                config::File::from(project_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 4. Local config (marquee.local.toml, gitignored)
        let local_config_file = Paths::local_config_file(&self.project_dir);
        if local_config_file.exists() {
            builder = builder.add_source(
                config::File::from(local_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 5. Environment variables (MARQUEE_*)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let mut marquee_config: MarqueeConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        marquee_config.resolve_paths(&self.project_dir);
        marquee_config
            .validate()
            .context("Configuration failed validation")?;

        Ok(marquee_config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default(self) -> MarqueeConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_types::ResourceType;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = ConfigLoader::new()
            .with_project_dir(temp_dir.path())
            .load()
            .expect("Failed to load config");

        assert_eq!(config.project.name, "marquee-console");
        assert_eq!(
            config.delegation.exclusive_resource_type,
            ResourceType::Voucher
        );
    }

    #[test]
    fn test_load_project_config() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        let config_content = r#"
[project]
name = "box-office"

[delegation]
audit_enabled = false

[store]
state_file = "data/permissions.json"
"#;
        fs::write(project_dir.join("marquee.toml"), config_content)
            .expect("Failed to write config");

        let config = ConfigLoader::new()
            .with_project_dir(project_dir)
            .load()
            .expect("Failed to load config");

        assert_eq!(config.project.name, "box-office");
        assert!(!config.delegation.audit_enabled);
        assert_eq!(
            config.store.state_file,
            project_dir.join("data/permissions.json")
        );
    }

    #[test]
    fn test_local_overrides() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("marquee.toml"),
            r#"
[project]
name = "box-office"
"#,
        )
        .expect("Failed to write project config");

        fs::write(
            project_dir.join("marquee.local.toml"),
            r#"
[project]
name = "box-office-local"
"#,
        )
        .expect("Failed to write local config");

        let config = ConfigLoader::new()
            .with_project_dir(project_dir)
            .load()
            .expect("Failed to load config");

        // Local config should override project config
        assert_eq!(config.project.name, "box-office-local");
    }

    // Environment overrides use a double-underscore separator so that field
    // names containing underscores survive, e.g.
    //
    // MARQUEE_DELEGATION__AUDIT_ENABLED=false
    // MARQUEE_STORE__STATE_FILE=/srv/marquee/state.json
    //
    // The config crate caches process environment, so this is not unit tested.

    #[test]
    fn test_invalid_project_config_is_rejected() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("marquee.toml"),
            r#"
[catalog]
include_standard = false
"#,
        )
        .expect("Failed to write config");

        let result = ConfigLoader::new().with_project_dir(project_dir).load();
        assert!(result.is_err());
    }

    #[test]
    fn test_path_resolution() {
        let temp_dir = tempdir().expect("Failed to create temp dir");

        let config = ConfigLoader::new()
            .with_project_dir(temp_dir.path())
            .load()
            .expect("Failed to load config");

        assert!(config.store.state_file.is_absolute());
    }
}
