//! Configuration management for Marquee
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (MARQUEE_* prefix, highest precedence)
//! 2. marquee.local.toml (gitignored, local overrides)
//! 3. marquee.toml (git-tracked, project config)
//! 4. ~/.config/marquee/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)

use anyhow::Result;
use marquee_types::{PermissionDefinition, ResourceType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main Marquee configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarqueeConfig {
    pub project: ProjectConfig,
    pub catalog: CatalogConfig,
    pub delegation: DelegationConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "marquee-console".to_string(),
        }
    }
}

/// Permission catalog sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Seed the catalog with the built-in cinema permission set.
    pub include_standard: bool,
    /// Additional definitions appended after the built-in set.
    pub permissions: Vec<PermissionDefinition>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            include_standard: true,
            permissions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DelegationConfig {
    /// Resource type whose permissions form the single-holder category.
    pub exclusive_resource_type: ResourceType,
    /// Emit audit log events for every grant, revoke and transfer.
    pub audit_enabled: bool,
}

impl Default for DelegationConfig {
    fn default() -> Self {
        Self {
            exclusive_resource_type: ResourceType::Voucher,
            audit_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Snapshot file backing the in-memory store.
    pub state_file: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from(".marquee/state.json"),
        }
    }
}

impl MarqueeConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Load a single TOML file without layering.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: MarqueeConfig =
            toml::from_str(&content).map_err(|source| ConfigError::ParseError {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// Create a development configuration
    pub fn development() -> Self {
        Self {
            delegation: DelegationConfig {
                audit_enabled: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Create a production configuration
    pub fn production() -> Self {
        Self {
            delegation: DelegationConfig {
                audit_enabled: true,
                ..Default::default()
            },
            store: StoreConfig {
                state_file: PathBuf::from("/var/lib/marquee/state.json"),
            },
            ..Default::default()
        }
    }

    /// Checks cross-field constraints the deserializer cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = BTreeSet::new();
        for def in &self.catalog.permissions {
            if def.permission_code.as_str().trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "catalog permission with empty code".to_string(),
                ));
            }
            if !seen.insert(def.permission_code.clone()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate catalog permission code {}",
                    def.permission_code
                )));
            }
        }

        if !self.catalog.include_standard && self.catalog.permissions.is_empty() {
            return Err(ConfigError::ValidationError(
                "catalog is empty: enable include_standard or list permissions".to_string(),
            ));
        }

        // The built-in catalog defines every non-custom resource type
        let exclusive = &self.delegation.exclusive_resource_type;
        let standard_covers = self.catalog.include_standard
            && !matches!(exclusive, ResourceType::Custom(_));
        let custom_covers = self
            .catalog
            .permissions
            .iter()
            .any(|def| &def.resource_type == exclusive);
        if !standard_covers && !custom_covers {
            return Err(ConfigError::ValidationError(format!(
                "exclusive resource type {exclusive} has no permissions in the catalog"
            )));
        }

        Ok(())
    }

    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        let base = base_dir.as_ref();

        if self.store.state_file.is_relative() {
            self.store.state_file = base.join(&self.store.state_file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_types::ActionType;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = MarqueeConfig::default();
        assert_eq!(config.project.name, "marquee-console");
        assert!(config.catalog.include_standard);
        assert_eq!(
            config.delegation.exclusive_resource_type,
            ResourceType::Voucher
        );
        assert!(config.delegation.audit_enabled);
    }

    #[test]
    fn test_development_config() {
        let config = MarqueeConfig::development();
        assert!(!config.delegation.audit_enabled);
    }

    #[test]
    fn test_production_config() {
        let config = MarqueeConfig::production();
        assert!(config.delegation.audit_enabled);
        assert!(config.store.state_file.is_absolute());
    }

    #[test]
    fn test_path_resolution() {
        let mut config = MarqueeConfig::default();
        config.resolve_paths("/home/user/project");

        assert_eq!(
            config.store.state_file,
            PathBuf::from("/home/user/project/.marquee/state.json")
        );
    }

    #[test]
    fn test_validate_rejects_duplicate_codes() {
        let mut config = MarqueeConfig::default();
        let def = PermissionDefinition::new(
            "LOYALTY_READ",
            "View loyalty points",
            ResourceType::custom("loyalty"),
            ActionType::Read,
        );
        config.catalog.permissions = vec![def.clone(), def];

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("LOYALTY_READ"));
    }

    #[test]
    fn test_validate_rejects_empty_catalog() {
        let mut config = MarqueeConfig::default();
        config.catalog.include_standard = false;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_exclusive_type_without_permissions() {
        let mut config = MarqueeConfig::default();
        config.catalog.permissions = vec![PermissionDefinition::new(
            "LOYALTY_READ",
            "View loyalty points",
            ResourceType::custom("loyalty"),
            ActionType::Read,
        )];
        config.delegation.exclusive_resource_type = ResourceType::custom("gift_card");

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("has no permissions"));

        // Built-in types are covered by the standard catalog only when included
        config.delegation.exclusive_resource_type = ResourceType::Voucher;
        assert!(config.validate().is_ok());
        config.catalog.include_standard = false;
        assert!(config.validate().is_err());

        config.delegation.exclusive_resource_type = ResourceType::custom("loyalty");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_file() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("console.toml");
        std::fs::write(
            &path,
            r#"
[project]
name = "box-office"

[delegation]
exclusive_resource_type = "VOUCHER"
audit_enabled = false

[[catalog.permissions]]
permissionCode = "LOYALTY_READ"
permissionName = "View loyalty points"
resourceType = { CUSTOM = "LOYALTY" }
actionType = "READ"
"#,
        )
        .expect("Failed to write config");

        let config = MarqueeConfig::from_toml_file(&path).expect("Failed to load config");
        assert_eq!(config.project.name, "box-office");
        assert!(!config.delegation.audit_enabled);
        assert_eq!(config.catalog.permissions.len(), 1);
        assert_eq!(
            config.catalog.permissions[0].resource_type,
            ResourceType::custom("loyalty")
        );
        assert!(config.store.state_file.starts_with(temp_dir.path()));
    }

    #[test]
    fn test_from_toml_file_reports_missing_file() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let result = MarqueeConfig::from_toml_file(temp_dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }
}
