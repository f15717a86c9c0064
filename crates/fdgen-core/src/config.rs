//! Configuration for rule defaults, rendering and generation behaviour.
//!
//! Load order: `.fdgen/config.toml` → environment variables → defaults.

use crate::rules::RuleDefaults;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level fdgen configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FdgenConfig {
    pub rules: RuleDefaults,
    pub render: RenderConfig,
    pub generation: GenerationConfig,
}

/// Text rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Spaces per indentation level.
    pub indent: usize,
    /// Package declaration for rendered files; omitted when empty.
    pub package: String,
}

/// Generation behaviour.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Reject extension declarations whose site does not exist in the form,
    /// instead of logging and skipping them.
    pub strict_extensions: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            indent: 4,
            package: String::new(),
        }
    }
}

/// Helper to parse an env var and apply it to a config field.
fn env_override<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(v) = std::env::var(var)
        && let Ok(n) = v.parse()
    {
        *target = n;
    }
}

impl FdgenConfig {
    /// Load config from `.fdgen/config.toml` in the project root, with env var overrides.
    /// Falls back to defaults if no config file exists.
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(".fdgen").join("config.toml");

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        env_override(
            "FDGEN_STRING_MAX_LENGTH",
            &mut config.rules.string_max_length,
        );
        env_override("FDGEN_INDENT", &mut config.render.indent);
        env_override("FDGEN_PACKAGE", &mut config.render.package);
        env_override(
            "FDGEN_STRICT_EXTENSIONS",
            &mut config.generation.strict_extensions,
        );

        if config.rules.string_max_length <= 0 {
            anyhow::bail!(
                "rules.string_max_length ({}) must be positive",
                config.rules.string_max_length
            );
        }
        if config.render.indent == 0 {
            anyhow::bail!("render.indent must be at least 1");
        }

        Ok(config)
    }
}
