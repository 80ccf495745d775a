//! Configuration management for noema services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`NOEMA__` prefix, `__` separator)
//! 2. Config file (`noema.toml`)
//! 3. Defaults

use serde::Deserialize;

use crate::error::NoemaError;

/// Top-level settings for a noema process.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub graph: GraphSettings,

    #[serde(default)]
    pub schema: SchemaSettings,
}

/// Connection settings for the backing graph store.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphSettings {
    #[serde(default = "default_uri")]
    pub uri: String,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default = "default_password")]
    pub password: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

/// Location of the persisted schema documents.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaSettings {
    /// Directory holding `entity_types.json` and `relationship_types.json`.
    #[serde(default = "default_schema_dir")]
    pub schema_dir: String,
}

impl Settings {
    /// Load settings from an optional config file plus environment overrides.
    ///
    /// `file_prefix` is the config file path without extension, e.g. `"noema"`
    /// for `noema.toml`. A missing file is not an error.
    pub fn load(file_prefix: &str) -> Result<Self, NoemaError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("NOEMA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| NoemaError::Config(e.to_string()))?;

        cfg.try_deserialize()
            .map_err(|e| NoemaError::Config(e.to_string()))
    }
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "noema-dev".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

fn default_schema_dir() -> String {
    "./schemas".to_string()
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            schema_dir: default_schema_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.graph.uri, "bolt://localhost:7687");
        assert_eq!(settings.graph.max_connections, 16);
        assert_eq!(settings.schema.schema_dir, "./schemas");
    }
}
