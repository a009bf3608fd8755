use scl_common::DEFAULT_EXTENSIONS;
use scl_editor::DEFAULT_MAX_LEVELS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "scl.config.json";

/// SCL tool configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Replacement tag schema JSON, relative to the config directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<PathBuf>,

    /// File extensions treated as SCL
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Undo levels kept by edit sessions
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()
}

fn default_history_limit() -> usize {
    DEFAULT_MAX_LEVELS
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let mut config: Config = serde_json::from_str(&content)?;
            config.schema = config.schema.map(|schema| cwd.join(schema));
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema: None,
            extensions: default_extensions(),
            history_limit: default_history_limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "schema": "tags.json",
            "extensions": ["scd", "xml"],
            "historyLimit": 20
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.schema, Some(PathBuf::from("tags.json")));
        assert_eq!(config.extensions, vec!["scd", "xml"]);
        assert_eq!(config.history_limit, 20);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.schema, None);
        assert_eq!(config.extensions.len(), 7);
        assert!(config.extensions.contains(&"cid".to_string()));
        assert_eq!(config.history_limit, 100);
    }

    #[test]
    fn test_load_without_file_is_default() {
        let dir = std::env::temp_dir().join("scl-cli-config-missing");
        let config = Config::load(&dir).unwrap();
        assert_eq!(config.history_limit, DEFAULT_MAX_LEVELS);
    }
}
