use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

pub const DEFAULT_GATEWAY_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "openai/gpt-3.5-turbo";
pub const DEFAULT_SEARCH_URL: &str = "https://api.duckduckgo.com/";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:3000";
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Base URL of a running proxy service. When unset the editor starts its own.
    pub endpoint: Option<String>,
    pub listen: String,
    pub gateway_url: String,
    pub model: String,
    pub search_url: String,
    pub api_key: Option<String>,
    pub insert_search_results: bool,
    /// Rows between the top of the selection and the toolbar anchor.
    pub toolbar_offset: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            endpoint: None,
            listen: DEFAULT_LISTEN.to_string(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            api_key: None,
            insert_search_results: true,
            toolbar_offset: 1,
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// Gateway credential, looked up on every call so a changed environment
    /// takes effect without a restart.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.api_key.clone())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("draftpad").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.model, "openai/gpt-3.5-turbo");
        assert!(config.insert_search_results);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::new();
        config.endpoint = Some("http://127.0.0.1:4000".to_string());
        config.toolbar_offset = 3;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"model": "anthropic/claude-3-opus"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.model, "anthropic/claude-3-opus");
        assert_eq!(config.gateway_url, DEFAULT_GATEWAY_URL);
        assert_eq!(config.listen, DEFAULT_LISTEN);
    }
}
