use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::ai::gemini::{GeminiOptions, DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::dispatcher::HistoryPolicy;

pub const API_KEY_ENV: &str = "GOOGLE_AI_STUDIO_API_KEY";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub model: String,
    pub api_base: String,
    pub api_key: Option<String>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub expression_duration_secs: f64,
    /// Path to a `*.model3.json` whose expressions the avatar can show
    pub model_setting: Option<PathBuf>,
    pub rollback_failed_turns: bool,
    pub priming_prompt: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            connect_timeout_secs: 5,
            request_timeout_secs: 60,
            expression_duration_secs: 5.0,
            model_setting: None,
            rollback_failed_turns: false,
            priming_prompt: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
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

    /// Environment variable first, then the config file.
    pub fn resolve_api_key(&self) -> Option<String> {
        pick_api_key(std::env::var(API_KEY_ENV).ok(), self.api_key.as_deref())
            .map(|(key, _)| key)
    }

    /// Returns where the API key comes from: "env", "config", or None
    pub fn key_source(&self) -> Option<&'static str> {
        pick_api_key(std::env::var(API_KEY_ENV).ok(), self.api_key.as_deref())
            .map(|(_, source)| source)
    }

    pub fn gemini_options(&self) -> GeminiOptions {
        GeminiOptions {
            api_base: self.api_base.clone(),
            model: self.model.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn history_policy(&self) -> HistoryPolicy {
        if self.rollback_failed_turns {
            HistoryPolicy::RollbackFailedTurns
        } else {
            HistoryPolicy::KeepFailedTurns
        }
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("desktop-pet"))
    }

    fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}

/// Empty values count as unset on both sides.
fn pick_api_key(env: Option<String>, configured: Option<&str>) -> Option<(String, &'static str)> {
    env.filter(|key| !key.is_empty())
        .map(|key| (key, "env"))
        .or_else(|| {
            configured
                .filter(|key| !key.is_empty())
                .map(|key| (key.to_string(), "config"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_env_wins_over_config() {
        assert_eq!(
            pick_api_key(Some("from-env".to_string()), Some("from-file")),
            Some(("from-env".to_string(), "env"))
        );
        assert_eq!(
            pick_api_key(Some(String::new()), Some("from-file")),
            Some(("from-file".to_string(), "config"))
        );
    }

    #[test]
    fn test_empty_config_key_counts_as_missing() {
        assert_eq!(pick_api_key(None, Some("")), None);
        assert_eq!(pick_api_key(Some(String::new()), Some("")), None);
        assert_eq!(pick_api_key(None, None), None);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.connect_timeout_secs, 5);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"model": "gemini-2.0-flash", "rollback_failed_turns": true}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.request_timeout_secs, 60);
        assert_eq!(config.history_policy(), HistoryPolicy::RollbackFailedTurns);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.json");
        let config = Config {
            expression_duration_secs: 2.5,
            model_setting: Some(PathBuf::from("assets/Haru/Haru.model3.json")),
            ..Config::new()
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_gemini_options_use_configured_timeouts() {
        let config = Config {
            connect_timeout_secs: 3,
            request_timeout_secs: 20,
            ..Config::new()
        };
        let options = config.gemini_options();
        assert_eq!(options.connect_timeout, Duration::from_secs(3));
        assert_eq!(options.request_timeout, Duration::from_secs(20));
    }
}
