pub mod env_substitution;

use journal_core::{JournalError, Provider, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AssistantConfig {
    #[serde(default)]
    pub memory: MemorySettings,
    #[serde(default)]
    pub providers: ProviderSettings,
    #[serde(default)]
    pub paths: PathSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySettings {
    /// Maximum conversations held in memory at once.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Messages considered when building a prompt.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Disk records older than this are removed by cleanup.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

impl AssistantConfig {
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| JournalError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut raw: serde_json::Value = serde_yaml::from_str(yaml)
            .map_err(|e| JournalError::Config(format!("Failed to parse YAML: {}", e)))?;

        env_substitution::substitute_env_vars(&mut raw)?;

        let mut config: AssistantConfig = serde_json::from_value(raw)
            .map_err(|e| JournalError::Config(format!("Invalid configuration: {}", e)))?;

        config.expand_env_vars();
        config.validate()?;

        Ok(config)
    }

    fn expand_env_vars(&mut self) {
        if let Ok(cache_dir) = env::var("JOURNAL_CACHE_DIR") {
            self.paths.cache_dir = PathBuf::from(cache_dir);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.memory.cache_capacity == 0 {
            return Err(JournalError::Config(
                "memory.cache_capacity must be at least 1".into(),
            ));
        }
        if self.memory.history_window < 2 {
            return Err(JournalError::Config(
                "memory.history_window must be at least 2".into(),
            ));
        }
        if self.memory.retention_days <= 0 {
            return Err(JournalError::Config(
                "memory.retention_days must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Resolve the credential for a provider. A configured value wins over
    /// the conventional environment variable; a configured blank disables
    /// the provider rather than falling back. Blank values count as absent.
    pub fn api_key_for(&self, provider: Provider) -> Option<String> {
        self.api_key_with(provider, |name| env::var(name).ok())
    }

    fn api_key_with(
        &self,
        provider: Provider,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Option<String> {
        let (configured, env_var) = match provider {
            Provider::OpenAi => (&self.providers.openai_api_key, "OPENAI_API_KEY"),
            Provider::Anthropic => (&self.providers.anthropic_api_key, "ANTHROPIC_API_KEY"),
        };

        match configured {
            Some(key) => Some(key.clone()),
            None => lookup(env_var),
        }
        .filter(|key| !key.trim().is_empty())
    }

    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".journal-assistant")
            .join("config.yaml")
    }
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            history_window: default_history_window(),
            retention_days: default_retention_days(),
        }
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
        }
    }
}

fn default_cache_capacity() -> usize {
    5
}
fn default_history_window() -> usize {
    10
}
fn default_retention_days() -> i64 {
    30
}

fn default_cache_dir() -> PathBuf {
    env::var("JOURNAL_CACHE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".journal-assistant")
                .join("conversations")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
memory:
  cache_capacity: 3
  history_window: 6
  retention_days: 14

providers:
  openai_api_key: sk-test

paths:
  cache_dir: /tmp/journal-test
"#;

        let config = AssistantConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.memory.cache_capacity, 3);
        assert_eq!(config.memory.history_window, 6);
        assert_eq!(config.memory.retention_days, 14);
        assert_eq!(
            config.api_key_for(Provider::OpenAi),
            Some("sk-test".to_string())
        );
    }

    #[test]
    fn test_defaults() {
        let config = AssistantConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.memory.cache_capacity, 5);
        assert_eq!(config.memory.history_window, 10);
        assert_eq!(config.memory.retention_days, 30);
    }

    #[test]
    fn test_validation() {
        let yaml = r#"
memory:
  cache_capacity: 0
"#;
        assert!(AssistantConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_blank_key_disables_provider() {
        let yaml = r#"
providers:
  anthropic_api_key: "   "
"#;
        let config = AssistantConfig::from_yaml_str(yaml).unwrap();
        // A configured blank wins over the environment: no fallback.
        let key = config.api_key_with(Provider::Anthropic, |_| Some("sk-env".to_string()));
        assert_eq!(key, None);
    }

    #[test]
    fn test_env_fallback_when_unconfigured() {
        let config = AssistantConfig::from_yaml_str("{}").unwrap();

        let key = config.api_key_with(Provider::OpenAi, |name| {
            (name == "OPENAI_API_KEY").then(|| "sk-env".to_string())
        });
        assert_eq!(key, Some("sk-env".to_string()));

        let absent = config.api_key_with(Provider::OpenAi, |_| None);
        assert_eq!(absent, None);
    }

    #[test]
    fn test_placeholder_default_applies() {
        let yaml = r#"
paths:
  cache_dir: "${JOURNAL_UNSET_TEST_DIR:-/tmp/journal-conversations}"
"#;
        let config = AssistantConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(
            config.paths.cache_dir,
            PathBuf::from("/tmp/journal-conversations")
        );
    }

    #[test]
    fn test_default_config_path_location() {
        let path = AssistantConfig::default_config_path();
        assert!(path.ends_with(".journal-assistant/config.yaml"));
    }
}
