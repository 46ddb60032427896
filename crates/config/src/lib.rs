//! Model configuration registry for Windlass.
//!
//! Named backend configurations (endpoint, key, model) loaded from a TOML
//! file with environment variable overrides, plus a convenience
//! constructor that turns a configuration into a ready-to-run [`Agent`].
//!
//! ```toml
//! [[models]]
//! name = "default"
//! base_url = "https://api.openai.com/v1"
//! api_key = ""
//! model = "gpt-4o-mini"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use windlass_core::agent::Agent;
use windlass_providers::OpenAiCompatBackend;

/// Environment variables consulted for defaults and overrides.
pub const ENV_API_KEY: &str = "WINDLASS_API_KEY";
pub const ENV_BASE_URL: &str = "WINDLASS_BASE_URL";
pub const ENV_MODEL: &str = "WINDLASS_MODEL";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse config file '{path}': {reason}")]
    Parse { path: String, reason: String },

    #[error("failed to write config file '{path}': {reason}")]
    Write { path: String, reason: String },

    #[error("unknown model config '{0}', register it first")]
    UnknownConfig(String),
}

/// A named model backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    pub model: String,
}

/// On-disk shape of the registry file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    models: Vec<ModelConfig>,
}

/// Manages multiple named model configurations.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    configs: HashMap<String, ModelConfig>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a configuration, replacing any existing one with the same
    /// name.
    pub fn register(&mut self, config: ModelConfig) {
        self.configs.insert(config.name.clone(), config);
    }

    pub fn get(&self, name: &str) -> Option<&ModelConfig> {
        self.configs.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.configs.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ModelConfig> {
        self.configs.remove(name)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Registered configuration names, sorted for determinism.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.configs.keys().cloned().collect();
        names.sort();
        names
    }

    /// Load a registry from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let file: RegistryFile = toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut registry = Self::new();
        for config in file.models {
            registry.register(config);
        }
        debug!(count = registry.len(), path = %path.display(), "Loaded model registry");
        Ok(registry)
    }

    /// Load a registry, filling empty API keys from the environment.
    pub fn load_with_env(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut registry = Self::load(path)?;
        if let Ok(api_key) = std::env::var(ENV_API_KEY) {
            for config in registry.configs.values_mut() {
                if config.api_key.is_empty() {
                    config.api_key = api_key.clone();
                }
            }
        }
        Ok(registry)
    }

    /// Load a registry from a file, or start empty when the file is
    /// missing or unreadable.
    pub fn load_or_create(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Save every configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let file = RegistryFile {
            models: self
                .names()
                .iter()
                .filter_map(|name| self.configs.get(name).cloned())
                .collect(),
        };
        let text = toml::to_string_pretty(&file).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, text).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Build an agent wired to the named configuration's backend.
    pub fn create_agent(
        &self,
        config_name: &str,
        agent_name: &str,
        instructions: &str,
    ) -> Result<Agent, ConfigError> {
        let config = self
            .get(config_name)
            .ok_or_else(|| ConfigError::UnknownConfig(config_name.to_string()))?;

        let backend = Arc::new(OpenAiCompatBackend::new(
            config.name.clone(),
            config.base_url.clone(),
            config.api_key.clone(),
        ));

        Ok(Agent::new(agent_name)
            .with_instructions(instructions)
            .with_model(config.model.clone())
            .with_backend(backend))
    }
}

/// A configuration assembled from the environment.
pub fn default_config() -> ModelConfig {
    ModelConfig {
        name: "default".to_string(),
        api_key: std::env::var(ENV_API_KEY).unwrap_or_default(),
        base_url: env_or(ENV_BASE_URL, DEFAULT_BASE_URL),
        model: env_or(ENV_MODEL, DEFAULT_MODEL),
    }
}

fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => value,
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str) -> ModelConfig {
        ModelConfig {
            name: name.to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key: "sk-or-test".to_string(),
            model: "anthropic/claude-3.5-sonnet".to_string(),
        }
    }

    #[test]
    fn register_and_get() {
        let mut registry = ModelRegistry::new();
        registry.register(sample("claude"));
        assert!(registry.has("claude"));
        assert_eq!(registry.get("claude").unwrap().model, "anthropic/claude-3.5-sonnet");
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn register_replaces_same_name() {
        let mut registry = ModelRegistry::new();
        registry.register(sample("claude"));
        let mut updated = sample("claude");
        updated.model = "anthropic/claude-3.7-sonnet".to_string();
        registry.register(updated);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("claude").unwrap().model, "anthropic/claude-3.7-sonnet");
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.toml");

        let mut registry = ModelRegistry::new();
        registry.register(sample("claude"));
        registry.register(sample("gpt"));
        registry.save(&path).unwrap();

        let loaded = ModelRegistry::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.names(), vec!["claude".to_string(), "gpt".to_string()]);
        assert_eq!(loaded.get("claude").unwrap(), &sample("claude"));
    }

    #[test]
    fn load_or_create_tolerates_missing_file() {
        let registry = ModelRegistry::load_or_create("/nonexistent/models.toml");
        assert!(registry.is_empty());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "models = 42").unwrap();
        let err = ModelRegistry::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn create_agent_wires_model_and_backend() {
        let mut registry = ModelRegistry::new();
        registry.register(sample("claude"));

        let agent = registry
            .create_agent("claude", "helper", "You are helpful.")
            .unwrap();
        assert_eq!(agent.name, "helper");
        assert_eq!(agent.model, "anthropic/claude-3.5-sonnet");
        assert!(agent.backend.is_some());
        assert!(agent.instructions.is_some());
    }

    #[test]
    fn create_agent_unknown_config_errors() {
        let registry = ModelRegistry::new();
        let err = registry.create_agent("ghost", "a", "i").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownConfig(_)));
    }
}
