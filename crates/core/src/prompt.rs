//! Prompt configuration for the stateful "prompt" call shape.
//!
//! Backends that manage prompts server-side take a prompt identifier plus
//! substitution variables instead of inline instructions. An agent with a
//! prompt source configured is dispatched through [`ModelBackend::respond`]
//! rather than the default chat path.
//!
//! [`ModelBackend::respond`]: crate::model::ModelBackend::respond

use crate::agent::Agent;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// A resolved prompt reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    /// The unique identifier of the prompt.
    pub id: String,

    /// Optional prompt version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Substitution values for the prompt template.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub variables: HashMap<String, serde_json::Value>,
}

impl Prompt {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: None,
            variables: HashMap::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.variables.insert(key.into(), value);
        self
    }
}

/// Generates prompts dynamically.
#[async_trait]
pub trait PromptProvider: Send + Sync {
    async fn prompt(&self, agent: &Agent) -> Result<Prompt>;
}

impl std::fmt::Debug for dyn PromptProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<PromptProvider>")
    }
}

/// How an agent's prompt reference is obtained.
#[derive(Clone, Debug)]
pub enum PromptSource {
    Static(Prompt),
    Dynamic(Arc<dyn PromptProvider>),
}

impl PromptSource {
    pub async fn resolve(&self, agent: &Agent) -> Result<Prompt> {
        match self {
            PromptSource::Static(prompt) => Ok(prompt.clone()),
            PromptSource::Dynamic(provider) => provider.prompt(agent).await,
        }
    }
}

impl From<Prompt> for PromptSource {
    fn from(prompt: Prompt) -> Self {
        PromptSource::Static(prompt)
    }
}
