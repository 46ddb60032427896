//! Instruction sources — how an agent obtains its system prompt.
//!
//! A closed set of variants behind one capability: produce instructions for
//! a given agent. Static strings cover most agents; the dynamic variant
//! defers to caller code (which may consult external state and fail); the
//! stateful variant renders a `{{key}}` template against a state provider.

use crate::agent::Agent;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Produces instructions for an agent. Implement this for instruction logic
/// that depends on external state; resolution failures abort the run.
#[async_trait]
pub trait InstructionSource: Send + Sync {
    async fn instructions(&self, agent: &Agent) -> Result<String>;
}

impl std::fmt::Debug for dyn InstructionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<InstructionSource>")
    }
}

/// Provides dynamic state values for stateful instruction templates.
#[async_trait]
pub trait StateProvider: Send + Sync {
    async fn state(&self) -> Result<HashMap<String, String>>;
}

impl std::fmt::Debug for dyn StateProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<StateProvider>")
    }
}

/// How an agent's instructions are obtained.
#[derive(Clone, Debug)]
pub enum Instructions {
    /// A fixed system prompt.
    Static(String),

    /// Instructions computed per turn by caller code.
    Dynamic(Arc<dyn InstructionSource>),

    /// A template rendered against a state provider per turn.
    Stateful(StatefulInstructions),
}

impl Instructions {
    /// Resolve the instructions for this turn.
    pub async fn resolve(&self, agent: &Agent) -> Result<String> {
        match self {
            Instructions::Static(text) => Ok(text.clone()),
            Instructions::Dynamic(source) => source.instructions(agent).await,
            Instructions::Stateful(stateful) => stateful.render().await,
        }
    }
}

impl From<&str> for Instructions {
    fn from(s: &str) -> Self {
        Instructions::Static(s.to_string())
    }
}

impl From<String> for Instructions {
    fn from(s: String) -> Self {
        Instructions::Static(s)
    }
}

/// Adapter turning a plain function into an [`InstructionSource`].
pub struct InstructionsFn<F>(pub F);

#[async_trait]
impl<F> InstructionSource for InstructionsFn<F>
where
    F: Fn(&Agent) -> Result<String> + Send + Sync,
{
    async fn instructions(&self, agent: &Agent) -> Result<String> {
        (self.0)(agent)
    }
}

/// Instructions generated from a base prompt and a state provider.
///
/// With a template, `{{key}}` placeholders are replaced by state values.
/// Without one, the state is appended to the base prompt as a sorted list.
#[derive(Clone, Debug)]
pub struct StatefulInstructions {
    pub base_prompt: String,
    pub template: Option<String>,
    pub state: Arc<dyn StateProvider>,
}

impl StatefulInstructions {
    pub fn new(base_prompt: impl Into<String>, state: Arc<dyn StateProvider>) -> Self {
        Self {
            base_prompt: base_prompt.into(),
            template: None,
            state,
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    async fn render(&self) -> Result<String> {
        let state = self.state.state().await?;

        if let Some(template) = &self.template {
            return Ok(render_template(template, &state));
        }

        let mut keys: Vec<&String> = state.keys().collect();
        keys.sort();

        let mut rendered = format!("{}\n\n## Current State\n", self.base_prompt);
        for key in keys {
            rendered.push_str(&format!("- {}: {}\n", key, state[key]));
        }
        Ok(rendered)
    }
}

/// Replace `{{key}}` placeholders with state values.
fn render_template(template: &str, state: &HashMap<String, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in state {
        let placeholder = format!("{{{{{key}}}}}");
        result = result.replace(&placeholder, value);
    }
    result
}

/// An in-memory thread-safe state provider.
#[derive(Default)]
pub struct MemoryStateProvider {
    state: RwLock<HashMap<String, String>>,
}

impl MemoryStateProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a state value.
    pub async fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.state.write().await.insert(key.into(), value.into());
    }

    /// Remove all state values.
    pub async fn reset(&self) {
        self.state.write().await.clear();
    }
}

#[async_trait]
impl StateProvider for MemoryStateProvider {
    async fn state(&self) -> Result<HashMap<String, String>> {
        Ok(self.state.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn test_agent() -> Agent {
        Agent::new("test")
    }

    #[tokio::test]
    async fn static_instructions_resolve_verbatim() {
        let instructions = Instructions::from("You are a helpful assistant.");
        let resolved = instructions.resolve(&test_agent()).await.unwrap();
        assert_eq!(resolved, "You are a helpful assistant.");
    }

    #[tokio::test]
    async fn dynamic_instructions_see_the_agent() {
        let instructions = Instructions::Dynamic(Arc::new(InstructionsFn(|agent: &Agent| {
            Ok(format!("You are {}.", agent.name))
        })));
        let resolved = instructions.resolve(&test_agent()).await.unwrap();
        assert_eq!(resolved, "You are test.");
    }

    #[tokio::test]
    async fn dynamic_instruction_failure_propagates() {
        let instructions = Instructions::Dynamic(Arc::new(InstructionsFn(|_: &Agent| {
            Err(Error::config("state backend unavailable"))
        })));
        let err = instructions.resolve(&test_agent()).await.unwrap_err();
        assert!(err.to_string().contains("state backend unavailable"));
    }

    #[tokio::test]
    async fn template_replaces_placeholders() {
        let state = Arc::new(MemoryStateProvider::new());
        state.set("user_name", "Ada").await;
        state.set("task_count", "5").await;

        let stateful = StatefulInstructions::new("", state)
            .with_template("Hello {{user_name}}, you have {{task_count}} tasks.");
        let resolved = Instructions::Stateful(stateful)
            .resolve(&test_agent())
            .await
            .unwrap();
        assert_eq!(resolved, "Hello Ada, you have 5 tasks.");
    }

    #[tokio::test]
    async fn base_prompt_gets_state_appended() {
        let state = Arc::new(MemoryStateProvider::new());
        state.set("status", "online").await;

        let stateful = StatefulInstructions::new("You are an assistant.", state);
        let resolved = Instructions::Stateful(stateful)
            .resolve(&test_agent())
            .await
            .unwrap();
        assert!(resolved.contains("You are an assistant."));
        assert!(resolved.contains("## Current State"));
        assert!(resolved.contains("- status: online"));
    }

    #[tokio::test]
    async fn step_tracking_state_feeds_a_reasoning_template() {
        // A provider that advances per observation, driving a
        // think-act-observe style prompt.
        let state = Arc::new(MemoryStateProvider::new());
        state.set("current_step", "step 1").await;
        state.set("observations", "").await;

        let stateful = StatefulInstructions::new("", Arc::clone(&state)).with_template(
            "Solve step by step.\nYou are at {{current_step}}.\nObserved so far: {{observations}}",
        );
        let instructions = Instructions::Stateful(stateful);

        let first = instructions.resolve(&test_agent()).await.unwrap();
        assert!(first.contains("You are at step 1."));

        state.set("current_step", "step 2").await;
        state.set("observations", "weather lookup succeeded").await;

        let second = instructions.resolve(&test_agent()).await.unwrap();
        assert!(second.contains("You are at step 2."));
        assert!(second.contains("weather lookup succeeded"));
    }

    #[tokio::test]
    async fn state_provider_snapshot_is_isolated() {
        let provider = MemoryStateProvider::new();
        provider.set("k", "v1").await;

        let snapshot = provider.state().await.unwrap();
        provider.set("k", "v2").await;

        assert_eq!(snapshot["k"], "v1");
        assert_eq!(provider.state().await.unwrap()["k"], "v2");
    }

    #[tokio::test]
    async fn reset_clears_state() {
        let provider = MemoryStateProvider::new();
        provider.set("a", "1").await;
        provider.reset().await;
        assert!(provider.state().await.unwrap().is_empty());
    }
}
