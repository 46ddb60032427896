//! Guardrails — ordered safety checks around a run.
//!
//! Input guardrails run before the first model call, output guardrails
//! after a final output is produced. Each check returns a
//! [`GuardrailOutput`]; a triggered tripwire aborts the run with a typed
//! error, while a check that fails to execute aborts with its own error.
//! Checks run sequentially in list order and short-circuit on the first
//! tripwire, so ordering is deterministic.

use crate::agent::{Agent, FinalOutput};
use crate::error::{Error, GuardrailError, Result};
use crate::input::Input;
use async_trait::async_trait;
use std::sync::Arc;

/// The result of a single guardrail check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuardrailOutput {
    /// Halts agent execution when true.
    pub tripwire_triggered: bool,

    /// Optional check details, surfaced in the tripwire error and the run
    /// result.
    pub info: Option<serde_json::Value>,
}

impl GuardrailOutput {
    /// A passing check with no details.
    pub fn pass() -> Self {
        Self::default()
    }

    /// A tripped check.
    pub fn tripwire(info: Option<serde_json::Value>) -> Self {
        Self {
            tripwire_triggered: true,
            info,
        }
    }
}

/// Validates input before any model call is made.
#[async_trait]
pub trait InputGuardrailCheck: Send + Sync {
    async fn check(&self, agent: &Agent, input: &Input) -> Result<GuardrailOutput>;
}

impl std::fmt::Debug for dyn InputGuardrailCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<InputGuardrailCheck>")
    }
}

/// Validates the final output before it is returned.
#[async_trait]
pub trait OutputGuardrailCheck: Send + Sync {
    async fn check(&self, agent: &Agent, output: &FinalOutput) -> Result<GuardrailOutput>;
}

impl std::fmt::Debug for dyn OutputGuardrailCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<OutputGuardrailCheck>")
    }
}

/// A named input guardrail.
#[derive(Clone, Debug)]
pub struct InputGuardrail {
    name: String,
    check: Arc<dyn InputGuardrailCheck>,
}

impl InputGuardrail {
    pub fn new(name: impl Into<String>, check: Arc<dyn InputGuardrailCheck>) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }

    /// Build a guardrail from a plain function. IO-bound checks should
    /// implement [`InputGuardrailCheck`] directly instead.
    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Agent, &Input) -> Result<GuardrailOutput> + Send + Sync + 'static,
    {
        Self::new(name, Arc::new(InputFnCheck(f)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execute the check. A check error is wrapped with this guardrail's
    /// name; a tripwire is reported in the result, not as an error.
    pub async fn run(&self, agent: &Agent, input: &Input) -> Result<InputGuardrailResult> {
        let output = self
            .check
            .check(agent, input)
            .await
            .map_err(|e| match e {
                Error::Tripwire(t) => Error::Tripwire(t),
                other => Error::Guardrail(GuardrailError::Failed {
                    name: self.name.clone(),
                    reason: other.to_string(),
                }),
            })?;
        Ok(InputGuardrailResult {
            guardrail_name: self.name.clone(),
            output,
        })
    }
}

/// A named output guardrail.
#[derive(Clone, Debug)]
pub struct OutputGuardrail {
    name: String,
    check: Arc<dyn OutputGuardrailCheck>,
}

impl OutputGuardrail {
    pub fn new(name: impl Into<String>, check: Arc<dyn OutputGuardrailCheck>) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }

    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Agent, &FinalOutput) -> Result<GuardrailOutput> + Send + Sync + 'static,
    {
        Self::new(name, Arc::new(OutputFnCheck(f)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn run(&self, agent: &Agent, output: &FinalOutput) -> Result<OutputGuardrailResult> {
        let result = self
            .check
            .check(agent, output)
            .await
            .map_err(|e| match e {
                Error::Tripwire(t) => Error::Tripwire(t),
                other => Error::Guardrail(GuardrailError::Failed {
                    name: self.name.clone(),
                    reason: other.to_string(),
                }),
            })?;
        Ok(OutputGuardrailResult {
            guardrail_name: self.name.clone(),
            output: result,
        })
    }
}

/// The recorded outcome of one input guardrail check.
#[derive(Debug, Clone, PartialEq)]
pub struct InputGuardrailResult {
    pub guardrail_name: String,
    pub output: GuardrailOutput,
}

/// The recorded outcome of one output guardrail check.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputGuardrailResult {
    pub guardrail_name: String,
    pub output: GuardrailOutput,
}

struct InputFnCheck<F>(F);

#[async_trait]
impl<F> InputGuardrailCheck for InputFnCheck<F>
where
    F: Fn(&Agent, &Input) -> Result<GuardrailOutput> + Send + Sync,
{
    async fn check(&self, agent: &Agent, input: &Input) -> Result<GuardrailOutput> {
        (self.0)(agent, input)
    }
}

struct OutputFnCheck<F>(F);

#[async_trait]
impl<F> OutputGuardrailCheck for OutputFnCheck<F>
where
    F: Fn(&Agent, &FinalOutput) -> Result<GuardrailOutput> + Send + Sync,
{
    async fn check(&self, agent: &Agent, output: &FinalOutput) -> Result<GuardrailOutput> {
        (self.0)(agent, output)
    }
}
