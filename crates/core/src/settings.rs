//! Model tuning settings with explicit presence tracking.
//!
//! Every field is an `Option` so that "unset" is distinguishable from "set
//! to zero". `resolve` merges a per-run override into agent-level settings
//! field by field; an override wins whenever it is present, regardless of
//! its value.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which tool the model should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    /// Model decides
    Auto,
    /// Must use a tool
    Required,
    /// No tool use
    None,
}

/// Truncation strategy for long conversations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Truncation {
    Auto,
    Disabled,
}

/// LLM configuration parameters.
///
/// Not all backends support all parameters; unset fields are omitted from
/// requests entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Controls randomness (0.0 = deterministic).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Nucleus sampling (alternative to temperature).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Reduces repetition of token sequences (-2.0 to 2.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,

    /// Reduces repetition of topics (-2.0 to 2.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,

    /// Maximum number of output tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,

    /// Allow multiple tool calls in a single turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truncation: Option<Truncation>,

    /// Whether the backend should store the response for later retrieval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<bool>,

    /// Optional key-value pairs forwarded with the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

impl ModelSettings {
    /// Merge `overrides` into these settings. A field from `overrides`
    /// replaces the base field whenever it is present.
    pub fn resolve(&self, overrides: &ModelSettings) -> ModelSettings {
        let mut merged = self.clone();
        if overrides.temperature.is_some() {
            merged.temperature = overrides.temperature;
        }
        if overrides.top_p.is_some() {
            merged.top_p = overrides.top_p;
        }
        if overrides.frequency_penalty.is_some() {
            merged.frequency_penalty = overrides.frequency_penalty;
        }
        if overrides.presence_penalty.is_some() {
            merged.presence_penalty = overrides.presence_penalty;
        }
        if overrides.max_tokens.is_some() {
            merged.max_tokens = overrides.max_tokens;
        }
        if overrides.tool_choice.is_some() {
            merged.tool_choice = overrides.tool_choice;
        }
        if overrides.parallel_tool_calls.is_some() {
            merged.parallel_tool_calls = overrides.parallel_tool_calls;
        }
        if overrides.truncation.is_some() {
            merged.truncation = overrides.truncation;
        }
        if overrides.store.is_some() {
            merged.store = overrides.store;
        }
        if overrides.metadata.is_some() {
            merged.metadata = overrides.metadata.clone();
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_override_keeps_base() {
        let base = ModelSettings {
            temperature: Some(0.7),
            max_tokens: Some(4096),
            ..Default::default()
        };
        let merged = base.resolve(&ModelSettings::default());
        assert_eq!(merged.temperature, Some(0.7));
        assert_eq!(merged.max_tokens, Some(4096));
    }

    #[test]
    fn present_override_wins() {
        let base = ModelSettings {
            temperature: Some(0.7),
            ..Default::default()
        };
        let overrides = ModelSettings {
            temperature: Some(0.2),
            top_p: Some(0.9),
            ..Default::default()
        };
        let merged = base.resolve(&overrides);
        assert_eq!(merged.temperature, Some(0.2));
        assert_eq!(merged.top_p, Some(0.9));
    }

    #[test]
    fn zero_is_a_value_not_unset() {
        // Presence drives the merge, not non-zero-ness.
        let base = ModelSettings {
            temperature: Some(0.7),
            ..Default::default()
        };
        let overrides = ModelSettings {
            temperature: Some(0.0),
            ..Default::default()
        };
        let merged = base.resolve(&overrides);
        assert_eq!(merged.temperature, Some(0.0));
    }

    #[test]
    fn tool_choice_serializes_lowercase() {
        let json = serde_json::to_string(&ToolChoice::Required).unwrap();
        assert_eq!(json, r#""required""#);
    }

    #[test]
    fn unset_fields_are_omitted_from_json() {
        let settings = ModelSettings {
            temperature: Some(0.5),
            ..Default::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("temperature"));
        assert!(!json.contains("max_tokens"));
    }
}
