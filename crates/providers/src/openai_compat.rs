//! OpenAI-compatible backend implementation.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Together AI, and any
//! OpenAI-compatible endpoint.
//!
//! Implements both call shapes of the [`ModelBackend`] contract:
//! - `complete` — the stateless `/chat/completions` path
//! - `respond` — the stateful `/responses` path, which requires a resolved
//!   prompt reference (official OpenAI endpoints only)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};
use windlass_core::error::BackendError;
use windlass_core::item::{ConversationItem, Role};
use windlass_core::model::{ModelBackend, ModelRequest, ModelResponse, OutputItem, Usage};
use windlass_core::tool::ToolDefinition;

/// An OpenAI-compatible model backend.
pub struct OpenAiCompatBackend {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatBackend {
    /// Create a new OpenAI-compatible backend.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create an OpenAI backend (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Create an OpenRouter backend (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key)
    }

    /// Create an Ollama backend (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
        )
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, BackendError> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(BackendError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(BackendError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Backend returned error");
            return Err(BackendError::Api {
                status_code: status,
                message: error_body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::MalformedResponse(format!("Failed to parse response: {e}")))
    }
}

#[async_trait]
impl ModelBackend for OpenAiCompatBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = chat_body(&request);

        debug!(backend = %self.name, model = %request.model, "Sending chat completion request");

        let raw = self.post_json(&url, &body).await?;
        let api_response: ChatApiResponse = serde_json::from_value(raw)
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;
        parse_chat_response(api_response)
    }

    async fn respond(&self, request: ModelRequest) -> Result<ModelResponse, BackendError> {
        let url = format!("{}/responses", self.base_url);
        let body = responses_body(&request)?;

        debug!(backend = %self.name, model = %request.model, "Sending prompt-based request");

        let raw = self.post_json(&url, &body).await?;
        let api_response: ResponsesApiResponse = serde_json::from_value(raw)
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;
        Ok(parse_responses_response(api_response))
    }
}

// --- Chat Completions wire mapping ---

fn chat_messages(request: &ModelRequest) -> Vec<ApiMessage> {
    let mut messages = Vec::with_capacity(request.input.len() + 1);

    if let Some(instructions) = &request.instructions {
        messages.push(ApiMessage {
            role: "system".into(),
            content: Some(instructions.clone()),
            tool_calls: None,
            tool_call_id: None,
        });
    }

    for item in &request.input {
        match item {
            ConversationItem::Message { role, content } => messages.push(ApiMessage {
                role: match role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "system".into(),
                },
                content: Some(content.clone()),
                tool_calls: None,
                tool_call_id: None,
            }),
            ConversationItem::ToolCall {
                call_id,
                name,
                arguments,
            } => messages.push(ApiMessage {
                role: "assistant".into(),
                content: None,
                tool_calls: Some(vec![ApiToolCall {
                    id: call_id.clone(),
                    r#type: "function".into(),
                    function: ApiFunction {
                        name: name.clone(),
                        arguments: arguments.clone(),
                    },
                }]),
                tool_call_id: None,
            }),
            ConversationItem::ToolResult { call_id, output } => messages.push(ApiMessage {
                role: "tool".into(),
                content: Some(output.clone()),
                tool_calls: None,
                tool_call_id: Some(call_id.clone()),
            }),
        }
    }

    messages
}

fn apply_settings(body: &mut Value, request: &ModelRequest) {
    let settings = &request.settings;
    if let Some(temperature) = settings.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(top_p) = settings.top_p {
        body["top_p"] = json!(top_p);
    }
    if let Some(frequency_penalty) = settings.frequency_penalty {
        body["frequency_penalty"] = json!(frequency_penalty);
    }
    if let Some(presence_penalty) = settings.presence_penalty {
        body["presence_penalty"] = json!(presence_penalty);
    }
    if let Some(parallel) = settings.parallel_tool_calls {
        body["parallel_tool_calls"] = json!(parallel);
    }
    if let Some(tool_choice) = settings.tool_choice {
        body["tool_choice"] = serde_json::to_value(tool_choice).unwrap_or(Value::Null);
    }
}

fn chat_body(request: &ModelRequest) -> Value {
    let mut body = json!({
        "model": request.model,
        "messages": chat_messages(request),
        "stream": false,
    });

    if let Some(max_tokens) = request.settings.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    apply_settings(&mut body, request);

    if !request.tools.is_empty() {
        body["tools"] = json!(chat_tools(&request.tools));
    }

    body
}

fn chat_tools(tools: &[ToolDefinition]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                    "strict": t.strict,
                }
            })
        })
        .collect()
}

fn parse_chat_response(api_response: ChatApiResponse) -> Result<ModelResponse, BackendError> {
    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| BackendError::MalformedResponse("No choices in response".into()))?;

    let mut output = Vec::new();
    let tool_calls = choice.message.tool_calls.unwrap_or_default();

    if tool_calls.is_empty() {
        if let Some(content) = choice.message.content {
            output.push(OutputItem::message(content));
        }
    } else {
        // Content alongside tool calls is interim reasoning, not a final
        // answer; only the tool calls survive as output items.
        for tc in tool_calls {
            output.push(OutputItem::tool_call(
                tc.id,
                tc.function.name,
                tc.function.arguments,
            ));
        }
    }

    let usage = api_response.usage.map(|u| Usage {
        requests: 1,
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(ModelResponse {
        output,
        usage,
        response_id: api_response.id,
    })
}

// --- Responses wire mapping ---

fn responses_input_items(items: &[ConversationItem]) -> Vec<Value> {
    items
        .iter()
        .map(|item| match item {
            ConversationItem::Message { role, content } => json!({
                "role": match role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::System => "system",
                },
                "content": content,
            }),
            ConversationItem::ToolCall {
                call_id,
                name,
                arguments,
            } => json!({
                "type": "function_call",
                "call_id": call_id,
                "name": name,
                "arguments": arguments,
            }),
            ConversationItem::ToolResult { call_id, output } => json!({
                "type": "function_call_output",
                "call_id": call_id,
                "output": output,
            }),
        })
        .collect()
}

fn responses_body(request: &ModelRequest) -> Result<Value, BackendError> {
    let Some(prompt) = &request.prompt else {
        return Err(BackendError::NotSupported(
            "prompt call shape requires a resolved prompt".into(),
        ));
    };

    let mut prompt_block = json!({ "id": prompt.id });
    if let Some(version) = &prompt.version {
        prompt_block["version"] = json!(version);
    }
    if !prompt.variables.is_empty() {
        prompt_block["variables"] = json!(prompt.variables);
    }

    let mut body = json!({
        "model": request.model,
        "prompt": prompt_block,
        "input": responses_input_items(&request.input),
    });

    if let Some(instructions) = &request.instructions {
        body["instructions"] = json!(instructions);
    }
    if let Some(max_tokens) = request.settings.max_tokens {
        body["max_output_tokens"] = json!(max_tokens);
    }
    apply_settings(&mut body, request);

    if !request.tools.is_empty() {
        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                    "strict": t.strict,
                })
            })
            .collect();
        body["tools"] = json!(tools);
    }

    Ok(body)
}

fn parse_responses_response(api_response: ResponsesApiResponse) -> ModelResponse {
    let mut output = Vec::new();
    for item in api_response.output {
        match item {
            ResponsesOutputItem::Message { content } => {
                let text: String = content
                    .into_iter()
                    .filter_map(|c| match c {
                        ResponsesContent::OutputText { text } => Some(text),
                        ResponsesContent::Other => None,
                    })
                    .collect::<Vec<_>>()
                    .join("");
                output.push(OutputItem::message(text));
            }
            ResponsesOutputItem::FunctionCall {
                call_id,
                name,
                arguments,
            } => {
                output.push(OutputItem::tool_call(call_id, name, arguments));
            }
            ResponsesOutputItem::Other => {}
        }
    }

    let usage = api_response.usage.map(|u| Usage {
        requests: 1,
        input_tokens: u.input_tokens,
        output_tokens: u.output_tokens,
        total_tokens: u.total_tokens,
    });

    ModelResponse {
        output,
        usage,
        response_id: api_response.id,
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatApiResponse {
    #[serde(default)]
    id: Option<String>,
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ChatApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ChatApiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ResponsesApiResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    output: Vec<ResponsesOutputItem>,
    #[serde(default)]
    usage: Option<ResponsesApiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponsesOutputItem {
    Message {
        content: Vec<ResponsesContent>,
    },
    FunctionCall {
        call_id: String,
        name: String,
        arguments: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponsesContent {
    OutputText {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ResponsesApiUsage {
    input_tokens: u64,
    output_tokens: u64,
    total_tokens: u64,
}
