//! Stdio transport — a child process speaking newline-delimited JSON-RPC.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, warn};
use windlass_core::agent::Agent;
use windlass_core::error::McpError;
use windlass_core::mcp::{McpFilterContext, McpServer, McpToolFilter, McpToolInfo, McpToolResult};

const PROTOCOL_VERSION: &str = "2024-11-05";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for a stdio MCP server.
#[derive(Clone)]
pub struct StdioMcpServerConfig {
    /// Display name; defaults to `stdio: <command>` when empty.
    pub name: String,

    /// The command to spawn.
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Cache the tools list across turns until invalidated.
    pub cache_tools_list: bool,

    /// Prefer structured content when serializing tool results.
    pub use_structured_content: bool,

    /// Optional per-agent tool filter.
    pub tool_filter: Option<Arc<dyn McpToolFilter>>,
}

impl StdioMcpServerConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            cache_tools_list: false,
            use_structured_content: false,
            tool_filter: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_cached_tools_list(mut self, cache: bool) -> Self {
        self.cache_tools_list = cache;
        self
    }

    pub fn with_structured_content(mut self, use_structured: bool) -> Self {
        self.use_structured_content = use_structured;
        self
    }

    pub fn with_tool_filter(mut self, filter: Arc<dyn McpToolFilter>) -> Self {
        self.tool_filter = Some(filter);
        self
    }
}

type PendingMap = Arc<StdMutex<HashMap<i64, oneshot::Sender<Result<Value, McpError>>>>>;

struct Connection {
    write_tx: mpsc::Sender<String>,
    pending: PendingMap,
    next_id: AtomicI64,
    alive: Arc<AtomicBool>,
    child: Child,
    timeout: Duration,
}

impl Connection {
    async fn send_request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(McpError::Transport("connection closed".into()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: Some(id),
            method,
            params,
        };
        let line = format!(
            "{}\n",
            serde_json::to_string(&request).map_err(|e| McpError::Protocol(e.to_string()))?
        );

        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id, tx);

        if self.write_tx.send(line).await.is_err() {
            self.pending.lock().unwrap().remove(&id);
            return Err(McpError::Transport("connection closed".into()));
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                self.pending.lock().unwrap().remove(&id);
                Err(McpError::Transport("connection closed".into()))
            }
            Err(_) => {
                self.pending.lock().unwrap().remove(&id);
                Err(McpError::Transport(format!(
                    "request '{method}' timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
        }
    }

    async fn send_notification(&self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        let notification = JsonRpcRequest {
            jsonrpc: "2.0",
            id: None,
            method,
            params,
        };
        let line = format!(
            "{}\n",
            serde_json::to_string(&notification).map_err(|e| McpError::Protocol(e.to_string()))?
        );
        self.write_tx
            .send(line)
            .await
            .map_err(|_| McpError::Transport("connection closed".into()))
    }
}

/// An MCP server reached through a spawned child process.
pub struct StdioMcpServer {
    config: StdioMcpServerConfig,
    name: String,
    connection: Mutex<Option<Connection>>,
    tools_cache: Mutex<Option<Vec<McpToolInfo>>>,
    cache_dirty: AtomicBool,
}

impl StdioMcpServer {
    pub fn new(config: StdioMcpServerConfig) -> Self {
        let name = if config.name.is_empty() {
            format!("stdio: {}", config.command)
        } else {
            config.name.clone()
        };
        Self {
            config,
            name,
            connection: Mutex::new(None),
            tools_cache: Mutex::new(None),
            cache_dirty: AtomicBool::new(true),
        }
    }

    /// Force the next `list_tools` to refetch from the server.
    pub fn invalidate_tools_cache(&self) {
        self.cache_dirty.store(true, Ordering::SeqCst);
    }

    async fn fetch_tools(&self) -> Result<Vec<McpToolInfo>, McpError> {
        let guard = self.connection.lock().await;
        let connection = guard.as_ref().ok_or(McpError::NotConnected)?;
        let result = connection.send_request("tools/list", Some(json!({}))).await?;

        let tools = result
            .get("tools")
            .and_then(Value::as_array)
            .ok_or_else(|| McpError::Protocol("tools/list result missing 'tools'".into()))?;

        let mut infos = Vec::with_capacity(tools.len());
        for tool in tools {
            let name = tool
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| McpError::Protocol("tool entry missing 'name'".into()))?;
            infos.push(McpToolInfo {
                name: name.to_string(),
                description: tool
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                input_schema: tool.get("inputSchema").cloned(),
            });
        }
        Ok(infos)
    }
}

#[async_trait]
impl McpServer for StdioMcpServer {
    fn name(&self) -> &str {
        &self.name
    }

    fn use_structured_content(&self) -> bool {
        self.config.use_structured_content
    }

    async fn connect(&self) -> Result<(), McpError> {
        let mut guard = self.connection.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        let mut command = Command::new(&self.config.command);
        command
            .args(&self.config.args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true);
        for (key, value) in &self.config.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|e| {
            McpError::Transport(format!("failed to spawn '{}': {e}", self.config.command))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Transport("failed to open child stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Transport("failed to open child stdout".into()))?;

        let alive = Arc::new(AtomicBool::new(true));
        let pending: PendingMap = Arc::new(StdMutex::new(HashMap::new()));

        let (write_tx, mut write_rx) = mpsc::channel::<String>(64);
        let writer_alive = Arc::clone(&alive);
        let mut stdin = stdin;
        tokio::spawn(async move {
            while let Some(line) = write_rx.recv().await {
                if !writer_alive.load(Ordering::SeqCst) {
                    break;
                }
                if stdin.write_all(line.as_bytes()).await.is_err()
                    || stdin.flush().await.is_err()
                {
                    writer_alive.store(false, Ordering::SeqCst);
                    break;
                }
            }
        });

        let reader_pending = Arc::clone(&pending);
        let reader_alive = Arc::clone(&alive);
        let server_name = self.name.clone();
        let mut reader = BufReader::new(stdout);
        tokio::spawn(async move {
            let mut line = String::new();
            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) | Err(_) => {
                        reader_alive.store(false, Ordering::SeqCst);
                        break;
                    }
                    Ok(_) => {
                        let Ok(frame) = serde_json::from_str::<Value>(&line) else {
                            warn!(server = %server_name, line = %line.trim(), "Unparseable MCP frame");
                            continue;
                        };
                        let Some(id) = frame.get("id").and_then(Value::as_i64) else {
                            // Notification or server-initiated request; ignored.
                            continue;
                        };
                        let tx = reader_pending.lock().unwrap().remove(&id);
                        if let Some(tx) = tx {
                            let outcome = match frame.get("error") {
                                Some(error) => Err(McpError::Protocol(format!(
                                    "server error: {error}"
                                ))),
                                None => Ok(frame.get("result").cloned().unwrap_or(Value::Null)),
                            };
                            let _ = tx.send(outcome);
                        }
                    }
                }
            }
            reader_pending.lock().unwrap().clear();
        });

        let connection = Connection {
            write_tx,
            pending,
            next_id: AtomicI64::new(1),
            alive,
            child,
            timeout: Duration::from_secs(self.config.timeout_secs),
        };

        connection
            .send_request(
                "initialize",
                Some(json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": { "name": self.name, "version": env!("CARGO_PKG_VERSION") },
                })),
            )
            .await?;
        connection
            .send_notification("notifications/initialized", Some(json!({})))
            .await?;

        debug!(server = %self.name, "MCP server connected");
        *guard = Some(connection);
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), McpError> {
        let mut guard = self.connection.lock().await;
        if let Some(mut connection) = guard.take() {
            connection.alive.store(false, Ordering::SeqCst);
            let _ = connection.child.kill().await;
            debug!(server = %self.name, "MCP server cleaned up");
        }
        Ok(())
    }

    async fn list_tools(&self, agent: &Agent) -> Result<Vec<McpToolInfo>, McpError> {
        let mut cache = self.tools_cache.lock().await;

        let tools = if self.config.cache_tools_list
            && !self.cache_dirty.load(Ordering::SeqCst)
            && cache.is_some()
        {
            cache.clone().unwrap_or_default()
        } else {
            let fetched = self.fetch_tools().await?;
            *cache = Some(fetched.clone());
            self.cache_dirty.store(false, Ordering::SeqCst);
            fetched
        };
        drop(cache);

        let Some(filter) = &self.config.tool_filter else {
            return Ok(tools);
        };

        let ctx = McpFilterContext {
            agent,
            server_name: &self.name,
        };
        let mut filtered = Vec::with_capacity(tools.len());
        for tool in tools {
            match filter.allow(&ctx, &tool) {
                Ok(true) => filtered.push(tool),
                Ok(false) => {}
                Err(e) => {
                    warn!(server = %self.name, tool = %tool.name, error = %e, "Tool filter failed");
                }
            }
        }
        Ok(filtered)
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> Result<McpToolResult, McpError> {
        let guard = self.connection.lock().await;
        let connection = guard.as_ref().ok_or(McpError::NotConnected)?;

        let params = json!({
            "name": name,
            "arguments": arguments.unwrap_or_else(|| json!({})),
        });
        let result = connection.send_request("tools/call", Some(params)).await?;

        Ok(McpToolResult {
            content: result
                .get("content")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            structured_content: result.get("structuredContent").cloned(),
            is_error: result
                .get("isError")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn operations_before_connect_are_rejected() {
        let server = StdioMcpServer::new(StdioMcpServerConfig::new("true"));
        let err = server.list_tools(&Agent::new("a")).await.unwrap_err();
        assert!(matches!(err, McpError::NotConnected));

        let err = server.call_tool("anything", None).await.unwrap_err();
        assert!(matches!(err, McpError::NotConnected));
    }

    #[test]
    fn default_name_comes_from_command() {
        let server = StdioMcpServer::new(StdioMcpServerConfig::new("my-mcp-server"));
        assert_eq!(server.name(), "stdio: my-mcp-server");

        let named =
            StdioMcpServer::new(StdioMcpServerConfig::new("cmd").with_name("docs-server"));
        assert_eq!(named.name(), "docs-server");
    }

    #[tokio::test]
    async fn cleanup_without_connect_is_a_no_op() {
        let server = StdioMcpServer::new(StdioMcpServerConfig::new("true"));
        server.cleanup().await.unwrap();
    }

    #[test]
    fn request_frames_are_jsonrpc() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: Some(1),
            method: "tools/list",
            params: Some(json!({})),
        };
        let line = serde_json::to_string(&request).unwrap();
        assert!(line.contains(r#""jsonrpc":"2.0""#));
        assert!(line.contains(r#""method":"tools/list""#));

        let notification = JsonRpcRequest {
            jsonrpc: "2.0",
            id: None,
            method: "notifications/initialized",
            params: None,
        };
        let line = serde_json::to_string(&notification).unwrap();
        assert!(!line.contains("\"id\""));
        assert!(!line.contains("params"));
    }

    // End-to-end over a fake server: a shell loop that answers the
    // initialize / tools/list / tools/call sequence by line count.
    #[cfg(unix)]
    #[tokio::test]
    async fn stdio_round_trip_against_fake_server() {
        let script = r#"
i=0
while read line; do
  i=$((i+1))
  case $i in
    1) echo '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{},"serverInfo":{"name":"fake","version":"0"}}}' ;;
    2) ;;
    3) echo '{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"greet","description":"say hello","inputSchema":{"type":"object","properties":{"who":{"type":"string"}}}}]}}' ;;
    4) echo '{"jsonrpc":"2.0","id":3,"result":{"content":[{"type":"text","text":"hello Ada"}]}}' ;;
  esac
done
"#;
        let server = StdioMcpServer::new(
            StdioMcpServerConfig::new("sh")
                .with_args(vec!["-c".to_string(), script.to_string()])
                .with_name("fake")
                .with_timeout_secs(5),
        );

        server.connect().await.unwrap();

        let tools = server.list_tools(&Agent::new("a")).await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "greet");
        assert_eq!(tools[0].description, "say hello");
        assert!(tools[0].input_schema.is_some());

        let result = server
            .call_tool("greet", Some(json!({"who": "Ada"})))
            .await
            .unwrap();
        assert_eq!(result.content.len(), 1);
        assert_eq!(result.content[0]["text"], "hello Ada");
        assert!(!result.is_error);

        server.cleanup().await.unwrap();
    }
}
