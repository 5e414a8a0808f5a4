//! MCP client implementation
//!
//! Handles communication with a single MCP server process via JSON-RPC over
//! its stdin/stdout (newline-delimited messages)

use crate::config::LaunchSpec;
use crate::mcp::protocol::*;
use crate::mcp::server::MAX_MESSAGE_LEN;
use crate::types::CliError;
use crate::version;
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::sync::{oneshot, Mutex};
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, error, info, warn};

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, CliError>>>>>;

/// Grace period for a server to exit after its stdin closes
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// MCP client for a single server process
pub struct McpClient {
    /// Registry name of the server
    name: String,

    /// Server process
    child: Child,

    /// Next request ID
    next_id: AtomicU64,

    /// Pending requests
    pending: PendingMap,

    /// Set once the server's stdout is closed
    closed: Arc<AtomicBool>,

    /// Channel to send messages to the server
    outgoing: UnboundedSender<String>,

    /// Per-request timeout
    timeout: Duration,

    /// Handshake result
    initialize_result: Option<InitializeResult>,
}

impl McpClient {
    /// Spawn the server process and complete the MCP handshake
    pub async fn spawn(name: &str, spec: &LaunchSpec, timeout: Duration) -> Result<Self, CliError> {
        info!("Spawning MCP server {}: {}", name, spec.command_line());

        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CliError::ServerNotFound(
                    name.to_string(),
                    format!("Failed to spawn {}: {}", spec.program, e),
                )
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CliError::ProtocolError("Failed to get stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CliError::ProtocolError("Failed to get stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CliError::ProtocolError("Failed to get stderr".to_string()))?;

        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(Self::write_loop(stdin, outgoing_rx));
        tokio::spawn(Self::read_loop(
            name.to_string(),
            stdout,
            Arc::clone(&pending),
            Arc::clone(&closed),
            outgoing.downgrade(),
        ));
        tokio::spawn(Self::stderr_loop(name.to_string(), stderr));

        let mut client = Self {
            name: name.to_string(),
            child,
            next_id: AtomicU64::new(1),
            pending,
            closed,
            outgoing,
            timeout,
            initialize_result: None,
        };

        client.initialize().await?;

        info!("MCP server {} initialized successfully", name);

        Ok(client)
    }

    /// Background task writing queued messages to the server
    async fn write_loop(stdin: ChildStdin, mut outgoing_rx: UnboundedReceiver<String>) {
        let mut sink = FramedWrite::new(stdin, LinesCodec::new());

        while let Some(message) = outgoing_rx.recv().await {
            if let Err(e) = sink.send(message).await {
                error!("Failed to write message: {}", e);
                break;
            }
        }

        debug!("Writer finished, closing server stdin");
    }

    /// Background task reading messages from the server
    async fn read_loop(
        name: String,
        stdout: ChildStdout,
        pending: PendingMap,
        closed: Arc<AtomicBool>,
        outgoing: WeakUnboundedSender<String>,
    ) {
        let mut lines = FramedRead::new(stdout, LinesCodec::new_with_max_length(MAX_MESSAGE_LEN));

        while let Some(line) = lines.next().await {
            match line {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        Self::handle_message(line, &pending, &outgoing).await;
                    }
                }
                Err(e) => {
                    error!("Failed to read from {}: {}", name, e);
                    break;
                }
            }
        }

        warn!("MCP server {} closed stdout", name);

        // Mark closed before draining so late requests fail fast
        closed.store(true, Ordering::SeqCst);
        for (_, sender) in pending.lock().await.drain() {
            let _ = sender.send(Err(CliError::ServerCrashed(name.clone())));
        }
    }

    /// Forward server stderr to the log
    async fn stderr_loop(name: String, stderr: ChildStderr) {
        let mut lines = BufReader::new(stderr).lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => debug!(server = %name, "stderr: {}", line),
                Ok(None) => break,
                Err(e) => {
                    debug!(server = %name, "stderr closed: {}", e);
                    break;
                }
            }
        }
    }

    async fn handle_message(
        content: &str,
        pending: &PendingMap,
        outgoing: &WeakUnboundedSender<String>,
    ) {
        let message: Value = match serde_json::from_str(content) {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring non JSON-RPC output: {}", content);
                return;
            }
        };

        if message.get("method").is_some() {
            Self::handle_server_message(message, outgoing);
            return;
        }

        let response: JsonRpcResponse = match serde_json::from_value(message) {
            Ok(response) => response,
            Err(e) => {
                warn!("Malformed response: {}", e);
                return;
            }
        };

        let Some(id) = response.id.as_u64() else {
            warn!("Response with unexpected id: {}", response.id);
            return;
        };

        let Some(sender) = pending.lock().await.remove(&id) else {
            warn!("Response for unknown request id {}", id);
            return;
        };

        let result = if let Some(error) = response.error {
            Err(CliError::ProtocolError(format!(
                "{} (code {})",
                error.message, error.code
            )))
        } else {
            Ok(response.result.unwrap_or(Value::Null))
        };

        let _ = sender.send(result);
    }

    /// Notifications are logged, requests get a minimal answer
    fn handle_server_message(message: Value, outgoing: &WeakUnboundedSender<String>) {
        let request: JsonRpcRequest = match serde_json::from_value(message) {
            Ok(request) => request,
            Err(e) => {
                warn!("Malformed server message: {}", e);
                return;
            }
        };

        let Some(id) = request.id else {
            debug!("Server notification: {}", request.method);
            return;
        };

        let response = if request.method == "ping" {
            JsonRpcResponse::success(id, serde_json::json!({}))
        } else {
            JsonRpcResponse::failure(
                id,
                JsonRpcError::new(
                    METHOD_NOT_FOUND,
                    format!("Method not supported by client: {}", request.method),
                ),
            )
        };

        let Some(sender) = outgoing.upgrade() else {
            return;
        };
        match serde_json::to_string(&response) {
            Ok(json) => {
                let _ = sender.send(json);
            }
            Err(e) => error!("Failed to serialize reply: {}", e),
        }
    }

    /// Send a request and wait for the response
    async fn send_request<R: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<R, CliError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(Value::from(id), method, params);
        let message = serde_json::to_string(&request)?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if self.closed.load(Ordering::SeqCst) {
            self.pending.lock().await.remove(&id);
            return Err(CliError::ServerCrashed(self.name.clone()));
        }

        debug!("Sending request {}: {}", id, method);
        if self.outgoing.send(message).is_err() {
            self.pending.lock().await.remove(&id);
            return Err(CliError::ProtocolError("Failed to send request".to_string()));
        }

        let result = match timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result?,
            Ok(Err(_)) => return Err(CliError::ServerCrashed(self.name.clone())),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(CliError::Timeout(self.timeout));
            }
        };

        serde_json::from_value(result)
            .map_err(|e| CliError::ProtocolError(format!("Failed to parse {} response: {}", method, e)))
    }

    /// Send a notification (no response expected)
    async fn send_notification(&self, method: &str, params: Option<Value>) -> Result<(), CliError> {
        let notification = JsonRpcRequest::notification(method, params);
        let message = serde_json::to_string(&notification)?;
        debug!("Sending notification: {}", method);

        self.outgoing
            .send(message)
            .map_err(|_| CliError::ProtocolError("Failed to send notification".to_string()))
    }

    async fn initialize(&mut self) -> Result<(), CliError> {
        let params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "cli-mcp",
                "version": version(),
            }
        });

        let result: InitializeResult = self.send_request("initialize", Some(params)).await?;

        if result.protocol_version != PROTOCOL_VERSION {
            warn!(
                "Server {} negotiated protocol version {}",
                self.name, result.protocol_version
            );
        }

        self.initialize_result = Some(result);
        self.send_notification("notifications/initialized", None).await
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn server_info(&self) -> Option<&Implementation> {
        self.initialize_result.as_ref().map(|r| &r.server_info)
    }

    pub fn instructions(&self) -> Option<&str> {
        self.initialize_result
            .as_ref()
            .and_then(|r| r.instructions.as_deref())
    }

    pub fn capabilities(&self) -> Option<&ServerCapabilities> {
        self.initialize_result.as_ref().map(|r| &r.capabilities)
    }

    pub async fn ping(&self) -> Result<(), CliError> {
        let _: Value = self.send_request("ping", None).await?;
        Ok(())
    }

    /// List all tools, following pagination cursors
    pub async fn list_tools(&self) -> Result<Vec<Tool>, CliError> {
        let mut tools = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = cursor
                .as_ref()
                .map(|c| serde_json::json!({ "cursor": c }));
            let page: ListToolsResult = self.send_request("tools/list", params).await?;
            tools.extend(page.tools);

            cursor = match next_page(&mut seen, page.next_cursor) {
                Some(next) => Some(next),
                None => break,
            };
        }

        Ok(tools)
    }

    /// Call a tool; `arguments` must be a JSON object (or null for none)
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, CliError> {
        let arguments = match arguments {
            Value::Null => Value::Object(Default::default()),
            Value::Object(_) => arguments,
            _ => {
                return Err(CliError::InvalidArgument(
                    "tool arguments must be a JSON object".to_string(),
                ))
            }
        };

        let params = serde_json::json!({
            "name": name,
            "arguments": arguments,
        });
        self.send_request("tools/call", Some(params)).await
    }

    /// Close stdin and wait for the process, killing it after a grace period
    pub async fn shutdown(self) -> Result<(), CliError> {
        let Self {
            name,
            mut child,
            outgoing,
            ..
        } = self;

        drop(outgoing);

        let waited = timeout(SHUTDOWN_GRACE, child.wait()).await;
        match waited {
            Ok(status) => {
                debug!("MCP server {} exited: {:?}", name, status?);
            }
            Err(_) => {
                warn!("MCP server {} did not exit, killing it", name);
                child.kill().await?;
            }
        }

        Ok(())
    }
}

/// Parse tool arguments given on the command line; absent means `{}`
pub fn parse_tool_arguments(raw: Option<&str>) -> Result<Value, CliError> {
    let Some(raw) = raw else {
        return Ok(Value::Object(Default::default()));
    };

    let value: Value = serde_json::from_str(raw)
        .map_err(|e| CliError::InvalidArgument(format!("tool arguments are not valid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(CliError::InvalidArgument(
            "tool arguments must be a JSON object".to_string(),
        ));
    }
    Ok(value)
}

/// Next pagination cursor, or `None` once a cursor repeats
fn next_page(seen: &mut HashSet<String>, next: Option<String>) -> Option<String> {
    let next = next?;
    if seen.insert(next.clone()) {
        Some(next)
    } else {
        warn!("Server repeated pagination cursor {}, stopping", next);
        None
    }
}
