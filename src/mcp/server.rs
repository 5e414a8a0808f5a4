//! MCP server implementation
//!
//! Hosts a [`ToolProvider`] over the stdio transport: newline-delimited
//! JSON-RPC 2.0, one response line per request.

use crate::mcp::protocol::*;
use crate::mcp::tools::{unknown_tool, ToolProvider};
use crate::version;
use anyhow::Result;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

/// Upper bound for a single inbound message
pub const MAX_MESSAGE_LEN: usize = 8 * 1024 * 1024;

pub struct McpServer {
    provider: Arc<dyn ToolProvider>,
    initialized: Arc<Mutex<bool>>,
}

impl McpServer {
    pub fn new(provider: Arc<dyn ToolProvider>) -> Self {
        Self {
            provider,
            initialized: Arc::new(Mutex::new(false)),
        }
    }

    /// Run the MCP server on the process stdin/stdout until EOF
    pub async fn run(&self) -> Result<()> {
        info!("MCP server '{}' starting on stdio", self.provider.name());
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve requests read from `reader`, writing responses to `writer`
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_MESSAGE_LEN));
        let mut sink = FramedWrite::new(writer, LinesCodec::new());

        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    warn!("Dropping message larger than {} bytes", MAX_MESSAGE_LEN);
                    let response = JsonRpcResponse::failure(
                        Value::Null,
                        JsonRpcError::new(INVALID_REQUEST, "Message too large"),
                    );
                    sink.send(serde_json::to_string(&response)?).await?;
                    continue;
                }
                Err(LinesCodecError::Io(e)) => return Err(e.into()),
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            debug!("Received message: {}", line);

            if let Some(response) = self.handle_message(line).await {
                sink.send(serde_json::to_string(&response)?).await?;
                debug!("Sent response");
            }
        }

        info!("Client closed connection");
        Ok(())
    }

    /// Handle one inbound message. Notifications produce no response.
    pub async fn handle_message(&self, content: &str) -> Option<JsonRpcResponse> {
        let raw: Value = match serde_json::from_str(content) {
            Ok(value) => value,
            Err(e) => {
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    JsonRpcError::new(PARSE_ERROR, format!("Parse error: {}", e)),
                ));
            }
        };

        let fallback_id = raw.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(raw) {
            Ok(req) => req,
            Err(e) => {
                return Some(JsonRpcResponse::failure(
                    fallback_id,
                    JsonRpcError::new(INVALID_REQUEST, format!("Invalid request: {}", e)),
                ));
            }
        };

        if request.is_notification() {
            debug!("Notification: {}", request.method);
            return None;
        }

        let id = request.id.clone().unwrap_or(Value::Null);

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::failure(
                id,
                JsonRpcError::new(
                    INVALID_REQUEST,
                    format!("Unsupported jsonrpc version: {}", request.jsonrpc),
                ),
            ));
        }

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).await,
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(request.params).await,
            _ => Err(JsonRpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            )),
        };

        Some(match result {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    async fn handle_initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams =
            serde_json::from_value(params.unwrap_or_else(|| serde_json::json!({}))).map_err(
                |e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid initialize params: {}", e)),
            )?;

        if let Some(client) = &params.client_info {
            info!("Client connected: {} {}", client.name, client.version);
        }

        *self.initialized.lock().await = true;

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(serde_json::json!({})),
                ..Default::default()
            },
            server_info: Implementation {
                name: self.provider.name().to_string(),
                version: version().to_string(),
            },
            instructions: self.provider.instructions().map(str::to_string),
        };

        serde_json::to_value(result).map_err(|e| {
            JsonRpcError::new(INTERNAL_ERROR, format!("Failed to serialize result: {}", e))
        })
    }

    fn handle_list_tools(&self) -> Result<Value, JsonRpcError> {
        let result = ListToolsResult {
            tools: self.provider.tools(),
            next_cursor: None,
        };

        serde_json::to_value(result).map_err(|e| {
            JsonRpcError::new(INTERNAL_ERROR, format!("Failed to serialize tools: {}", e))
        })
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        if !*self.initialized.lock().await {
            return Err(JsonRpcError::new(INTERNAL_ERROR, "Server not initialized"));
        }

        let params: CallToolParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| {
                JsonRpcError::new(INVALID_PARAMS, format!("Invalid tool call params: {}", e))
            })?;

        let known = self.provider.tools().iter().any(|t| t.name == params.name);
        let result = if known {
            debug!("Calling tool {}", params.name);
            self.provider
                .call(&params.name, params.arguments.unwrap_or(Value::Null))
                .await
        } else {
            warn!("Unknown tool requested: {}", params.name);
            unknown_tool(&params.name)
        };

        serde_json::to_value(result).map_err(|e| {
            JsonRpcError::new(INTERNAL_ERROR, format!("Failed to serialize tool result: {}", e))
        })
    }
}
