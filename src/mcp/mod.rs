//! MCP (Model Context Protocol) server.
//!
//! JSON-RPC 2.0 over newline-delimited JSON. The same [`McpServer`] backs
//! both the stdio pump here and the streaming HTTP transport.

pub mod format;
pub mod tools;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use crate::anki::AnkiClient;
use crate::config::Config;
use crate::error::{Error, RpcErrorCode};
use tools::{ToolContext, ToolRegistry};

/// MCP protocol version.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server info.
const SERVER_NAME: &str = "anki-mcp";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Value,
    id: Option<Value>,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Value,
}

/// JSON-RPC error.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError { code, message }),
            id,
        }
    }

    #[cfg(test)]
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    #[cfg(test)]
    pub fn error_code(&self) -> Option<i32> {
        self.error.as_ref().map(|e| e.code)
    }
}

/// MCP server: tool registry plus the AnkiConnect client behind it.
pub struct McpServer {
    registry: ToolRegistry,
    ctx: ToolContext,
}

impl McpServer {
    /// Build a server from config; fails if the tool table is malformed.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let client = AnkiClient::new(&config.ankiconnect)?;
        Ok(Self {
            registry: ToolRegistry::new()?,
            ctx: ToolContext {
                client,
                cards: config.cards.clone(),
            },
        })
    }

    /// Handle one request.
    pub async fn handle_request(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone().unwrap_or(Value::Null);

        match request.method.as_str() {
            "initialize" => {
                info!("MCP initialize");
                JsonRpcResponse::success(
                    id,
                    json!({
                        "protocolVersion": PROTOCOL_VERSION,
                        "capabilities": {
                            "tools": {}
                        },
                        "serverInfo": {
                            "name": SERVER_NAME,
                            "version": SERVER_VERSION
                        }
                    }),
                )
            }

            "notifications/initialized" => {
                debug!("MCP initialized notification");
                JsonRpcResponse::success(id, json!({}))
            }

            "tools/list" => {
                debug!("MCP tools/list");
                JsonRpcResponse::success(id, self.registry.list())
            }

            "tools/call" => {
                let tool_name = request
                    .params
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                let args = request
                    .params
                    .get("arguments")
                    .cloned()
                    .unwrap_or_else(|| json!({}));

                debug!(tool = tool_name, "MCP tools/call");

                match self.registry.call(&self.ctx, tool_name, &args).await {
                    Ok(result) => JsonRpcResponse::success(id, result),
                    Err(e) => JsonRpcResponse::error(id, e.rpc_code(), e.to_string()),
                }
            }

            _ => {
                debug!(method = request.method, "Unknown MCP method");
                JsonRpcResponse::error(
                    id,
                    RpcErrorCode::MethodNotFound as i32,
                    format!("Method not found: {}", request.method),
                )
            }
        }
    }

    /// Handle one raw JSON message. Returns `None` for notifications,
    /// which expect no response.
    pub async fn handle_message(&self, raw: Value) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_value(raw) {
            Ok(req) => req,
            Err(e) => {
                error!(error = %e, "Failed to parse MCP request");
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    RpcErrorCode::ParseError as i32,
                    format!("Parse error: {}", e),
                ));
            }
        };

        if request.id.is_none() && request.method.starts_with("notifications/") {
            debug!(method = request.method, "Skipping notification");
            return None;
        }

        Some(self.handle_request(&request).await)
    }

    /// Run the stdio pump: one JSON-RPC message per line on stdin, one
    /// response per line on stdout. Logs go to stderr.
    pub async fn run_stdio(&self) -> Result<(), Error> {
        info!(endpoint = %self.ctx.client.url(), "Starting MCP server (stdio)");

        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(stdin).lines();

        while let Some(line) = lines.next_line().await? {
            if line.is_empty() {
                continue;
            }

            debug!(request = %line, "MCP request");

            let raw: Value = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(e) => {
                    let response = JsonRpcResponse::error(
                        Value::Null,
                        RpcErrorCode::ParseError as i32,
                        format!("Parse error: {}", e),
                    );
                    write_line(&mut stdout, &response).await?;
                    continue;
                }
            };

            if let Some(response) = self.handle_message(raw).await {
                write_line(&mut stdout, &response).await?;
            }
        }

        info!("MCP server stopped");
        Ok(())
    }
}

async fn write_line(
    stdout: &mut tokio::io::Stdout,
    response: &JsonRpcResponse,
) -> Result<(), Error> {
    let response_str = serde_json::to_string(response)?;
    debug!(response = %response_str, "MCP response");
    stdout.write_all(response_str.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> McpServer {
        McpServer::new(&Config::default()).unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let response = server()
            .handle_message(json!({
                "jsonrpc": "2.0",
                "method": "initialize",
                "params": {},
                "id": 1
            }))
            .await
            .unwrap();

        let result = response.result().unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "anki-mcp");
    }

    #[tokio::test]
    async fn test_tools_list() {
        let response = server()
            .handle_message(json!({
                "jsonrpc": "2.0",
                "method": "tools/list",
                "id": 2
            }))
            .await
            .unwrap();

        let tools = response.result().unwrap()["tools"].as_array().unwrap().len();
        assert_eq!(tools, 6);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = server()
            .handle_message(json!({
                "jsonrpc": "2.0",
                "method": "resources/list",
                "id": 3
            }))
            .await
            .unwrap();

        assert_eq!(response.error_code(), Some(-32601));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let response = server()
            .handle_message(json!({
                "jsonrpc": "2.0",
                "method": "tools/call",
                "params": {"name": "delete_everything", "arguments": {}},
                "id": 4
            }))
            .await
            .unwrap();

        assert_eq!(response.error_code(), Some(-32601));
    }

    #[tokio::test]
    async fn test_notification_skipped() {
        let response = server()
            .handle_message(json!({
                "jsonrpc": "2.0",
                "method": "notifications/initialized"
            }))
            .await;

        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_malformed_request() {
        let response = server().handle_message(json!("not a request")).await.unwrap();
        assert_eq!(response.error_code(), Some(-32700));
    }
}
