//! Error types for the anki-mcp server.

use thiserror::Error;

/// Server error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AnkiConnect error: {0}")]
    AnkiConnect(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    #[error("Invalid bind address: {0}")]
    BindAddr(#[from] std::net::AddrParseError),

    #[error("Config directory not found")]
    ConfigDirNotFound,
}

impl Error {
    /// JSON-RPC error code for this error.
    pub fn rpc_code(&self) -> i32 {
        match self {
            Error::Json(_) => RpcErrorCode::ParseError as i32,
            Error::UnknownTool(_) => RpcErrorCode::MethodNotFound as i32,
            Error::InvalidParams(_) => RpcErrorCode::InvalidParams as i32,
            Error::AnkiConnect(_) => RpcErrorCode::UpstreamError as i32,
            _ => RpcErrorCode::InternalError as i32,
        }
    }
}

/// JSON-RPC error codes.
#[derive(Debug, Clone, Copy)]
#[repr(i32)]
#[allow(dead_code)]
pub enum RpcErrorCode {
    ParseError = -32700,
    InvalidRequest = -32600,
    MethodNotFound = -32601,
    InvalidParams = -32602,
    InternalError = -32603,
    UpstreamError = -32000,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_codes() {
        assert_eq!(Error::UnknownTool("x".into()).rpc_code(), -32601);
        assert_eq!(Error::InvalidParams("x".into()).rpc_code(), -32602);
        assert_eq!(Error::AnkiConnect("x".into()).rpc_code(), -32000);
        assert_eq!(Error::ConfigDirNotFound.rpc_code(), -32603);
    }
}
