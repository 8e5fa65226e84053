//! JSON-RPC 2.0 messages spoken between endpoint and clients.
//!
//! Methods:
//! - `session.create` / `session.close`
//! - `browse`, `read`, `write`, `call` (require a live session)
//! - `server.info`

use crate::browse::{BrowseDirection, BrowseResult};
use crate::node_id::NodeId;
use crate::variant::{StatusCode, Variant};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error codes used in [`RpcError`].
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const NODE_NOT_FOUND: i32 = -32001;
    pub const SESSION_REQUIRED: i32 = -32002;
}

/// Method names.
pub mod methods {
    pub const SESSION_CREATE: &str = "session.create";
    pub const SESSION_CLOSE: &str = "session.close";
    pub const BROWSE: &str = "browse";
    pub const READ: &str = "read";
    pub const WRITE: &str = "write";
    pub const CALL: &str = "call";
    pub const SERVER_INFO: &str = "server.info";
}

fn jsonrpc_version() -> String {
    "2.0".to_string()
}

/// A JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    #[serde(default = "jsonrpc_version")]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Option<Value>,
}

impl Request {
    pub fn new(id: u64, method: &str, params: impl Serialize) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            method: method.to_string(),
            params: serde_json::to_value(params).unwrap_or(Value::Null),
            id: Some(Value::from(id)),
        }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

/// A JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    #[serde(default)]
    pub id: Option<Value>,
}

impl Response {
    pub fn success(id: Option<Value>, result: impl Serialize) -> Self {
        match serde_json::to_value(result) {
            Ok(result) => Self {
                jsonrpc: jsonrpc_version(),
                result: Some(result),
                error: None,
                id,
            },
            Err(e) => Self::error(id, codes::INVALID_PARAMS, e.to_string()),
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
            id,
        }
    }

    pub fn parse_error() -> Self {
        Self::error(None, codes::PARSE_ERROR, "Parse error")
    }

    pub fn method_not_found(id: Option<Value>, method: &str) -> Self {
        Self::error(
            id,
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )
    }

    pub fn invalid_params(id: Option<Value>, message: impl Into<String>) -> Self {
        Self::error(id, codes::INVALID_PARAMS, message)
    }

    pub fn session_required(id: Option<Value>) -> Self {
        Self::error(id, codes::SESSION_REQUIRED, "No active session")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Params and results
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreated {
    pub session_id: String,
    /// Server build information, as reported by `server.info`.
    #[serde(default)]
    pub server: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionParams {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseParams {
    pub session_id: String,
    pub nodes_to_browse: Vec<NodeId>,
    #[serde(default)]
    pub direction: BrowseDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseResponse {
    pub results: Vec<BrowseResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadParams {
    pub session_id: String,
    pub node_ids: Vec<NodeId>,
}

/// A value read from a variable, or the reason it could not be read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Variant>,
    pub status_code: StatusCode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResponse {
    pub results: Vec<DataValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteParams {
    pub session_id: String,
    pub node_id: NodeId,
    pub value: Variant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResponse {
    pub status_code: StatusCode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallParams {
    pub session_id: String,
    /// When given, the method must be a component of this object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<NodeId>,
    pub method_id: NodeId,
    #[serde(default)]
    pub input_arguments: Vec<Variant>,
}
