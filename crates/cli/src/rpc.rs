//! JSON-RPC envelope for `POST /rpc`.

use runtime::{ChatRequest, Message};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// The only method served.
pub const CHAT_METHOD: &str = "chat";

/// Code used for every failure, including rejected envelopes.
pub const INTERNAL_ERROR: i32 = -32603;

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

/// Parameters of a `chat` call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChatParams {
    pub messages: Vec<Message>,
    pub tools_enabled: bool,
    pub stream: bool,
}

impl ChatParams {
    pub fn into_request(self) -> ChatRequest {
        ChatRequest {
            messages: self.messages,
            tools_enabled: self.tools_enabled,
        }
    }
}

/// A validated `chat` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCall {
    pub id: Value,
    pub params: ChatParams,
}

/// A request refused before generation, with whatever id could be read.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub id: Value,
    pub message: String,
}

impl Rejection {
    fn new(id: Value, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
        }
    }
}

/// Validate a raw request body.
pub fn parse(body: &[u8]) -> Result<ChatCall, Rejection> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| Rejection::new(Value::Null, format!("Parse error: {e}")))?;

    let Value::Object(mut envelope) = value else {
        return Err(Rejection::new(Value::Null, "Invalid JSON-RPC format"));
    };
    let id = envelope.remove("id").unwrap_or(Value::Null);

    if envelope.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(Rejection::new(id, "Invalid JSON-RPC format"));
    }

    match envelope.get("method").and_then(Value::as_str) {
        Some(CHAT_METHOD) => {}
        Some(other) => return Err(Rejection::new(id, format!("Unknown method: {other}"))),
        None => return Err(Rejection::new(id, "Invalid JSON-RPC format")),
    }

    let params = match envelope.remove("params") {
        None | Some(Value::Null) => ChatParams::default(),
        Some(params) => match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => return Err(Rejection::new(id, format!("Invalid params: {e}"))),
        },
    };

    Ok(ChatCall { id, params })
}

/// Response envelope. Exactly one of `result` and `error` is set.
#[derive(Debug, Serialize)]
pub struct Reply<T> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
    id: Value,
}

impl<T: Serialize> Reply<T> {
    pub fn success(id: Value, result: T) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            result: Some(result),
            error: None,
            id,
        }
    }
}

impl Reply<()> {
    /// Generic failure (`-32603`) carrying `message`.
    pub fn failure(id: Value, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            result: None,
            error: Some(RpcError {
                code: INTERNAL_ERROR,
                message: message.into(),
            }),
            id,
        }
    }
}

impl From<Rejection> for Reply<()> {
    fn from(rejection: Rejection) -> Self {
        Self::failure(rejection.id, rejection.message)
    }
}
