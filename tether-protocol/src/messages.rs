//! Client-companion message types
//!
//! Every request carries `{id, method, params}`; every response carries
//! `{id, result}` or `{id, error}`. Responses are matched to requests by
//! correlation id, never by arrival order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation id attached to a request and echoed in its response
pub type RequestId = Uuid;

/// Method names understood by the companion
pub mod methods {
    /// Connection handshake; first request on every connection
    pub const INITIALIZE: &str = "initialize";
    /// Open a diff view for a proposed file edit
    pub const OPEN_DIFF: &str = "openDiff";
}

/// Request envelope sent from client to companion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub id: RequestId,
    pub method: String,
    pub params: serde_json::Value,
}

impl Request {
    /// Create a request with a fresh correlation id
    pub fn new(method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            method: method.into(),
            params,
        }
    }
}

/// Response envelope sent from companion to client
///
/// Exactly one of `result` and `error` is present in a well-formed
/// response; a response carrying neither is treated as malformed by the
/// client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl Response {
    /// Create a success response
    pub fn success(id: RequestId, result: serde_json::Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn failure(id: RequestId, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(ResponseError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Error payload of a rejected request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseError {
    pub code: ErrorCode,
    pub message: String,
}

/// Error codes reported by the companion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    InvalidRequest,
    MethodNotFound,
    ProtocolMismatch,
    DiffFailed,
    InternalError,
}

/// Parameters of the `initialize` handshake
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: u32,
    pub session_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_path: Option<String>,
}

/// Result of the `initialize` handshake
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companion_version: Option<String>,
}

/// Parameters of the `openDiff` request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiffParams {
    /// Target file path, as seen by the editor workspace
    pub file_path: String,
    /// Full proposed new content for the file
    pub proposed_content: String,
    /// Originating assistant session
    pub session_id: Uuid,
}

/// Acknowledgement returned for a successful `openDiff`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiffAck {
    /// Optional human-readable note from the companion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
