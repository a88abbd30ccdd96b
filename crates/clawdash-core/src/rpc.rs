//! JSON-RPC 2.0 envelopes exchanged with the gateway.
//!
//! Outbound calls are strongly typed (`Request`); inbound frames are kept as a
//! loose `Frame` because the gateway mixes responses, notifications and bare
//! results on the same socket.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value of the `jsonrpc` field on every outbound call.
pub const JSONRPC_VERSION: &str = "2.0";

/// Method names understood by the gateway.
pub mod methods {
    pub const AUTHENTICATE: &str = "authenticate";
    pub const CHANNELS_STATUS: &str = "channels/status";
    pub const MESSAGE_NEW: &str = "message/new";
    pub const WHATSAPP_SEND: &str = "channels/whatsapp/send";
}

/// Correlation id reserved for the authenticate call sent on open.
pub const AUTH_CALL_ID: CallId = CallId(1);

/// Correlation id of an outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(pub u64);

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An outbound call envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: CallId,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// `params` of the authenticate call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticateParams {
    pub token: String,
}

/// `params` of a channel send call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendParams {
    pub to: String,
    pub text: String,
}

impl Request {
    pub fn new(id: CallId, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }

    /// The authenticate call issued once per connection.
    pub fn authenticate(token: &str) -> Self {
        Self::new(
            AUTH_CALL_ID,
            methods::AUTHENTICATE,
            serde_json::json!({ "token": token }),
        )
    }

    /// A WhatsApp send call addressed to `to`.
    pub fn whatsapp_send(id: CallId, to: &str, text: &str) -> Self {
        Self::new(
            id,
            methods::WHATSAPP_SEND,
            serde_json::json!({ "to": to, "text": text }),
        )
    }
}

/// Error object carried by a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Read an error object leniently: gateways sometimes send a bare string.
    fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self {
                code: 0,
                message: s.clone(),
                data: None,
            },
            Value::Object(map) => Self {
                code: map.get("code").and_then(Value::as_i64).unwrap_or(0),
                message: map
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("rpc error")
                    .to_string(),
                data: map.get("data").cloned(),
            },
            other => Self {
                code: 0,
                message: other.to_string(),
                data: None,
            },
        }
    }
}

/// Classification of a decoded inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Carries a `method` of any type: a server push.
    Notification,
    /// Carries `result` or `error`, normally answering one of our calls.
    Response,
    /// Neither; ignored by the session.
    Unrecognized,
}

/// A decoded inbound frame. JSON `null` members are treated as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub id: Option<Value>,
    pub method: Option<Value>,
    pub params: Option<Value>,
    pub result: Option<Value>,
    pub error: Option<Value>,
}

impl Frame {
    /// Build a frame from any JSON value. Non-objects yield an empty frame.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self::default();
        };
        let mut take = |key: &str| map.remove(key).filter(|v| !v.is_null());

        Self {
            id: take("id"),
            method: take("method"),
            params: take("params"),
            result: take("result"),
            error: take("error"),
        }
    }

    pub fn kind(&self) -> FrameKind {
        if self.method.is_some() {
            FrameKind::Notification
        } else if self.result.is_some() || self.error.is_some() {
            FrameKind::Response
        } else {
            FrameKind::Unrecognized
        }
    }

    /// The method name, when it is a string.
    pub fn method_name(&self) -> Option<&str> {
        self.method.as_ref().and_then(Value::as_str)
    }

    /// Whether this frame's method equals `method`.
    pub fn is_method(&self, method: &str) -> bool {
        self.method_name() == Some(method)
    }

    /// The numeric correlation id, if the frame carries one we could have issued.
    pub fn call_id(&self) -> Option<CallId> {
        match self.id.as_ref()? {
            Value::Number(n) => n.as_u64().map(CallId),
            Value::String(s) => s.parse().ok().map(CallId),
            _ => None,
        }
    }

    /// The outcome of a response frame: `error` wins over `result`.
    pub fn outcome(&self) -> Option<Result<Value, RpcError>> {
        if let Some(err) = &self.error {
            return Some(Err(RpcError::from_value(err)));
        }
        self.result.clone().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn authenticate_uses_reserved_id() {
        let req = Request::authenticate("abc");
        assert_eq!(req.id, AUTH_CALL_ID);
        assert_eq!(req.method, "authenticate");
        assert_eq!(req.params, json!({ "token": "abc" }));
        assert_eq!(req.jsonrpc, "2.0");
    }

    #[test]
    fn null_members_are_absent() {
        let frame = Frame::from_value(json!({ "id": 3, "result": "ok", "error": null, "method": null }));
        assert_eq!(frame.kind(), FrameKind::Response);
        assert!(frame.error.is_none());
        assert_eq!(frame.outcome(), Some(Ok(json!("ok"))));
    }

    #[test]
    fn any_method_makes_a_notification() {
        let frame = Frame::from_value(json!({ "method": 7 }));
        assert_eq!(frame.kind(), FrameKind::Notification);
        assert_eq!(frame.method_name(), None);
        assert!(!frame.is_method("7"));

        let frame = Frame::from_value(json!({ "method": { "name": "message/new" }, "result": {} }));
        assert_eq!(frame.kind(), FrameKind::Notification);
        assert!(!frame.is_method("message/new"));
    }

    #[test]
    fn call_id_accepts_numeric_strings() {
        let frame = Frame::from_value(json!({ "id": "42", "result": {} }));
        assert_eq!(frame.call_id(), Some(CallId(42)));

        let frame = Frame::from_value(json!({ "id": "abc", "result": {} }));
        assert_eq!(frame.call_id(), None);
    }

    #[test]
    fn error_outcome_is_lenient() {
        let frame = Frame::from_value(json!({ "id": 1, "error": { "code": -32001, "message": "bad token" } }));
        let err = frame.outcome().unwrap().unwrap_err();
        assert_eq!(err.code, -32001);
        assert_eq!(err.message, "bad token");

        let frame = Frame::from_value(json!({ "id": 1, "error": "nope" }));
        assert_eq!(frame.outcome().unwrap().unwrap_err().message, "nope");
    }
}
