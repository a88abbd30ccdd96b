//! Canonical conversation messages and the normalizer that builds them from
//! the several payload shapes the gateway emits.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::rpc::{methods, Frame};

/// Sender name reserved for locally originated messages.
pub const LOCAL_SENDER: &str = "You";

/// Sender used when the payload names none.
pub const UNKNOWN_SENDER: &str = "unknown";

/// Which side of the conversation a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// Opaque message identifier, unique within a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh local id.
    pub fn generate() -> Self {
        Self(format!("local-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A conversation entry. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub direction: Direction,
}

impl Message {
    /// A locally composed message, sent by "You".
    pub fn outgoing(text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: MessageId::generate(),
            text: text.into(),
            sender: LOCAL_SENDER.to_string(),
            timestamp,
            direction: Direction::Outgoing,
        }
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Whether `frame` announces a conversation message, either as a
/// `message/new` push or as a result whose `type` is `"message"`.
pub fn is_message_event(frame: &Frame) -> bool {
    frame.is_method(methods::MESSAGE_NEW)
        || frame
            .result
            .as_ref()
            .and_then(|r| r.get("type"))
            .and_then(Value::as_str)
            == Some("message")
}

/// Normalize using the wall clock and a random fallback id.
pub fn normalize(frame: &Frame) -> Option<Message> {
    normalize_with(frame, now_millis(), MessageId::generate)
}

/// Build a canonical [`Message`] from a frame already known to be a message
/// event.
///
/// The payload is read from `result` when it is truthy, otherwise from
/// `params`; when that is not a JSON object no message is produced. `now_ms`
/// and `mint_id` fill in a missing timestamp and id.
pub fn normalize_with(
    frame: &Frame,
    now_ms: i64,
    mint_id: impl FnOnce() -> MessageId,
) -> Option<Message> {
    let source = frame
        .result
        .as_ref()
        .filter(|v| truthy(v))
        .or(frame.params.as_ref())?
        .as_object()?;

    let id = scalar_text(source.get("id"))
        .map(MessageId::new)
        .unwrap_or_else(mint_id);
    let text = first_text(source, &["text", "content"]).unwrap_or_default();
    let sender =
        first_text(source, &["from", "sender"]).unwrap_or_else(|| UNKNOWN_SENDER.to_string());
    let timestamp = source
        .get("timestamp")
        .and_then(millis)
        .unwrap_or(now_ms);
    let direction = if source.get("outgoing").is_some_and(truthy) {
        Direction::Outgoing
    } else {
        Direction::Incoming
    };

    Some(Message {
        id,
        text,
        sender,
        timestamp,
        direction,
    })
}

/// JavaScript-style truthiness, which is what gateway payloads are written against.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A truthy string or number rendered as text.
fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        n @ Value::Number(_) if truthy(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_text(source: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| scalar_text(source.get(*k)))
}

fn millis(value: &Value) -> Option<i64> {
    let ms = value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))?;
    (ms != 0).then_some(ms)
}
