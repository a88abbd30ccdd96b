//! Text framing for the gateway socket: one JSON document per WebSocket frame.

use serde_json::Value;

use crate::error::{DashError, DashResult};
use crate::rpc::{Frame, Request};

/// Encode an outbound call as a JSON text frame.
pub fn encode_request(request: &Request) -> DashResult<String> {
    Ok(serde_json::to_string(request)?)
}

/// Decode an inbound text frame.
///
/// Fails with [`DashError::MalformedFrame`] when the text is not JSON. Valid
/// JSON of an unexpected shape decodes to an unrecognized frame instead.
pub fn decode_frame(text: &str) -> DashResult<Frame> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| DashError::MalformedFrame(e.to_string()))?;
    Ok(Frame::from_value(value))
}

/// Decode a text frame as an outbound call envelope (the gateway's view).
pub fn decode_request(text: &str) -> DashResult<Request> {
    serde_json::from_str(text).map_err(|e| DashError::MalformedFrame(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{methods, CallId, FrameKind};
    use serde_json::json;

    #[test]
    fn authenticate_round_trip() {
        let req = Request::authenticate("e33ec557");
        let text = encode_request(&req).unwrap();
        let decoded = decode_request(&text).unwrap();
        assert_eq!(decoded, req);

        let raw: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(raw["jsonrpc"], "2.0");
        assert_eq!(raw["id"], 1);
    }

    #[test]
    fn send_round_trip() {
        let req = Request::whatsapp_send(CallId(17), "+15550001111", "ping ✓");
        let decoded = decode_request(&encode_request(&req).unwrap()).unwrap();
        assert_eq!(decoded.method, methods::WHATSAPP_SEND);
        assert_eq!(decoded.params, json!({ "to": "+15550001111", "text": "ping ✓" }));
        assert_eq!(decoded.id, CallId(17));
    }

    #[test]
    fn malformed_text_is_rejected() {
        let err = decode_frame("Raw gateway banner").unwrap_err();
        assert!(matches!(err, DashError::MalformedFrame(_)));
        assert!(decode_frame("{\"method\":").is_err());
    }

    #[test]
    fn classifies_frames() {
        let status = decode_frame(r#"{"method":"channels/status","result":{"channels":{}}}"#).unwrap();
        assert_eq!(status.kind(), FrameKind::Notification);

        let response = decode_frame(r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#).unwrap();
        assert_eq!(response.kind(), FrameKind::Response);
        assert_eq!(response.call_id(), Some(CallId(1)));

        let failure = decode_frame(r#"{"id":5,"error":{"code":-1,"message":"x"}}"#).unwrap();
        assert_eq!(failure.kind(), FrameKind::Response);

        let other = decode_frame(r#"{"hello":"world"}"#).unwrap();
        assert_eq!(other.kind(), FrameKind::Unrecognized);
    }

    #[test]
    fn non_object_json_is_unrecognized() {
        for text in ["[1,2,3]", "42", "\"hi\"", "null"] {
            let frame = decode_frame(text).unwrap();
            assert_eq!(frame.kind(), FrameKind::Unrecognized, "{text}");
        }
    }
}
