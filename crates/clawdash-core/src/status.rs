//! Per-channel link status as pushed by the gateway.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rpc::{methods, Frame};

/// Status token for a channel the gateway has not reported.
pub const UNKNOWN_STATUS: &str = "unknown";

/// Channels shown before the first status push.
pub const DEFAULT_CHANNELS: [&str; 2] = ["whatsapp", "telegram"];

/// Channel name to status token (`"linked"`, `"enabled"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelStatusMap(BTreeMap<String, String>);

impl Default for ChannelStatusMap {
    fn default() -> Self {
        DEFAULT_CHANNELS
            .iter()
            .map(|c| (c.to_string(), UNKNOWN_STATUS.to_string()))
            .collect()
    }
}

impl ChannelStatusMap {
    /// Status of `channel`, `"unknown"` when absent.
    pub fn get(&self, channel: &str) -> &str {
        self.0.get(channel).map(String::as_str).unwrap_or(UNKNOWN_STATUS)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build a map from a `channels` JSON object. Non-string tokens keep
    /// their JSON text.
    pub fn from_channels(channels: &Value) -> Option<Self> {
        let map = channels.as_object()?;
        Some(
            map.iter()
                .map(|(name, token)| {
                    let token = match token {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (name.clone(), token)
                })
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ChannelStatusMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

pub fn is_status_notification(frame: &Frame) -> bool {
    frame.is_method(methods::CHANNELS_STATUS)
}

/// The replacement map carried by a `channels/status` push, or `None` for any
/// other frame. A push without a `channels` object resets to the default map.
pub fn status_update(frame: &Frame) -> Option<ChannelStatusMap> {
    if !is_status_notification(frame) {
        return None;
    }
    let pushed = frame
        .result
        .as_ref()
        .and_then(|r| r.get("channels"))
        .and_then(ChannelStatusMap::from_channels);
    Some(pushed.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_map_is_unknown() {
        let map = ChannelStatusMap::default();
        assert_eq!(map.get("whatsapp"), "unknown");
        assert_eq!(map.get("telegram"), "unknown");
        assert_eq!(map.get("signal"), "unknown");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn push_replaces_whole_map() {
        let frame = Frame::from_value(json!({
            "method": "channels/status",
            "result": { "channels": { "whatsapp": "linked" } }
        }));
        let map = status_update(&frame).unwrap();
        let expected: ChannelStatusMap = [("whatsapp", "linked")].into_iter().collect();
        assert_eq!(map, expected);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("telegram"), "unknown");
    }

    #[test]
    fn push_without_channels_resets() {
        let frame = Frame::from_value(json!({ "method": "channels/status" }));
        assert_eq!(status_update(&frame), Some(ChannelStatusMap::default()));

        let frame = Frame::from_value(json!({ "method": "channels/status", "result": { "channels": "linked" } }));
        assert_eq!(status_update(&frame), Some(ChannelStatusMap::default()));
    }

    #[test]
    fn empty_channels_object_is_authoritative() {
        let frame = Frame::from_value(json!({ "method": "channels/status", "result": { "channels": {} } }));
        let map = status_update(&frame).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn non_string_tokens_keep_json_text() {
        let frame = Frame::from_value(json!({
            "method": "channels/status",
            "result": { "channels": { "whatsapp": true, "sms": 3 } }
        }));
        let map = status_update(&frame).unwrap();
        assert_eq!(map.get("whatsapp"), "true");
        assert_eq!(map.get("sms"), "3");
    }

    #[test]
    fn other_frames_are_ignored() {
        let frame = Frame::from_value(json!({ "method": "message/new", "params": {} }));
        assert_eq!(status_update(&frame), None);
    }
}
