//! Connection settings handed to a [`GatewaySession`](crate::GatewaySession).
//!
//! Where these values are persisted is up to the caller.

use std::fmt;
use std::time::Duration;

/// Gateway address used when none is configured.
pub const DEFAULT_GATEWAY_URL: &str = "ws://localhost:18789";

/// Settings for one gateway session.
#[derive(Clone)]
pub struct SessionConfig {
    /// `ws://` or `wss://` address of the gateway.
    pub gateway_url: String,
    /// Token sent in the authenticate call.
    pub auth_token: String,
    /// Default addressee for [`GatewaySession::send`](crate::GatewaySession::send).
    pub peer: Option<String>,
    /// Limit on the WebSocket handshake.
    pub connect_timeout: Duration,
    /// How long a call may wait for its response.
    pub call_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            auth_token: String::new(),
            peer: None,
            connect_timeout: Duration::from_secs(10),
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl SessionConfig {
    pub fn new(gateway_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            gateway_url: gateway_url.into(),
            auth_token: auth_token.into(),
            ..Default::default()
        }
    }

    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = Some(peer.into());
        self
    }
}

// Keeps the token out of logs.
impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("gateway_url", &self.gateway_url)
            .field("auth_token", &mask_token(&self.auth_token))
            .field("peer", &self.peer)
            .field("connect_timeout", &self.connect_timeout)
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

/// Render a token as its first four characters followed by `***`.
pub fn mask_token(token: &str) -> String {
    if token.is_empty() {
        return String::new();
    }
    let prefix: String = token.chars().take(4).collect();
    format!("{prefix}***")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_local_gateway() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.gateway_url, "ws://localhost:18789");
        assert!(cfg.auth_token.is_empty());
        assert!(cfg.peer.is_none());
    }

    #[test]
    fn debug_masks_token() {
        let cfg = SessionConfig::new("ws://gw:1", "e33ec557f6bcfe89");
        let shown = format!("{cfg:?}");
        assert!(shown.contains("e33e***"));
        assert!(!shown.contains("f6bcfe89"));
    }

    #[test]
    fn mask_empty_token() {
        assert_eq!(mask_token(""), "");
        assert_eq!(mask_token("ab"), "ab***");
    }
}
