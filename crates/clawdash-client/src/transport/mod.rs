//! Transport layer for the gateway link.
//!
//! Only WebSocket is supported: `ws://` or `wss://`.

pub mod websocket;

pub use websocket::{Connection, OutboundHandle, TransportEvent};

use clawdash_core::{DashError, DashResult};

/// Check that `url` names a WebSocket endpoint before dialing it.
pub fn validate_url(url: &str) -> DashResult<()> {
    let lower = url.trim().to_lowercase();
    let rest = lower
        .strip_prefix("ws://")
        .or_else(|| lower.strip_prefix("wss://"))
        .ok_or_else(|| {
            DashError::TransportConstruction(format!(
                "unsupported URL scheme: {url} (expected ws:// or wss://)"
            ))
        })?;

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || host.starts_with(':') {
        return Err(DashError::TransportConstruction(format!(
            "missing host in URL: {url}"
        )));
    }
    Ok(())
}
