//! Plain-text rendering of store contents for the terminal.

use chrono::{DateTime, Local};
use clawdash_client::{AuthState, ConnectionState, DeliveryStatus};
use clawdash_core::{ChannelStatusMap, Direction, Message};

/// `HH:MM` in local time, or `--:--` for an out-of-range timestamp.
pub fn clock(timestamp_ms: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms)
        .map(|dt| dt.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

pub fn message_line(msg: &Message) -> String {
    let arrow = match msg.direction {
        Direction::Incoming => "<",
        Direction::Outgoing => ">",
    };
    format!("[{}] {} {}: {}", clock(msg.timestamp), arrow, msg.sender, msg.text)
}

pub fn status_line(status: &ChannelStatusMap) -> String {
    if status.is_empty() {
        return "channels: none".to_string();
    }
    let parts: Vec<String> = status
        .iter()
        .map(|(channel, token)| format!("{channel}={token}"))
        .collect();
    format!("channels: {}", parts.join(" "))
}

pub fn connection_line(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Disconnected => "disconnected",
        ConnectionState::Connecting => "connecting...",
        ConnectionState::ConnectedUnauthenticated => "connected, authenticating",
        ConnectionState::Ready => "connected",
        ConnectionState::Error => "connection failed",
    }
}

pub fn auth_line(auth: &AuthState) -> Option<String> {
    match auth {
        AuthState::Pending => None,
        AuthState::Accepted => Some("authenticated".to_string()),
        AuthState::Rejected(reason) => Some(format!("authentication rejected: {reason}")),
        AuthState::Unconfirmed => Some("authentication not acknowledged".to_string()),
    }
}

pub fn delivery_line(status: &DeliveryStatus) -> String {
    match status {
        DeliveryStatus::Pending => "pending".to_string(),
        DeliveryStatus::Confirmed => "delivered to gateway".to_string(),
        DeliveryStatus::Rejected(reason) => format!("rejected: {reason}"),
        DeliveryStatus::Unconfirmed => "no confirmation".to_string(),
    }
}
