//! Subcommand implementations.

pub mod chat;
pub mod config;
pub mod send;
pub mod watch;

use anyhow::{Context, Result};
use clawdash_client::{ConnectionState, GatewaySession, SessionStore, StoreEvent};
use tracing::info;

use crate::config::Config;
use crate::render;

/// Build a session from `cfg` and connect it.
pub async fn open_session(cfg: &Config) -> Result<GatewaySession> {
    let session_config = cfg.session_config();
    info!(url = %session_config.gateway_url, "connecting to gateway");

    let session = GatewaySession::new(session_config, SessionStore::new());
    session
        .connect()
        .await
        .with_context(|| format!("failed to connect to {}", cfg.gateway.url))?;
    Ok(session)
}

/// Print the current connection and channel status.
pub fn print_overview(store: &SessionStore) {
    store.read(|snap| {
        println!("{}", render::connection_line(snap.connection_state));
        println!("{}", render::status_line(&snap.channel_status));
    });
}

/// Print one store event. Returns `true` once the link is gone.
pub fn print_event(event: &StoreEvent) -> bool {
    match event {
        StoreEvent::ConnectionChanged(state) => {
            println!("-- {}", render::connection_line(*state));
            return matches!(state, ConnectionState::Disconnected | ConnectionState::Error);
        }
        StoreEvent::MessageAppended(msg) => println!("{}", render::message_line(msg)),
        StoreEvent::ChannelStatusReplaced(status) => println!("-- {}", render::status_line(status)),
        StoreEvent::AuthChanged(auth) => {
            if let Some(line) = render::auth_line(auth) {
                println!("-- {line}");
            }
        }
        StoreEvent::DeliveryChanged { status, .. } => {
            println!("-- message {}", render::delivery_line(status));
        }
        StoreEvent::ErrorRecorded(err) => eprintln!("-- error: {err}"),
    }
    false
}
