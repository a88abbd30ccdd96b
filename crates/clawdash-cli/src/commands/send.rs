//! `clawdash send [--to PEER] TEXT`: send one message and report its delivery.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clawdash_client::{ConnectionState, DeliveryStatus, StoreEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio::time;

use super::open_session;
use crate::config::Config;
use crate::render;

pub async fn run(cfg: &Config, to: Option<&str>, text: &str) -> Result<()> {
    let session = open_session(cfg).await?;
    let mut events = session.store().events();

    let message = match to {
        Some(to) => session.send_message(to, text),
        None => session.send(text),
    }
    .context("send failed (pass --to or configure gateway.peer)")?;
    println!("{}", render::message_line(&message));

    let wait = cfg.session_config().call_timeout + Duration::from_secs(1);
    let outcome = time::timeout(wait, async {
        loop {
            match events.recv().await {
                Ok(StoreEvent::DeliveryChanged { id, status }) if id == message.id => {
                    return Some(status);
                }
                Ok(StoreEvent::ConnectionChanged(ConnectionState::Disconnected)) => return None,
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
    .unwrap_or(DeliveryStatus::Unconfirmed);

    println!("{}", render::delivery_line(&outcome));
    session.disconnect().await?;

    if let DeliveryStatus::Rejected(reason) = outcome {
        bail!("gateway rejected the message: {reason}");
    }
    Ok(())
}
