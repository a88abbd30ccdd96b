//! `clawdash watch`: follow the gateway until Ctrl-C or disconnect.

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use super::{open_session, print_event, print_overview};
use crate::config::Config;

pub async fn run(cfg: &Config) -> Result<()> {
    let session = open_session(cfg).await?;
    let mut events = session.store().events();
    print_overview(session.store());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                session.disconnect().await?;
                break;
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if print_event(&event) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "display fell behind"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    Ok(())
}
