//! `clawdash chat`: line-oriented conversation with the configured peer.
//!
//! Each stdin line is sent as one message; `/quit` or EOF ends the session.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use super::{open_session, print_event, print_overview};
use crate::config::Config;

pub async fn run(cfg: &Config) -> Result<()> {
    let peer = cfg
        .session_config()
        .peer
        .context("chat needs a peer: pass --peer or set gateway.peer")?;

    let session = open_session(cfg).await?;
    let mut events = session.store().events();
    print_overview(session.store());
    println!("chatting with {peer} (/quit to exit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                let line = line.trim_end();
                if line == "/quit" {
                    break;
                }
                if line.trim().is_empty() {
                    continue;
                }
                if let Err(e) = session.send_message(&peer, line) {
                    eprintln!("send failed: {e}");
                }
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if print_event(&event) {
                        return Ok(());
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "display fell behind"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.disconnect().await?;
    Ok(())
}
