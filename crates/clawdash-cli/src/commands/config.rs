//! `clawdash config [--save]`: show the effective configuration.

use std::path::Path;

use anyhow::Result;
use clawdash_client::mask_token;

use crate::config::Config;

pub fn run(cfg: &Config, path: &Path, save: bool) -> Result<()> {
    let gw = &cfg.gateway;
    println!("gateway:          {}", gw.url);
    println!("token:            {}", mask_token(&gw.token));
    println!("peer:             {}", gw.peer.as_deref().unwrap_or("-"));
    println!("connect timeout:  {}s", gw.connect_timeout_secs);
    println!("call timeout:     {}s", gw.call_timeout_secs);

    if save {
        cfg.save(path)?;
        println!("saved to {}", path.display());
    }
    Ok(())
}
