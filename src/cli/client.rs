use std::path::Path;

use anyhow::{Context, Result};

use hwbench::config::DEFAULT_SAMPLE_DT_S;
use hwbench::protocol::{self, Action, ControlMessage};

pub fn run_client(socket: &Path, action: Action, name: Option<String>, dt: Option<f64>) -> Result<()> {
    let mut msg = ControlMessage::new(action);
    if action == Action::Start {
        msg = msg.with_dt(dt.unwrap_or(DEFAULT_SAMPLE_DT_S));
    }
    if let Some(name) = name {
        msg = msg.with_name(name);
    }
    // THE DAEMON NEVER REPLIES: CATCH WHAT IT WOULD REJECT BEFORE SENDING
    msg.clone().into_command()?;

    super::runtime()?
        .block_on(protocol::send(socket, &msg))
        .with_context(|| format!("no sampler listening on {}", socket.display()))?;
    Ok(())
}
