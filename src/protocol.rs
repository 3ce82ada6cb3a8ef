// HWBENCH CONTROL PROTOCOL
// ONE JSON OBJECT PER CONNECTION, CLIENT -> DAEMON, NO REPLY:
//   {"action": "START"|"STOP"|"DUMP"|"TICK", "dt": <seconds>?, "dump_name": <string>?}
// THE CLIENT CLOSES ITS WRITE HALF TO END THE MESSAGE.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use crate::config::{DEFAULT_DUMP_NAME, DEFAULT_SAMPLE_DT_S};
use crate::error::ProtocolError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Start,
    Stop,
    Dump,
    Tick,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlMessage {
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dump_name: Option<String>,
}

/// A validated control message. The daemon matches on this exhaustively.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Start { interval: Duration },
    Stop,
    Dump { name: String },
    // LABEL IS STORED WITH THE TICK
    Tick { label: Option<String> },
}

impl ControlMessage {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            dt: None,
            dump_name: None,
        }
    }

    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = Some(dt);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.dump_name = Some(name.into());
        self
    }

    pub fn into_command(self) -> Result<Command, ProtocolError> {
        match self.action {
            Action::Start => {
                let dt = self.dt.unwrap_or(DEFAULT_SAMPLE_DT_S);
                Ok(Command::Start {
                    interval: sample_interval(dt)?,
                })
            }
            Action::Stop => Ok(Command::Stop),
            Action::Dump => Ok(Command::Dump {
                name: self
                    .dump_name
                    .unwrap_or_else(|| DEFAULT_DUMP_NAME.to_string()),
            }),
            Action::Tick => Ok(Command::Tick {
                label: self.dump_name,
            }),
        }
    }
}

// NON-FINITE, NON-POSITIVE, SUB-NANOSECOND AND OVERFLOWING dt ARE ALL
// REJECTED: A ZERO-PERIOD TIMER WOULD SPIN THE LOOP
pub fn sample_interval(dt: f64) -> Result<Duration, ProtocolError> {
    if !dt.is_finite() || dt <= 0.0 {
        return Err(ProtocolError::InvalidInterval(dt));
    }
    match Duration::try_from_secs_f64(dt) {
        Ok(d) if !d.is_zero() => Ok(d),
        _ => Err(ProtocolError::InvalidInterval(dt)),
    }
}

pub fn decode(bytes: &[u8]) -> Result<Command, ProtocolError> {
    let msg: ControlMessage = serde_json::from_slice(bytes)?;
    msg.into_command()
}

/// Read exactly one message from a freshly accepted connection. Bounded in
/// both time and size.
pub async fn read_command<R>(
    stream: &mut R,
    timeout: Duration,
    max_bytes: usize,
) -> Result<Command, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(256);
    let mut limited = stream.take(max_bytes as u64 + 1);
    tokio::time::timeout(timeout, limited.read_to_end(&mut buf))
        .await
        .map_err(|_| ProtocolError::Timeout(timeout))??;
    if buf.len() > max_bytes {
        return Err(ProtocolError::Oversize(max_bytes));
    }
    decode(&buf)
}

/// Fire one message at the daemon and hang up.
pub async fn send(socket: &Path, msg: &ControlMessage) -> Result<(), ProtocolError> {
    let payload = serde_json::to_vec(msg)?;
    let mut stream = UnixStream::connect(socket).await?;
    stream.write_all(&payload).await?;
    stream.shutdown().await?;
    Ok(())
}
