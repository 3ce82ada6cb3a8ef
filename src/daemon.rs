// HWBENCH SAMPLING DAEMON
// SINGLE-THREADED EVENT LOOP OVER TWO SOURCES: THE CONTROL SOCKET AND AN
// OPTIONAL SAMPLER INTERVAL. THE LOOP OWNS THE SERIES, SO NO LOCKS.
// EACH CONNECTION IS READ IN ITS OWN TASK ON THE SAME RUNTIME; THE LOOP
// DISPATCHES FINISHED READS IN ACCEPT ORDER. A SILENT CLIENT NEVER STALLS
// THE SAMPLER.
//
// STATE:  IDLE --START--> SAMPLING --STOP--> TERMINATED
//         IDLE --STOP--> TERMINATED
//         DUMP AND TICK IN EITHER STATE, NO TRANSITION

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::net::UnixListener;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::{CpuSpec, CpuModel, CLIENT_READ_TIMEOUT, MAX_MESSAGE_BYTES};
use crate::dump::{self, DumpFormat};
use crate::error::{DaemonError, ProtocolError};
use crate::probe::HardwareProbe;
use crate::protocol::{self, Command};
use crate::series::SampleSeries;

#[derive(Clone, Debug)]
pub struct DaemonConfig {
    pub socket: PathBuf,
    pub format: DumpFormat,
    pub cpu: CpuSpec,
    pub read_timeout: Duration,
    pub max_message_bytes: usize,
}

impl DaemonConfig {
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: socket.into(),
            format: DumpFormat::default(),
            cpu: CpuModel::default().spec(),
            read_timeout: CLIENT_READ_TIMEOUT,
            max_message_bytes: MAX_MESSAGE_BYTES,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

pub struct Daemon<P: HardwareProbe> {
    config: DaemonConfig,
    probe: P,
    series: SampleSeries,
    sampler: Option<Interval>,
}

/// Bind the control socket. A stale socket file left by a previous run is
/// removed and the parent directory created; anything else is fatal.
pub fn bind(socket: &Path) -> Result<UnixListener, DaemonError> {
    let bind_err = |source| DaemonError::Bind {
        path: socket.to_path_buf(),
        source,
    };
    if let Some(dir) = socket.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(bind_err)?;
    }
    if socket.exists() {
        debug!("removing stale socket {}", socket.display());
        std::fs::remove_file(socket).map_err(bind_err)?;
    }
    UnixListener::bind(socket).map_err(bind_err)
}

// PENDS FOREVER WHILE IDLE SO select! ONLY WAKES ON CONNECTIONS
async fn next_sample(sampler: &mut Option<Interval>) {
    match sampler {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

type PendingRead = JoinHandle<Result<Command, ProtocolError>>;

// OLDEST READ FIRST. PENDS FOREVER WHILE NO CONNECTION IS OPEN
async fn next_command(
    pending: &mut VecDeque<PendingRead>,
) -> Result<Result<Command, ProtocolError>, JoinError> {
    match pending.front_mut() {
        Some(read) => {
            let out = read.await;
            pending.pop_front();
            out
        }
        None => std::future::pending().await,
    }
}

impl<P: HardwareProbe> Daemon<P> {
    pub fn new(config: DaemonConfig, probe: P) -> Self {
        Self {
            config,
            probe,
            series: SampleSeries::new(),
            sampler: None,
        }
    }

    pub fn is_sampling(&self) -> bool {
        self.sampler.is_some()
    }

    pub fn series(&self) -> &SampleSeries {
        &self.series
    }

    /// Bind and serve until STOP. Returns the final series.
    pub async fn run(self) -> Result<SampleSeries, DaemonError> {
        let listener = bind(&self.config.socket)?;
        self.serve(listener).await
    }

    pub async fn serve(mut self, listener: UnixListener) -> Result<SampleSeries, DaemonError> {
        info!(
            "listening on {} (dump format: {})",
            self.config.socket.display(),
            self.config.format
        );

        let mut pending: VecDeque<PendingRead> = VecDeque::new();
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let mut stream = match accepted {
                        Ok((stream, _addr)) => stream,
                        Err(e) => {
                            warn!("accept error: {}", e);
                            continue;
                        }
                    };
                    let timeout = self.config.read_timeout;
                    let max_bytes = self.config.max_message_bytes;
                    pending.push_back(tokio::spawn(async move {
                        protocol::read_command(&mut stream, timeout, max_bytes).await
                    }));
                }
                read = next_command(&mut pending) => match read {
                    Ok(Ok(cmd)) => {
                        if self.dispatch(cmd) == Flow::Stop {
                            break;
                        }
                    }
                    Ok(Err(e)) => warn!("rejected control message: {}", e),
                    Err(e) => warn!("control reader failed: {}", e),
                },
                _ = next_sample(&mut self.sampler) => self.sample(),
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted");
                    break;
                }
            }
        }

        self.sampler = None;
        for read in pending {
            read.abort();
        }
        drop(listener);
        match std::fs::remove_file(&self.config.socket) {
            Ok(()) => debug!("released {}", self.config.socket.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("cannot remove {}: {}", self.config.socket.display(), e),
        }
        info!("stopped with {} samples", self.series.len());
        Ok(self.series)
    }

    fn dispatch(&mut self, cmd: Command) -> Flow {
        match cmd {
            Command::Start { interval } => {
                if self.sampler.is_some() {
                    debug!("already sampling, START ignored");
                } else {
                    let mut sampler = tokio::time::interval(interval);
                    sampler.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    self.sampler = Some(sampler);
                    info!("sampling every {:?}", interval);
                }
                Flow::Continue
            }
            Command::Stop => {
                info!("STOP received");
                Flow::Stop
            }
            Command::Dump { name } => {
                let path = dump::dump_path(&name, self.config.format);
                match dump::write(&self.series, &path, self.config.format) {
                    Ok(()) => info!("dumped {} samples to {}", self.series.len(), path.display()),
                    Err(e) => error!("dump to {} failed: {}", path.display(), e),
                }
                Flow::Continue
            }
            Command::Tick { label } => {
                let at = self.series.tick(label.as_deref());
                info!("tick at sample {} ({})", at, label.as_deref().unwrap_or("-"));
                Flow::Continue
            }
        }
    }

    // A FAILED READ DROPS THE WHOLE SAMPLE, NEVER A SINGLE COLUMN
    fn sample(&mut self) {
        match self.probe.read() {
            Ok(reading) => self.series.record(&reading, &self.config.cpu),
            Err(e) => warn!("sample skipped: {}", e),
        }
    }
}
