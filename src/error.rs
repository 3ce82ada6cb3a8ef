// HWBENCH ERROR TAXONOMY
// FATAL-AT-STARTUP (DAEMON), PER-CONNECTION (PROTOCOL), FATAL-AT-PARSE,
// FATAL-AT-COMPARE. TOLERATED ABSENCES NEVER SURFACE AS ERRORS.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("cannot bind control socket {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("accelerator unavailable: {0}")]
    Accelerator(String),

    #[error("hardware read failed: {0}")]
    Probe(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Rejection of a single client connection. The daemon keeps running.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed control message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sampling interval must be a positive number of seconds, got {0}")]
    InvalidInterval(f64),

    #[error("control message exceeds {0} bytes")]
    Oversize(usize),

    #[error("client sent nothing within {0:?}")]
    Timeout(std::time::Duration),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("cannot read log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("expecting `{0}` to be found")]
    MissingPattern(String),

    #[error("`{pattern}`: expected {expected} numeric field(s), found {found}")]
    FieldCount {
        pattern: String,
        expected: usize,
        found: usize,
    },

    #[error("`{pattern}`: no numeric token at position {index}")]
    MissingToken { pattern: String, index: usize },
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("benchmarks don't share the same grid: {expected:?} != {found:?}")]
    GridMismatch {
        expected: (u32, u32, u32),
        found: (u32, u32, u32),
    },

    #[error("cannot draw breakdown {0}")]
    Plot(String),
}

#[derive(Debug, Error)]
pub enum DumpError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("corrupt sample bundle: {0}")]
    Format(String),

    #[error("unknown dump format `{0}` (expected `bundle` or `json`)")]
    UnknownFormat(String),
}
