// HWBENCH CONFIGURATION TABLES
// PURE-RUST MODULE: NO I/O. IMMUTABLE HARDWARE AND COST TABLES KEYED BY
// ENUMS, PLUS THE DAEMON/CLIENT DEFAULTS. LABELS ARE SELECTED AT THE CLI
// (FLAG OR ENV), NEVER MUTATED AT RUNTIME.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// --- DAEMON DEFAULTS ---

pub const DEFAULT_SOCKET_PATH: &str = "./hwsampler-sockets/stats_wrapper";
pub const DEFAULT_DUMP_NAME: &str = "hws_dump";
pub const DEFAULT_SAMPLE_DT_S: f64 = 0.1;

// ONE MESSAGE PER CONNECTION; ANYTHING BIGGER IS NOT A CONTROL MESSAGE
pub const MAX_MESSAGE_BYTES: usize = 4096;
// A STALLED CLIENT MUST NOT HOLD THE LOOP LONGER THAN THIS
pub const CLIENT_READ_TIMEOUT: Duration = Duration::from_secs(2);

// --- HARDWARE SPECS ---

const EPYC_7402_IDLE_W: f64 = 60.0;   // BENCH REPORTS
const EPYC_7402_TDP_W: f64  = 180.0;  // SPEC SHEET
const EPYC_7763_IDLE_W: f64 = 60.0;   // ASSUMED SAME AS 7402
const EPYC_7763_TDP_W: f64  = 280.0;  // SPEC SHEET

const A100_TDP_W: f64       = 400.0;  // SPEC SHEET
const A100_MAX_VRAM_MB: f64 = 40536.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CpuSpec {
    pub idle_w: f64,
    pub tdp_w: f64,
}

impl CpuSpec {
    // TWO-POINT LINEAR MODEL BETWEEN IDLE AND TDP. NO DIRECT CPU POWER
    // TELEMETRY EXISTS ON THE TARGET NODES.
    pub fn estimate_power(&self, cpu_util_pct: f64) -> f64 {
        (cpu_util_pct / 100.0 * self.tdp_w).max(self.idle_w)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GpuSpec {
    pub tdp_w: f64,
    pub max_vram_mb: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CpuModel {
    Epyc7402,
    #[default]
    Epyc7763,
}

impl CpuModel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Epyc7402 => "EPYC 7402",
            Self::Epyc7763 => "EPYC 7763",
        }
    }

    pub fn spec(self) -> CpuSpec {
        match self {
            Self::Epyc7402 => CpuSpec { idle_w: EPYC_7402_IDLE_W, tdp_w: EPYC_7402_TDP_W },
            Self::Epyc7763 => CpuSpec { idle_w: EPYC_7763_IDLE_W, tdp_w: EPYC_7763_TDP_W },
        }
    }
}

impl fmt::Display for CpuModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CpuModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Epyc7402, Self::Epyc7763]
            .into_iter()
            .find(|m| m.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown CPU `{}` (known: EPYC 7402, EPYC 7763)", s))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum GpuModel {
    #[default]
    A100Sx40,
}

impl GpuModel {
    pub fn label(self) -> &'static str {
        match self {
            Self::A100Sx40 => "A100_SX40",
        }
    }

    pub fn spec(self) -> GpuSpec {
        match self {
            Self::A100Sx40 => GpuSpec { tdp_w: A100_TDP_W, max_vram_mb: A100_MAX_VRAM_MB },
        }
    }
}

impl fmt::Display for GpuModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GpuModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if Self::A100Sx40.label().eq_ignore_ascii_case(s.trim()) {
            Ok(Self::A100Sx40)
        } else {
            Err(format!("unknown GPU `{}` (known: A100_SX40)", s))
        }
    }
}

// --- COST TABLE ---
// FIXED INFRASTRUCTURE RATE PER NODE CLASS, IN k$ PER SECOND-EQUIVALENT.
// NOT NORMALIZED FOR RANK OR NODE COUNT: A RUN ON 6 NODES COSTS THE SAME
// AS ONE ON 1 NODE FOR THE SAME DURATION. KNOWN LIMITATION, KEEP IT.

const CPU_NODE_KDOLLARS: f64         = 11.0;  // 1 NODE EPYC 7402
const ACCELERATED_NODE_KDOLLARS: f64 = 63.0;  // 1 NODE EPYC 7402 + A100

pub const CPU_BACKEND_LABEL: &str = "fortran";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HardwareClass {
    Cpu,
    Accelerated,
}

impl HardwareClass {
    pub fn of_backend(backend_label: &str) -> Self {
        if backend_label == CPU_BACKEND_LABEL {
            Self::Cpu
        } else {
            Self::Accelerated
        }
    }

    pub fn cost_rate_kdollars(self) -> f64 {
        match self {
            Self::Cpu => CPU_NODE_KDOLLARS,
            Self::Accelerated => ACCELERATED_NODE_KDOLLARS,
        }
    }
}
