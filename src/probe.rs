// HWBENCH HARDWARE PROBE
// ONE SYNCHRONOUS READ PER SAMPLER TICK. GPU COUNTERS FROM NVML (ONE DEVICE),
// CPU UTILIZATION FROM /proc/stat DELTAS BETWEEN CONSECUTIVE READS.

use std::fs;

use nvml_wrapper::Nvml;

use crate::error::DaemonError;
use crate::series::HardwareReading;

const PROC_STAT: &str = "/proc/stat";
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const MILLIWATTS_PER_WATT: f64 = 1000.0;

pub trait HardwareProbe {
    fn read(&mut self) -> Result<HardwareReading, DaemonError>;
}

// --- CPU ---

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub idle: u64,
    pub total: u64,
}

/// Aggregate `cpu ` line of /proc/stat. idle + iowait count as idle.
pub fn parse_cpu_line(raw: &str) -> Option<CpuTimes> {
    let line = raw.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|s| s.parse().ok())
        .collect();
    if fields.len() < 4 {
        return None;
    }
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    let total = fields.iter().sum();
    Some(CpuTimes { idle, total })
}

pub fn busy_pct(prev: CpuTimes, now: CpuTimes) -> f64 {
    let total = now.total.saturating_sub(prev.total);
    if total == 0 {
        return 0.0;
    }
    let idle = now.idle.saturating_sub(prev.idle).min(total);
    (total - idle) as f64 / total as f64 * 100.0
}

/// System-wide CPU utilization since the previous call. The first call
/// covers everything since boot.
#[derive(Debug, Default)]
pub struct ProcStatCpu {
    prev: CpuTimes,
}

impl ProcStatCpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn utilization(&mut self) -> Result<f64, DaemonError> {
        let raw = fs::read_to_string(PROC_STAT)?;
        let now = parse_cpu_line(&raw)
            .ok_or_else(|| DaemonError::Probe(format!("no aggregate cpu line in {}", PROC_STAT)))?;
        let pct = busy_pct(self.prev, now);
        self.prev = now;
        Ok(pct)
    }
}

// --- GPU ---

pub struct NvmlProbe {
    nvml: Nvml,
    index: u32,
    cpu: ProcStatCpu,
}

impl NvmlProbe {
    // FAILS WITHOUT A DRIVER OR WITHOUT DEVICE `index`: THE DAEMON MUST NOT
    // START IF IT CANNOT SAMPLE
    pub fn init(index: u32) -> Result<Self, DaemonError> {
        let nvml = Nvml::init().map_err(|e| DaemonError::Accelerator(format!("NVML init: {}", e)))?;
        let count = nvml
            .device_count()
            .map_err(|e| DaemonError::Accelerator(format!("NVML device count: {}", e)))?;
        if index >= count {
            return Err(DaemonError::Accelerator(format!(
                "GPU {} requested, {} visible",
                index, count
            )));
        }
        let name = nvml
            .device_by_index(index)
            .and_then(|d| d.name())
            .map_err(|e| DaemonError::Accelerator(format!("GPU {}: {}", index, e)))?;
        tracing::info!("sampling GPU {} ({})", index, name);

        let mut cpu = ProcStatCpu::new();
        // PRIME THE DELTA SO THE FIRST SAMPLE IS NOT A SINCE-BOOT AVERAGE
        cpu.utilization()?;
        Ok(Self { nvml, index, cpu })
    }
}

impl HardwareProbe for NvmlProbe {
    fn read(&mut self) -> Result<HardwareReading, DaemonError> {
        let nvml_err = |e: nvml_wrapper::error::NvmlError| DaemonError::Probe(e.to_string());
        let device = self.nvml.device_by_index(self.index).map_err(nvml_err)?;
        let power_mw = device.power_usage().map_err(nvml_err)?;
        let util = device.utilization_rates().map_err(nvml_err)?;
        let mem = device.memory_info().map_err(nvml_err)?;

        Ok(HardwareReading {
            gpu_power_w: power_mw as f64 / MILLIWATTS_PER_WATT,
            gpu_util_pct: util.gpu as f64,
            gpu_mem_util_pct: util.memory as f64,
            gpu_mem_used_mb: mem.used as f64 / BYTES_PER_MB,
            cpu_util_pct: self.cpu.utilization()?,
        })
    }
}
