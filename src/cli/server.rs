// SAMPLER DAEMON ENTRY POINT
// BLOCKS UNTIL A CLIENT SENDS STOP (OR CTRL+C)

use std::path::Path;

use anyhow::{Context, Result};

use hwbench::config::CpuModel;
use hwbench::daemon::{Daemon, DaemonConfig};
use hwbench::dump::DumpFormat;
use hwbench::probe::NvmlProbe;

pub fn run_server(socket: &Path, format: DumpFormat, cpu: CpuModel, gpu_index: u32) -> Result<()> {
    let nr_cpus = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) }.max(1);
    let spec = cpu.spec();

    println!("HWBENCH SAMPLER");
    println!("SOCKET:          {}", socket.display());
    println!("DUMP FORMAT:     {}", format);
    println!("CPU:             {} (idle {} W, TDP {} W, {} online)", cpu, spec.idle_w, spec.tdp_w, nr_cpus);
    println!("GPU INDEX:       {}", gpu_index);
    println!();

    let probe = NvmlProbe::init(gpu_index).context("sampler cannot start")?;
    let config = DaemonConfig {
        format,
        cpu: spec,
        ..DaemonConfig::new(socket)
    };

    let series = super::runtime()?.block_on(Daemon::new(config, probe).run())?;

    println!("HWBENCH SAMPLER OUT ({} samples, {} ticks).", series.len(), series.ticks().len());
    Ok(())
}
