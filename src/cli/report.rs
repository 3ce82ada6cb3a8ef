// LOG PARSING AND COMPARISON ENTRY POINTS

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;

use hwbench::breakdown::{self, GRID_COMP_ROOT};
use hwbench::dump;
use hwbench::parser::{self, BenchmarkRun};
use hwbench::report;

pub fn run_parse(log: &Path, json: bool) -> Result<()> {
    let run = parser::parse_log(log)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        run.summary();
    }
    Ok(())
}

// TELEMETRY DUMPS ATTACH TO LOGS BY POSITION: DUMP i GOES WITH LOG i
pub fn run_report(logs: &[PathBuf], telemetry: &[PathBuf], breakdown_dir: Option<&Path>) -> Result<()> {
    if telemetry.len() > logs.len() {
        bail!("{} telemetry dump(s) for {} log(s)", telemetry.len(), logs.len());
    }

    let mut runs: Vec<BenchmarkRun> = Vec::with_capacity(logs.len());
    for (i, log) in logs.iter().enumerate() {
        let mut run = parser::parse_log(log)?;
        if let Some(path) = telemetry.get(i) {
            let series = dump::load(path).with_context(|| format!("cannot load {}", path.display()))?;
            info!("{}: {} samples from {}", run.backend_label, series.len(), path.display());
            run = run.with_telemetry(series);
        }
        runs.push(run);
    }

    if let Some(dir) = breakdown_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
        for run in &runs {
            write_breakdown(run, dir)?;
        }
    }

    match report::report(&runs)? {
        Some(r) => print!("{}", r),
        None => println!("NO RUNS TO COMPARE"),
    }
    Ok(())
}

fn write_breakdown(run: &BenchmarkRun, dir: &Path) -> Result<()> {
    let rows = breakdown::rows(&run.timings, GRID_COMP_ROOT);
    if rows.is_empty() {
        info!("{}: no {} timers, breakdown skipped", run.backend_label, GRID_COMP_ROOT);
        return Ok(());
    }
    let out = dir.join(format!("{}_gridcomp.svg", run.backend_sanitized()));
    let title = format!("FV Grid Comp detailed profiling ({})", run.backend_label);
    breakdown::plot(&rows, &title, &out)?;
    println!("BREAKDOWN:       {}", out.display());
    Ok(())
}
