// HWBENCH COMPARISON REPORT
// EVERY UNORDERED PAIR OF RUNS, IN INPUT ORDER, GETS A TIME BLOCK, AN
// ENERGY BLOCK (BOTH RUNS SAMPLED) AND A COST BLOCK. EACH LINE ANCHORS THE
// LARGER VALUE AT 1.00x, WHICHEVER RUN IT CAME FROM.
//
// COST IS DURATION x NODE-CLASS RATE. NOT NORMALIZED FOR RANK OR NODE
// COUNT BETWEEN THE TWO RUNS.

use std::fmt;

use serde::Serialize;

use crate::config::DEFAULT_SAMPLE_DT_S;
use crate::energy::EnergyReport;
use crate::error::ReportError;
use crate::parser::BenchmarkRun;

pub const TIME_METRIC: &str   = "Time (in seconds)";
pub const ENERGY_METRIC: &str = "Energy (in kW)";
pub const COST_METRIC: &str   = "Cost (in s.k$)";

const SECONDS: &str   = "s";
const KILOWATTS: &str = "kW";
const COST_UNIT: &str = "s.k$";

// TIMER WHOSE DURATION COVERS THE WHOLE FV GRID COMPONENT
const FV_GRID_COMP_TIMER: &str = "DYN";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricBlock {
    pub metric_name: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub setup_description: String,
    pub metric_blocks: Vec<MetricBlock>,
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.setup_description)?;
        for block in &self.metric_blocks {
            write!(f, "{}:\n  {}\n", block.metric_name, block.text)?;
        }
        Ok(())
    }
}

/// `"<label>: 1.00x (<larger><unit>) - <ratio>x (<smaller><unit>)"`
pub fn compare_in_x(a: f64, b: f64, label: &str, unit: &str) -> String {
    let (larger, smaller) = if a >= b { (a, b) } else { (b, a) };
    let ratio = if larger == smaller {
        "1.00".to_string()
    } else if smaller == 0.0 {
        "inf".to_string()
    } else {
        format!("{:.2}", larger / smaller)
    };
    format!(
        "{}: 1.00x ({:.2}{}) - {}x ({:.2}{})",
        label, larger, unit, ratio, smaller, unit
    )
}

/// Median; mean of the middle pair for even counts. `None` when empty.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

// GRID COMPONENT MINUS ITS FIRST TIMESTEP (JIT / WARM-UP COST)
fn fv_grid_comp(run: &BenchmarkRun) -> Option<f64> {
    let total = run.timing(FV_GRID_COMP_TIMER)?.duration_seconds;
    let first = run.dycore_timings.first()?;
    Some(total - first)
}

fn energy_kw(run: &BenchmarkRun) -> Option<f64> {
    let telemetry = run.telemetry.as_ref()?;
    let energy = EnergyReport::of_series(telemetry, DEFAULT_SAMPLE_DT_S);
    Some(energy.envelope_for(run.hardware_class()).kwh)
}

fn cost_rate(run: &BenchmarkRun) -> f64 {
    run.hardware_class().cost_rate_kdollars()
}

struct Block {
    lines: Vec<String>,
}

impl Block {
    fn new() -> Self {
        Self { lines: Vec::new() }
    }

    // A SIDE WITHOUT THE MEASURE DROPS THE LINE
    fn compare(&mut self, a: Option<f64>, b: Option<f64>, label: &str, unit: &str) {
        if let (Some(a), Some(b)) = (a, b) {
            self.lines.push(compare_in_x(a, b, label, unit));
        }
    }

    fn finish(self, metric_name: &str, a: &BenchmarkRun, b: &BenchmarkRun) -> MetricBlock {
        let mut text = format!("{} vs {}\n\n", a.backend_label, b.backend_label);
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        MetricBlock {
            metric_name: metric_name.to_string(),
            text,
        }
    }
}

fn compare_pair(a: &BenchmarkRun, b: &BenchmarkRun) -> Vec<MetricBlock> {
    let mut blocks = Vec::with_capacity(3);

    // TIME
    let mut time = Block::new();
    time.compare(Some(a.run_time), Some(b.run_time), "Global RUN", SECONDS);
    time.compare(
        fv_grid_comp(a),
        fv_grid_comp(b),
        "FV Grid Comp (1st timestep removed)",
        SECONDS,
    );
    time.compare(
        median(&a.dycore_timings),
        median(&b.dycore_timings),
        "Dycore (median)",
        SECONDS,
    );
    time.compare(
        median(&a.inner_dycore_timings),
        median(&b.inner_dycore_timings),
        "GT dycore (median)",
        SECONDS,
    );
    blocks.push(time.finish(TIME_METRIC, a, b));

    // ENERGY
    if a.telemetry.is_some() && b.telemetry.is_some() {
        let mut energy = Block::new();
        energy.compare(energy_kw(a), energy_kw(b), "Overall energy envelop", KILOWATTS);
        blocks.push(energy.finish(ENERGY_METRIC, a, b));
    }

    // COST
    let (ra, rb) = (cost_rate(a), cost_rate(b));
    let mut cost = Block::new();
    cost.compare(Some(a.run_time * ra), Some(b.run_time * rb), "Overall", COST_UNIT);
    cost.compare(
        fv_grid_comp(a).map(|v| v * ra),
        fv_grid_comp(b).map(|v| v * rb),
        "FV Grid Comp",
        COST_UNIT,
    );
    cost.compare(
        median(&a.dycore_timings).map(|v| v * ra),
        median(&b.dycore_timings).map(|v| v * rb),
        "Dycore (median)",
        COST_UNIT,
    );
    blocks.push(cost.finish(COST_METRIC, a, b));

    blocks
}

fn setup_description(runs: &[BenchmarkRun]) -> String {
    let (nx, _, nz) = runs[0].grid_resolution;
    let mut s = format!("Experiment:\n  Resolution: C{}-L{}\n  Layouts:\n", nx, nz);
    for run in runs {
        let (lx, ly, ranks) = run.node_setup;
        s.push_str(&format!(
            "    - {}: {}x{}, {} ranks\n",
            run.backend_label, lx, ly, ranks
        ));
    }
    s
}

/// Compare every pair of `runs`. `None` for an empty input; a grid mismatch
/// anywhere aborts the whole report.
pub fn report(runs: &[BenchmarkRun]) -> Result<Option<ComparisonReport>, ReportError> {
    let Some(first) = runs.first() else {
        return Ok(None);
    };
    let expected = first.grid_resolution;
    if let Some(other) = runs.iter().find(|r| r.grid_resolution != expected) {
        return Err(ReportError::GridMismatch {
            expected,
            found: other.grid_resolution,
        });
    }

    let mut metric_blocks = Vec::new();
    for (i, a) in runs.iter().enumerate() {
        for b in &runs[i + 1..] {
            metric_blocks.extend(compare_pair(a, b));
        }
    }

    Ok(Some(ComparisonReport {
        setup_description: setup_description(runs),
        metric_blocks,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn larger_is_anchored() {
        assert_eq!(
            compare_in_x(40.0, 120.0, "Global RUN", "s"),
            "Global RUN: 1.00x (120.00s) - 3.00x (40.00s)"
        );
        assert_eq!(
            compare_in_x(120.0, 40.0, "Global RUN", "s"),
            "Global RUN: 1.00x (120.00s) - 3.00x (40.00s)"
        );
    }

    #[test]
    fn equal_and_zero() {
        assert_eq!(compare_in_x(5.0, 5.0, "X", "kW"), "X: 1.00x (5.00kW) - 1.00x (5.00kW)");
        assert_eq!(compare_in_x(0.0, 0.0, "X", "s"), "X: 1.00x (0.00s) - 1.00x (0.00s)");
        assert_eq!(compare_in_x(3.0, 0.0, "X", "s"), "X: 1.00x (3.00s) - infx (0.00s)");
    }

    #[test]
    fn median_odd_even_empty() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn empty_input_has_no_report() {
        assert!(report(&[]).unwrap().is_none());
    }
}
