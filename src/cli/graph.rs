// DUMP VIEWER: `graph` AND `envelop`
// PLOTS A DUMP AS SVG (POWER/UTILIZATION LEFT AXIS, VRAM RIGHT AXIS) AND
// PRINTS PEAKS AND THE ENERGY ENVELOPE. `envelop` FIRST CUTS A WALL-CLOCK
// WINDOW, CONVERTED TO SAMPLE INDICES WITH THE NOMINAL dt.

use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use plotters::prelude::*;

use hwbench::config::{GpuModel, DEFAULT_SAMPLE_DT_S};
use hwbench::dump;
use hwbench::energy::EnergyReport;
use hwbench::series::SampleSeries;

const PLOT_SIZE: (u32, u32) = (1024, 1024);

// TRUNCATING: [START/dt, STOP/dt)
pub fn sample_range(start_s: f64, stop_s: f64, dt: f64) -> Range<usize> {
    (start_s / dt) as usize..(stop_s / dt) as usize
}

pub fn run_graph(path: &Path, gpu: GpuModel, output: Option<PathBuf>, data_range: Option<(f64, f64)>) -> Result<()> {
    let series = dump::load(path).with_context(|| format!("cannot load {}", path.display()))?;
    let series = match data_range {
        Some((start, stop)) => {
            let range = sample_range(start, stop, DEFAULT_SAMPLE_DT_S);
            println!("WINDOW:          samples {}..{} of {}", range.start, range.end, series.len());
            series.window(range)
        }
        None => series,
    };

    series.summary();

    let out = output.unwrap_or_else(|| plot_path(path));
    if series.len() < 2 {
        println!("NOT ENOUGH SAMPLES TO PLOT");
    } else {
        plot(&series, gpu, &out)?;
        println!("PLOT:            {}", out.display());
    }

    EnergyReport::of_series(&series, DEFAULT_SAMPLE_DT_S).print();
    Ok(())
}

// hws_dump.hws.gz -> hws_dump.svg
fn plot_path(dump: &Path) -> PathBuf {
    let name = dump.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let stem = name.split('.').next().filter(|s| !s.is_empty()).unwrap_or("hardware_load");
    dump.with_file_name(format!("{}.svg", stem))
}

fn plot(series: &SampleSeries, gpu: GpuModel, out: &Path) -> Result<()> {
    let spec = gpu.spec();
    let n = series.len();
    let plot_err = |e: &dyn std::fmt::Display| anyhow!("plot {}: {}", out.display(), e);

    let root = SVGBackend::new(out, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| plot_err(&e))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Hardware load ({})", gpu), ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .right_y_label_area_size(60)
        .build_cartesian_2d(0usize..n, 0.0..spec.tdp_w)
        .map_err(|e| plot_err(&e))?
        .set_secondary_coord(0usize..n, 0.0..spec.max_vram_mb);

    chart
        .configure_mesh()
        .x_desc("sample")
        .y_desc("W/%")
        .draw()
        .map_err(|e| plot_err(&e))?;
    chart
        .configure_secondary_axes()
        .y_desc("MB")
        .draw()
        .map_err(|e| plot_err(&e))?;

    let primary: [(&str, &[f64]); 4] = [
        ("GPU PSU (W)", series.gpu_power_w()),
        ("GPU utilization (%)", series.gpu_util_pct()),
        ("CPU PSU (W, extrapolated)", series.cpu_power_w_estimated()),
        ("CPU utilization (%)", series.cpu_util_pct()),
    ];
    let vram = primary.len();
    for (i, (label, values)) in primary.into_iter().enumerate() {
        chart
            .draw_series(LineSeries::new(
                values.iter().copied().enumerate(),
                Palette99::pick(i).stroke_width(1),
            ))
            .map_err(|e| plot_err(&e))?
            .label(label)
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], Palette99::pick(i).stroke_width(2))
            });
    }

    chart
        .draw_secondary_series(LineSeries::new(
            series.gpu_mem_used_mb().iter().copied().enumerate(),
            Palette99::pick(vram).stroke_width(1),
        ))
        .map_err(|e| plot_err(&e))?
        .label("GPU VRAM (MB)")
        .legend(move |(x, y)| {
            PathElement::new(vec![(x, y), (x + 20, y)], Palette99::pick(vram).stroke_width(2))
        });

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .draw()
        .map_err(|e| plot_err(&e))?;
    root.present().map_err(|e| plot_err(&e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_truncates_by_dt() {
        assert_eq!(sample_range(1.0, 2.75, 0.5), 2..5);
        assert_eq!(sample_range(0.0, 0.25, 0.5), 0..0);
    }

    #[test]
    fn plot_next_to_dump() {
        assert_eq!(plot_path(Path::new("runs/hws_dump.hws.gz")), PathBuf::from("runs/hws_dump.svg"));
        assert_eq!(plot_path(Path::new("a.json")), PathBuf::from("a.svg"));
    }
}
