// HWBENCH GRID-COMP BREAKDOWN
// THE FV GRID-COMP TIMER AND EVERY TIMER BELOW IT, WALKED IN PREORDER FROM
// THE PARENT LINKS, DRAWN AS INDENTED HORIZONTAL BARS (ONE PER TIMER).
// BAR COLOR IS DEPTH. THE ROOT BAR IS ABSENT WHEN THE LOG HAS NO ROOT TIMER.

use std::path::Path;

use plotters::prelude::*;

use crate::error::ReportError;
use crate::hierarchy::TimingRecord;

pub const GRID_COMP_ROOT: &str = "DYN";

const PLOT_WIDTH: u32     = 1024;
const ROW_HEIGHT_PX: u32  = 28;
const HEADER_PX: u32      = 48;
const LABEL_FONT_PX: u32  = 14;
const TITLE_FONT_PX: u32  = 20;
// ROOM RIGHT OF THE LONGEST BAR FOR ITS LABEL
const X_HEADROOM: f64     = 1.6;

#[derive(Clone, Debug, PartialEq)]
pub struct BreakdownRow {
    pub name: String,
    pub parent: String,
    pub depth: usize,
    pub seconds: f64,
}

impl BreakdownRow {
    pub fn label(&self) -> String {
        format!("{}{}: {:.2}s", "  ".repeat(self.depth), self.name, self.seconds)
    }
}

/// Preorder rows of the subtree under `root`. Depth 0 is the root itself,
/// present only when a timer named `root` was parsed.
pub fn rows(timings: &[TimingRecord], root: &str) -> Vec<BreakdownRow> {
    let mut out = Vec::new();
    let depth = match timings.iter().find(|t| t.name == root) {
        Some(t) => {
            out.push(BreakdownRow {
                name: t.name.clone(),
                parent: t.parent_name.clone(),
                depth: 0,
                seconds: t.duration_seconds,
            });
            1
        }
        None => 0,
    };
    walk(timings, root, depth, &mut out);
    out
}

fn walk(timings: &[TimingRecord], parent: &str, depth: usize, out: &mut Vec<BreakdownRow>) {
    // A NAME REUSED AS ITS OWN ANCESTOR WOULD NEVER END
    if depth > timings.len() {
        return;
    }
    for t in timings.iter().filter(|t| t.parent_name == parent && t.name != parent) {
        out.push(BreakdownRow {
            name: t.name.clone(),
            parent: t.parent_name.clone(),
            depth,
            seconds: t.duration_seconds,
        });
        walk(timings, &t.name, depth + 1, out);
    }
}

/// Draw `rows` as an SVG at `out`. Empty rows draw nothing.
pub fn plot(rows: &[BreakdownRow], title: &str, out: &Path) -> Result<(), ReportError> {
    if rows.is_empty() {
        return Ok(());
    }
    let plot_err = |e: &dyn std::fmt::Display| ReportError::Plot(format!("{}: {}", out.display(), e));

    let n = rows.len();
    let height = HEADER_PX + ROW_HEIGHT_PX * n as u32;
    let x_max = rows.iter().map(|r| r.seconds).fold(0.0, f64::max).max(f64::MIN_POSITIVE) * X_HEADROOM;

    let root = SVGBackend::new(out, (PLOT_WIDTH, height)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| plot_err(&e))?;
    root.draw(&Text::new(
        title.to_string(),
        (10, 10),
        ("sans-serif", TITLE_FONT_PX).into_font(),
    ))
    .map_err(|e| plot_err(&e))?;

    let (_, body) = root.split_vertically(HEADER_PX);
    let mut chart = ChartBuilder::on(&body)
        .margin(10)
        .build_cartesian_2d(0.0..x_max, 0.0..n as f64)
        .map_err(|e| plot_err(&e))?;

    // ROW 0 AT THE TOP
    let top = |i: usize| (n - i) as f64;
    chart
        .draw_series(rows.iter().enumerate().map(|(i, r)| {
            Rectangle::new(
                [(0.0, top(i) - 0.15), (r.seconds, top(i) - 0.85)],
                Palette99::pick(r.depth).filled(),
            )
        }))
        .map_err(|e| plot_err(&e))?;
    chart
        .draw_series(rows.iter().enumerate().map(|(i, r)| {
            Text::new(
                r.label(),
                (r.seconds, top(i) - 0.35),
                ("sans-serif", LABEL_FONT_PX).into_font(),
            )
        }))
        .map_err(|e| plot_err(&e))?;

    root.present().map_err(|e| plot_err(&e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::reconstruct;

    fn timer(name: &str, parent: &str, seconds: f64) -> TimingRecord {
        TimingRecord {
            name: name.into(),
            duration_seconds: seconds,
            parent_name: parent.into(),
        }
    }

    fn names(rows: &[BreakdownRow]) -> Vec<(&str, usize)> {
        rows.iter().map(|r| (r.name.as_str(), r.depth)).collect()
    }

    #[test]
    fn preorder_under_root() {
        let timings = vec![
            timer("DYN_PROLOGUE", "DYN", 0.1),
            timer("DYN_CORE", "DYN", 2.0),
            timer("FV_DYNAMICS", "DYN_CORE", 1.5),
            timer("DYN_EPILOGUE", "DYN", 0.2),
            timer("AGCM", "", 9.0),
            timer("DYN", "SUPERDYNAMICS", 3.0),
            timer("GF", "MOIST", 0.5),
        ];
        let r = rows(&timings, GRID_COMP_ROOT);
        assert_eq!(
            names(&r),
            vec![("DYN", 0), ("DYN_PROLOGUE", 1), ("DYN_CORE", 1), ("FV_DYNAMICS", 2), ("DYN_EPILOGUE", 1)]
        );
        assert_eq!(r[0].seconds, 3.0);
        assert_eq!(r[3].parent, "DYN_CORE");
    }

    #[test]
    fn missing_root_timer_starts_at_children() {
        let timings = vec![timer("DYN_CORE", "DYN", 2.0), timer("FV_DYNAMICS", "DYN_CORE", 1.5)];
        assert_eq!(names(&rows(&timings, "DYN")), vec![("DYN_CORE", 0), ("FV_DYNAMICS", 1)]);
    }

    #[test]
    fn unrelated_forest_is_empty() {
        let timings = reconstruct([("RUN", 2, 1.0), ("GCM", 4, 1.0)]);
        assert!(rows(&timings, GRID_COMP_ROOT).is_empty());
    }

    #[test]
    fn self_parent_terminates() {
        let timings = vec![timer("A", "DYN", 1.0), timer("A", "A", 1.0)];
        assert_eq!(names(&rows(&timings, "DYN")), vec![("A", 0)]);
    }

    #[test]
    fn label_indents_by_depth() {
        let r = BreakdownRow { name: "FV_DYNAMICS".into(), parent: "DYN_CORE".into(), depth: 2, seconds: 60.25 };
        assert_eq!(r.label(), "    FV_DYNAMICS: 60.25s");
    }

    #[test]
    fn empty_rows_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("none.svg");
        plot(&[], "empty", &out).unwrap();
        assert!(!out.exists());
    }
}
