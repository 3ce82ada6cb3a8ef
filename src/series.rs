// HWBENCH SAMPLE SERIES
// SIX PARALLEL APPEND-ONLY COLUMNS, ONE VALUE PER COLUMN PER SAMPLE.
// COLUMNS ARE PRIVATE AND ONLY push() APPENDS, SO LENGTHS CANNOT DIVERGE.
// TICKS MARK THE SERIES LENGTH AT EXTERNALLY KNOWN PHASE BOUNDARIES. EACH
// TICK CARRIES A LABEL, "" WHEN THE CLIENT SENT NONE.

use std::ops::Range;

use crate::config::CpuSpec;
use crate::error::DumpError;

// DUMP KEYS. FIXED: OFFLINE ANALYSIS ADDRESSES COLUMNS BY THESE NAMES.
pub const KEY_GPU_POWER: &str    = "gpu_psu";
pub const KEY_GPU_UTIL: &str     = "gpu_exe_utl";
pub const KEY_GPU_MEM_UTIL: &str = "gpu_mem_utl";
pub const KEY_GPU_MEM: &str      = "gpu_mem";
pub const KEY_CPU_UTIL: &str     = "cpu_exe_utl";
pub const KEY_CPU_POWER: &str    = "cpu_psu";
pub const KEY_TICKS: &str        = "ticks";
pub const KEY_TICK_LABELS: &str  = "tick_labels";

pub const SERIES_KEYS: [&str; 6] = [
    KEY_GPU_POWER,
    KEY_GPU_UTIL,
    KEY_GPU_MEM_UTIL,
    KEY_GPU_MEM,
    KEY_CPU_UTIL,
    KEY_CPU_POWER,
];

/// One raw hardware counter read. CPU power is derived, not read.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HardwareReading {
    pub gpu_power_w: f64,
    pub gpu_util_pct: f64,
    pub gpu_mem_util_pct: f64,
    pub gpu_mem_used_mb: f64,
    pub cpu_util_pct: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleSeries {
    gpu_power_w: Vec<f64>,
    gpu_util_pct: Vec<f64>,
    gpu_mem_util_pct: Vec<f64>,
    gpu_mem_used_mb: Vec<f64>,
    cpu_util_pct: Vec<f64>,
    cpu_power_w_estimated: Vec<f64>,
    ticks: Vec<usize>,
    tick_labels: Vec<String>,
}

impl SampleSeries {
    pub fn new() -> Self {
        Self::default()
    }

    // APPEND ONE SAMPLE TO ALL SIX COLUMNS
    pub fn push(&mut self, reading: &HardwareReading, cpu_power_w_estimated: f64) {
        self.gpu_power_w.push(reading.gpu_power_w);
        self.gpu_util_pct.push(reading.gpu_util_pct);
        self.gpu_mem_util_pct.push(reading.gpu_mem_util_pct);
        self.gpu_mem_used_mb.push(reading.gpu_mem_used_mb);
        self.cpu_util_pct.push(reading.cpu_util_pct);
        self.cpu_power_w_estimated.push(cpu_power_w_estimated);
    }

    pub fn record(&mut self, reading: &HardwareReading, cpu: &CpuSpec) {
        self.push(reading, cpu.estimate_power(reading.cpu_util_pct));
    }

    // MARK THE CURRENT LENGTH. RETURNS THE MARKED INDEX.
    pub fn tick(&mut self, label: Option<&str>) -> usize {
        let at = self.len();
        self.ticks.push(at);
        self.tick_labels.push(label.unwrap_or_default().to_string());
        at
    }

    pub fn len(&self) -> usize {
        self.cpu_power_w_estimated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ticks(&self) -> &[usize] {
        &self.ticks
    }

    /// Parallel to [`ticks`](Self::ticks).
    pub fn tick_labels(&self) -> &[String] {
        &self.tick_labels
    }

    /// Index of the first tick named `label`.
    pub fn tick_named(&self, label: &str) -> Option<usize> {
        self.tick_labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.ticks[i])
    }

    pub fn gpu_power_w(&self) -> &[f64] {
        &self.gpu_power_w
    }

    pub fn gpu_util_pct(&self) -> &[f64] {
        &self.gpu_util_pct
    }

    pub fn gpu_mem_util_pct(&self) -> &[f64] {
        &self.gpu_mem_util_pct
    }

    pub fn gpu_mem_used_mb(&self) -> &[f64] {
        &self.gpu_mem_used_mb
    }

    pub fn cpu_util_pct(&self) -> &[f64] {
        &self.cpu_util_pct
    }

    pub fn cpu_power_w_estimated(&self) -> &[f64] {
        &self.cpu_power_w_estimated
    }

    /// Columns paired with their dump key, in [`SERIES_KEYS`] order.
    pub fn columns(&self) -> [(&'static str, &[f64]); 6] {
        [
            (KEY_GPU_POWER, self.gpu_power_w.as_slice()),
            (KEY_GPU_UTIL, self.gpu_util_pct.as_slice()),
            (KEY_GPU_MEM_UTIL, self.gpu_mem_util_pct.as_slice()),
            (KEY_GPU_MEM, self.gpu_mem_used_mb.as_slice()),
            (KEY_CPU_UTIL, self.cpu_util_pct.as_slice()),
            (KEY_CPU_POWER, self.cpu_power_w_estimated.as_slice()),
        ]
    }

    // REBUILD FROM LOADED COLUMNS (SERIES_KEYS ORDER). REJECTS RAGGED INPUT
    // INSTEAD OF TRUNCATING IT. NO LABELS AT ALL (OLDER DUMPS) MEANS ALL
    // TICKS UNNAMED.
    pub fn from_columns(
        columns: [Vec<f64>; 6],
        ticks: Vec<usize>,
        tick_labels: Vec<String>,
    ) -> Result<Self, DumpError> {
        let len = columns[0].len();
        if let Some((i, c)) = columns.iter().enumerate().find(|(_, c)| c.len() != len) {
            return Err(DumpError::Format(format!(
                "column `{}` has {} samples, `{}` has {}",
                SERIES_KEYS[i],
                c.len(),
                SERIES_KEYS[0],
                len
            )));
        }
        let tick_labels = if tick_labels.is_empty() {
            vec![String::new(); ticks.len()]
        } else if tick_labels.len() == ticks.len() {
            tick_labels
        } else {
            return Err(DumpError::Format(format!(
                "{} tick label(s) for {} tick(s)",
                tick_labels.len(),
                ticks.len()
            )));
        };
        let [gpu_power_w, gpu_util_pct, gpu_mem_util_pct, gpu_mem_used_mb, cpu_util_pct, cpu_power_w_estimated] =
            columns;
        Ok(Self {
            gpu_power_w,
            gpu_util_pct,
            gpu_mem_util_pct,
            gpu_mem_used_mb,
            cpu_util_pct,
            cpu_power_w_estimated,
            ticks,
            tick_labels,
        })
    }

    // SUB-WINDOW OF SAMPLES, CLAMPED TO THE SERIES. TICKS ARE RE-BASED AND
    // THOSE OUTSIDE THE WINDOW DROPPED.
    pub fn window(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        let cut = |c: &[f64]| c[start..end].to_vec();
        let (ticks, tick_labels): (Vec<usize>, Vec<String>) = self
            .ticks
            .iter()
            .zip(&self.tick_labels)
            .filter(|&(&t, _)| t >= start && t <= end)
            .map(|(t, l)| (t - start, l.clone()))
            .unzip();
        Self {
            gpu_power_w: cut(self.gpu_power_w.as_slice()),
            gpu_util_pct: cut(self.gpu_util_pct.as_slice()),
            gpu_mem_util_pct: cut(self.gpu_mem_util_pct.as_slice()),
            gpu_mem_used_mb: cut(self.gpu_mem_used_mb.as_slice()),
            cpu_util_pct: cut(self.cpu_util_pct.as_slice()),
            cpu_power_w_estimated: cut(self.cpu_power_w_estimated.as_slice()),
            ticks,
            tick_labels,
        }
    }

    // PEAK VALUES, AS PRINTED NEXT TO THE GRAPH
    pub fn summary(&self) {
        if self.is_empty() {
            println!("NO SAMPLES");
            return;
        }
        let peak = |c: &[f64]| c.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        println!("Max VRAM: {}", peak(self.gpu_mem_used_mb.as_slice()));
        println!("Max GPU PSU: {}", peak(self.gpu_power_w.as_slice()));
        println!("Max GPU exe: {}", peak(self.gpu_util_pct.as_slice()));
        println!("Max CPU exe: {}", peak(self.cpu_util_pct.as_slice()));
        for (at, label) in self.ticks.iter().zip(&self.tick_labels) {
            println!("Tick: {} {}", at, label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CpuModel;

    fn reading(gpu_w: f64, cpu_pct: f64) -> HardwareReading {
        HardwareReading {
            gpu_power_w: gpu_w,
            gpu_util_pct: 50.0,
            gpu_mem_util_pct: 20.0,
            gpu_mem_used_mb: 1024.0,
            cpu_util_pct: cpu_pct,
        }
    }

    fn all_lengths(s: &SampleSeries) -> Vec<usize> {
        s.columns().iter().map(|(_, c)| c.len()).collect()
    }

    #[test]
    fn push_keeps_columns_aligned() {
        let mut s = SampleSeries::new();
        assert!(s.is_empty());
        for i in 0..5 {
            s.push(&reading(100.0 + i as f64, 10.0), 60.0);
            assert_eq!(all_lengths(&s), vec![i + 1; 6]);
        }
        assert_eq!(s.gpu_power_w(), &[100.0, 101.0, 102.0, 103.0, 104.0]);
    }

    #[test]
    fn record_derives_cpu_power() {
        let mut s = SampleSeries::new();
        let spec = CpuModel::Epyc7763.spec();
        s.record(&reading(250.0, 50.0), &spec);
        s.record(&reading(250.0, 1.0), &spec);
        assert_eq!(s.cpu_power_w_estimated(), &[140.0, 60.0]);
    }

    #[test]
    fn tick_marks_current_length() {
        let mut s = SampleSeries::new();
        assert_eq!(s.tick(None), 0);
        s.push(&reading(1.0, 1.0), 60.0);
        s.push(&reading(1.0, 1.0), 60.0);
        assert_eq!(s.tick(Some("dycore")), 2);
        assert_eq!(s.ticks(), &[0, 2]);
        assert_eq!(s.tick_labels(), &["".to_string(), "dycore".to_string()]);
        assert_eq!(s.tick_named("dycore"), Some(2));
        assert_eq!(s.tick_named("physics"), None);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn from_columns_tick_labels() {
        let cols = || [vec![1.0], vec![1.0], vec![1.0], vec![1.0], vec![1.0], vec![1.0]];
        let s = SampleSeries::from_columns(cols(), vec![0, 1], vec![]).unwrap();
        assert_eq!(s.tick_labels(), &[String::new(), String::new()]);
        let s = SampleSeries::from_columns(cols(), vec![1], vec!["end".into()]).unwrap();
        assert_eq!(s.tick_named("end"), Some(1));
        assert!(SampleSeries::from_columns(cols(), vec![1], vec!["a".into(), "b".into()]).is_err());
    }

    #[test]
    fn from_columns_rejects_ragged() {
        let cols = [vec![1.0], vec![1.0], vec![1.0], vec![1.0, 2.0], vec![1.0], vec![1.0]];
        let err = SampleSeries::from_columns(cols, vec![], vec![]).unwrap_err();
        assert!(err.to_string().contains("gpu_mem"));
    }

    #[test]
    fn window_clamps_and_rebases_ticks() {
        let mut s = SampleSeries::new();
        for i in 0..10 {
            if i == 1 {
                s.tick(Some("warmup"));
            }
            if i == 4 {
                s.tick(Some("phase"));
            }
            s.push(&reading(i as f64, 0.0), 60.0);
        }
        let w = s.window(3..100);
        assert_eq!(w.len(), 7);
        assert_eq!(w.gpu_power_w()[0], 3.0);
        assert_eq!(w.ticks(), &[1]);
        assert_eq!(w.tick_labels(), &["phase".to_string()]);
        assert!(s.window(20..30).is_empty());
    }

    #[test]
    fn summary_no_panic_empty() {
        SampleSeries::new().summary();
    }
}
