// HWBENCH ENERGY ENVELOPE
// TRAPEZOIDAL INTEGRAL OF POWER OVER SAMPLE INDEX (NOT WALL CLOCK: SAMPLES
// ARE ASSUMED UNIFORMLY SPACED AT THE NOMINAL dt), IN kW * SAMPLE_COUNT.
//
// THE "kWh" FIGURE DIVIDES BY SAMPLE COUNT AND AGAIN BY ELAPSED HOURS.
// DIMENSIONALLY SUSPECT (ONE DIVISION BY COUNT ALREADY GIVES AVERAGE kW).
// KEPT EXACTLY: COMPARISONS ONLY NEED THE SAME FORMULA ON BOTH SIDES.

use crate::config::HardwareClass;
use crate::series::SampleSeries;

const WATTS_PER_KW: f64 = 1000.0;
const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Envelope {
    // kW * SAMPLE_COUNT
    pub integrated: f64,
    // SEE MODULE HEADER
    pub kwh: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EnergyReport {
    pub sample_count: usize,
    pub cpu: Envelope,
    pub gpu: Envelope,
    pub overall: Envelope,
}

/// Trapezoidal rule with unit spacing.
pub fn trapezoid(values: &[f64]) -> f64 {
    values.windows(2).map(|w| (w[0] + w[1]) / 2.0).sum()
}

fn normalize(integrated: f64, sample_count: usize, dt: f64) -> f64 {
    let hours = (sample_count - 1) as f64 * dt / SECONDS_PER_HOUR;
    (integrated / sample_count as f64) / hours
}

/// Energy of a CPU and a GPU power trace (watts) sampled every `dt` seconds.
/// Fewer than two samples give an all-zero report.
pub fn energy_envelope(cpu_watts: &[f64], gpu_watts: &[f64], dt: f64) -> EnergyReport {
    let sample_count = cpu_watts.len();
    if sample_count < 2 {
        return EnergyReport {
            sample_count,
            ..EnergyReport::default()
        };
    }

    let kw = |w: &[f64]| w.iter().map(|v| v / WATTS_PER_KW).collect::<Vec<_>>();
    let cpu = trapezoid(&kw(cpu_watts));
    let gpu = trapezoid(&kw(gpu_watts));
    let overall = cpu + gpu;

    let envelope = |integrated| Envelope {
        integrated,
        kwh: normalize(integrated, sample_count, dt),
    };
    EnergyReport {
        sample_count,
        cpu: envelope(cpu),
        gpu: envelope(gpu),
        overall: envelope(overall),
    }
}

impl EnergyReport {
    pub fn of_series(series: &SampleSeries, dt: f64) -> Self {
        energy_envelope(series.cpu_power_w_estimated(), series.gpu_power_w(), dt)
    }

    // CPU-ONLY NODES HAVE NO GPU DRAW WORTH COUNTING
    pub fn envelope_for(&self, class: HardwareClass) -> Envelope {
        match class {
            HardwareClass::Cpu => self.cpu,
            HardwareClass::Accelerated => self.overall,
        }
    }

    pub fn print(&self) {
        println!("Number of samples: {}", self.sample_count);
        println!("CPU envelop: {:.0} kW.sample_count", self.cpu.integrated);
        println!("CPU envelop (@ default sample rate): {:.2} kW/h", self.cpu.kwh);
        println!("GPU envelop: {:.0} kW.sample_count", self.gpu.integrated);
        println!("GPU envelop (@ default sample rate): {:.2} kW/h", self.gpu.kwh);
        println!("Overall envelop: {:.0} kW.sample_count", self.overall.integrated);
        println!(
            "Overall envelop (@ default sample rate): {:.2} kW/h",
            self.overall.kwh
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn trapezoid_unit_spacing() {
        assert_eq!(trapezoid(&[]), 0.0);
        assert_eq!(trapezoid(&[5.0]), 0.0);
        assert_eq!(trapezoid(&[1.0, 3.0]), 2.0);
        assert_eq!(trapezoid(&[0.0, 2.0, 4.0]), 4.0);
    }

    #[test]
    fn constant_draw_formula() {
        // 11 SAMPLES OF 1000 W: INTEGRAL 10 kW*SAMPLES, HOURS = 10*0.1/3600
        let cpu = vec![1000.0; 11];
        let gpu = vec![2000.0; 11];
        let r = energy_envelope(&cpu, &gpu, 0.1);
        assert_eq!(r.sample_count, 11);
        assert!(close(r.cpu.integrated, 10.0));
        assert!(close(r.gpu.integrated, 20.0));
        assert!(close(r.overall.integrated, 30.0));
        let hours = 10.0 * 0.1 / 3600.0;
        assert!(close(r.cpu.kwh, (10.0 / 11.0) / hours));
        assert!(close(r.overall.kwh, (30.0 / 11.0) / hours));
    }

    #[test]
    fn too_few_samples_is_zero() {
        let r = energy_envelope(&[500.0], &[500.0], 0.1);
        assert_eq!(r.sample_count, 1);
        assert_eq!(r.overall, Envelope::default());
        assert_eq!(energy_envelope(&[], &[], 0.1).sample_count, 0);
    }

    #[test]
    fn class_selects_envelope() {
        let r = energy_envelope(&[1000.0, 1000.0], &[3000.0, 3000.0], 0.1);
        assert!(close(r.envelope_for(HardwareClass::Cpu).integrated, 1.0));
        assert!(close(r.envelope_for(HardwareClass::Accelerated).integrated, 4.0));
    }

    #[test]
    fn print_no_panic_empty() {
        EnergyReport::default().print();
    }
}
