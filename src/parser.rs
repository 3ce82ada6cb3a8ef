// HWBENCH LOG PARSER
// ONE WORKLOAD LOG -> ONE BenchmarkRun. THE LOG IS READ ONCE; EVERY FIELD IS
// A SCOPED GREP OVER THE IN-MEMORY TEXT FOLLOWED BY POSITIONAL SELECTION OF
// A NUMERIC TOKEN. PROFILER TIMERS ARE REBUILT INTO A FOREST FROM THEIR
// DASH-CODED DEPTH.
//
// REQUIRED: GRID, NX/NY LAYOUT, GLOBAL INIT/RUN/FINALIZE. ANY ABSENCE IS
// FATAL. EVERYTHING ELSE IS OPTIONAL AND SIMPLY OMITTED WHEN MISSING.

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::config::{HardwareClass, CPU_BACKEND_LABEL};
use crate::error::ParseError;
use crate::grep::{LogText, Query};
use crate::hierarchy::{split_depth, HierarchyBuilder, TimingRecord};
use crate::numeric::extract_numerics;
use crate::series::SampleSeries;

// --- HEADER FIELDS ---

const GRID_PATTERN: &str    = "Resolution of dynamics restart";
const NX_PATTERN: &str      = "Resource Parameter: NX:";
const NY_PATTERN: &str      = "Resource Parameter: NY:";
// CUBED SPHERE: NY COUNTS ALL SIX FACES
const CUBE_FACES: u32       = 6;

const THROUGHPUT_ENTRY: &str = "Model Throughput";
const INIT_PATTERN: &str     = "--Initialize";
const RUN_PATTERN: &str      = "--Run";
const FINALIZE_PATTERN: &str = "--Finalize";
const THROUGHPUT_INDEX: usize = 1;

// --- BACKEND ---

const GTFV3_FLAG: &str        = "RUN_GTFV3:1";
const BACKEND_PATTERN: &str   = "backend : ";
const GTFV3_UNKNOWN: &str     = "gtfv3 (details failed to parse)";
const GTFV3_TIMESTEP: &str    = " 0 , geos_gtfv3";
const DACE_INNER_LOOP: &str   = "] Run...";
const FORTRAN_TIMESTEP: &str  = " 0: fv_dynamics";

// --- PROFILER SECTIONS ---
// TABLE ORDER IS LOG ORDER (PREORDER). DASH COUNT IS DEPTH.

struct Section {
    // PARENT OF TOP-LEVEL TIMERS, "" FOR GLOBAL TREES
    root: &'static str,
    start: &'static [&'static str],
    end: &'static str,
    prefix_match: bool,
    // MATCHED ANYWHERE IN THE LINE EVEN WHEN prefix_match IS SET
    contains_match: &'static [&'static str],
    default_index: usize,
    // MATCHES THAT ALSO HIT A LONGER OR DEEPER NAME, OR NAMES THAT CARRY A
    // DIGIT, SHIFT THE WANTED TOKEN
    index_exceptions: &'static [(&'static str, usize)],
    // (LOG NAME, RECORDED NAME)
    aliases: &'static [(&'static str, &'static str)],
    timers: &'static [&'static str],
}

impl Section {
    fn record_name<'a>(&self, name: &'a str) -> &'a str {
        self.aliases
            .iter()
            .find(|(from, _)| *from == name)
            .map_or(name, |(_, to)| *to)
    }

    fn matches_anywhere(&self, name: &str) -> bool {
        !self.prefix_match || self.contains_match.contains(&name)
    }

    fn token_index(&self, name: &str) -> usize {
        self.index_exceptions
            .iter()
            .find(|(n, _)| *n == name)
            .map_or(self.default_index, |(_, i)| *i)
    }
}

const COMPONENT_INDEX: usize = 4;
const GLOBAL_INDEX: usize = 1;
const GLOBAL_START: &[&str] = &[THROUGHPUT_ENTRY, RUN_PATTERN];
const GLOBAL_END: &str = "GEOSgcm Run Status";
pub const RUN_ROOT: &str = "RUN";

const DYN_SECTION: Section = Section {
    root: "DYN",
    start: &["Times for component <DYN>"],
    end: "Times for component <SUPERDYNAMICS>",
    prefix_match: false,
    contains_match: &[],
    default_index: COMPONENT_INDEX,
    index_exceptions: &[],
    aliases: &[],
    timers: &[
        "--------DYN_ANA",
        "--------DYN_PROLOGUE",
        "--------DYN_CORE",
        "----------PROLOGUE",
        "----------PULL_TRACERS",
        "----------STATE_TO_FV",
        "----------MAKE_NH",
        "----------MASS_FIX",
        "----------FV_DYNAMICS",
        "----------PUSH_TRACERS",
        "----------FV_TO_STATE",
        "--------DYN_EPILOGUE",
    ],
};

const MOIST_SECTION: Section = Section {
    root: "MOIST",
    start: &["Times for component <MOIST>"],
    end: "Times for component <TURBULENCE>",
    prefix_match: false,
    contains_match: &[],
    default_index: COMPONENT_INDEX,
    index_exceptions: &[],
    aliases: &[],
    timers: &[
        "------CONV_TRACERS",
        "------AERO_ACTIVATE",
        "------GF",
        "------UW",
        "------BACM_1M",
    ],
};

const TURBULENCE_SECTION: Section = Section {
    root: "TURBULENCE",
    start: &["Times for component <TURBULENCE>"],
    end: "Times for component <CHEMENV>",
    prefix_match: false,
    contains_match: &[],
    default_index: COMPONENT_INDEX,
    index_exceptions: &[],
    aliases: &[],
    timers: &[
        "--------REFRESHKS",
        "----------PRELIMS",
        "----------MASSFLUX",
        "----------LOUIS",
        "----------LOCK",
        "----------POSTLOCK",
        "----------BELJAARS",
        "----------DECOMP",
        "--------DIFFUSE",
    ],
};

const AGCM_SECTION: Section = Section {
    root: "",
    start: GLOBAL_START,
    end: GLOBAL_END,
    prefix_match: true,
    contains_match: &[],
    default_index: GLOBAL_INDEX,
    index_exceptions: &[("GOCART2G", 2), ("LAND", 6)],
    aliases: &[],
    timers: &[
        "------AGCM",
        "--------SUPERDYNAMICS",
        "----------DYN",
        "--------PHYSICS",
        "----------GWD",
        "----------MOIST",
        "----------TURBULENCE",
        "----------CHEMISTRY",
        "------------CHEMENV",
        "------------HEMCO",
        "------------PCHEM",
        "------------ACHEM",
        "------------GOCART",
        "------------GOCART2G",
        "------------TR",
        "----------SURFACE",
        "------------SALTWATER",
        "--------------SEAICETHERMO",
        "--------------OPENWATER",
        "------------LAKE",
        "------------LANDICE",
        "------------LAND",
        "--------------VEGDYN",
        "--------------CATCH",
        "----------RADIATION",
        "------------SOLAR",
        "------------IRRAD",
        "------------SATSIM",
        "--------ORBIT",
    ],
};

const OGCM_SECTION: Section = Section {
    root: "",
    start: GLOBAL_START,
    end: GLOBAL_END,
    prefix_match: true,
    // ALSO HITS AGCM'S DEEPER SEAICETHERMO, WHICH IS LOGGED FIRST
    contains_match: &["SEAICE"],
    default_index: GLOBAL_INDEX,
    index_exceptions: &[("DATASEA", 6), ("SEAICE", 6)],
    aliases: &[],
    timers: &[
        "------OGCM",
        "--------ORAD",
        "--------SEAICE",
        "----------DATASEAICE",
        "--------OCEAN",
        "----------DATASEA",
    ],
};

const RUN_SECTION: Section = Section {
    root: "",
    start: GLOBAL_START,
    end: GLOBAL_END,
    prefix_match: true,
    contains_match: &[],
    default_index: GLOBAL_INDEX,
    index_exceptions: &[],
    aliases: &[("Run", RUN_ROOT)],
    timers: &[
        "--Run",
        "----EXTDATA",
        "----GCM",
        "------AIAU",
        "------ADFI",
        "----HIST",
    ],
};

const SECTIONS: [&Section; 6] = [
    &DYN_SECTION,
    &MOIST_SECTION,
    &TURBULENCE_SECTION,
    &AGCM_SECTION,
    &OGCM_SECTION,
    &RUN_SECTION,
];

// --- BENCHMARK RUN ---

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BenchmarkRun {
    pub backend_label: String,
    // nx, ny, nz
    pub grid_resolution: (u32, u32, u32),
    // NX, NY PER FACE, TOTAL RANKS
    pub node_setup: (u32, u32, u32),
    pub init_time: f64,
    pub run_time: f64,
    pub finalize_time: f64,
    // ONE PER DYCORE TIMESTEP
    pub dycore_timings: Vec<f64>,
    // GPU INNER LOOP, EMPTY OFF dace BACKENDS
    pub inner_dycore_timings: Vec<f64>,
    pub timings: Vec<TimingRecord>,
    #[serde(skip)]
    pub telemetry: Option<SampleSeries>,
}

impl BenchmarkRun {
    pub fn with_telemetry(mut self, telemetry: SampleSeries) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn hardware_class(&self) -> HardwareClass {
        HardwareClass::of_backend(&self.backend_label)
    }

    /// First timer called `name`, in parse order.
    pub fn timing(&self, name: &str) -> Option<&TimingRecord> {
        self.timings.iter().find(|t| t.name == name)
    }

    /// Backend label usable in a file name.
    pub fn backend_sanitized(&self) -> String {
        self.backend_label
            .replace('(', "")
            .replace(": ", "-")
            .replace(':', "-")
            .replace(' ', "-")
            .replace(')', "-")
    }

    pub fn summary(&self) {
        let (nx, ny, nz) = self.grid_resolution;
        let (lx, ly, ranks) = self.node_setup;
        println!("BACKEND:    {}", self.backend_label);
        println!("GRID:       C{}-L{} ({}x{}x{})", nx, nz, nx, ny, nz);
        println!("LAYOUT:     {}x{}, {} ranks", lx, ly, ranks);
        println!(
            "THROUGHPUT: init {:.2}s  run {:.2}s  finalize {:.2}s",
            self.init_time, self.run_time, self.finalize_time
        );
        println!(
            "DYCORE:     {} timestep(s), {} inner",
            self.dycore_timings.len(),
            self.inner_dycore_timings.len()
        );
        for t in &self.timings {
            let parent = if t.parent_name.is_empty() { "-" } else { &t.parent_name };
            println!("  {:<16} {:>10.3}s  <- {}", t.name, t.duration_seconds, parent);
        }
    }
}

pub fn parse_log(path: &Path) -> Result<BenchmarkRun, ParseError> {
    let log = LogText::read(path)?;
    debug!("parsing {}", path.display());
    parse_text(&log)
}

pub fn parse_text(log: &LogText) -> Result<BenchmarkRun, ParseError> {
    let backend_label = detect_backend(log)?;
    let (dycore_timings, inner_dycore_timings) = dycore_timings(log, &backend_label)?;

    let grid = exact_numerics(log, &Query::new(GRID_PATTERN), 3)?;
    let nx = exact_numerics(log, &Query::new(NX_PATTERN).strip(), 1)?[0] as u32;
    let ny = exact_numerics(log, &Query::new(NY_PATTERN).strip(), 1)?[0] as u32;

    let mut timings = Vec::new();
    for section in SECTIONS {
        timings.extend(parse_section(log, section)?);
    }

    let throughput = [THROUGHPUT_ENTRY];
    let init_time = token_at(log, &Query::new(INIT_PATTERN).after(&throughput), THROUGHPUT_INDEX)?;
    let run_time = token_at(log, &Query::new(RUN_PATTERN).after(&throughput), THROUGHPUT_INDEX)?;
    let finalize_time =
        token_at(log, &Query::new(FINALIZE_PATTERN).after(&throughput), THROUGHPUT_INDEX)?;

    Ok(BenchmarkRun {
        backend_label,
        grid_resolution: (grid[0] as u32, grid[1] as u32, grid[2] as u32),
        node_setup: (nx, ny / CUBE_FACES, nx * ny),
        init_time,
        run_time,
        finalize_time,
        dycore_timings,
        inner_dycore_timings,
        timings,
        telemetry: None,
    })
}

fn detect_backend(log: &LogText) -> Result<String, ParseError> {
    if log.grep(&Query::new(GTFV3_FLAG).optional())?.is_empty() {
        return Ok(CPU_BACKEND_LABEL.to_string());
    }
    let details = log.grep(&Query::new(BACKEND_PATTERN).strip().optional())?;
    Ok(match details.first() {
        Some(value) => format!("gtfv3_{}", value.trim().replace(':', "")),
        None => GTFV3_UNKNOWN.to_string(),
    })
}

fn dycore_timings(log: &LogText, backend: &str) -> Result<(Vec<f64>, Vec<f64>), ParseError> {
    if backend == CPU_BACKEND_LABEL {
        let steps = log.grep(&Query::new(FORTRAN_TIMESTEP).strip().optional())?;
        return Ok((extract_numerics(&steps), Vec::new()));
    }
    let steps = extract_numerics(&log.grep(&Query::new(GTFV3_TIMESTEP).strip())?);
    let inner = if backend.contains("dace") {
        extract_numerics(&log.grep(&Query::new(DACE_INNER_LOOP).strip().optional())?)
    } else {
        Vec::new()
    };
    Ok((steps, inner))
}

fn parse_section(log: &LogText, section: &Section) -> Result<Vec<TimingRecord>, ParseError> {
    let mut builder = HierarchyBuilder::rooted(section.root);
    for marker in section.timers {
        let mut query = Query::new(marker)
            .after(section.start)
            .until(section.end)
            .optional();
        let (name, depth) = split_depth(marker);
        if !section.matches_anywhere(name) {
            query = query.starts_with();
        }
        let tokens = extract_numerics(&log.grep(&query)?);
        let index = section.token_index(name);
        match tokens.get(index) {
            Some(&seconds) => builder.push(section.record_name(name), depth, seconds),
            None if tokens.is_empty() => {}
            None => debug!("{}: {} token(s), none at {}, skipped", name, tokens.len(), index),
        }
    }
    Ok(builder.finish())
}

fn exact_numerics(log: &LogText, query: &Query<'_>, expected: usize) -> Result<Vec<f64>, ParseError> {
    let found = extract_numerics(&log.grep(query)?);
    if found.len() != expected {
        return Err(ParseError::FieldCount {
            pattern: query.pattern().to_string(),
            expected,
            found: found.len(),
        });
    }
    Ok(found)
}

fn token_at(log: &LogText, query: &Query<'_>, index: usize) -> Result<f64, ParseError> {
    extract_numerics(&log.grep(query)?)
        .get(index)
        .copied()
        .ok_or_else(|| ParseError::MissingToken {
            pattern: query.pattern().to_string(),
            index,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "\
 Resolution of dynamics restart     =  24  144  72
 Resource Parameter: NX: 4
 Resource Parameter: NY: 24
";

    const THROUGHPUT: &str = "\
Model Throughput:  55.5 days per day
--Initialize   1 12.0 0 0 0
--Run          1 120.0 0 0 0
--Finalize     1 3.5 0 0 0
GEOSgcm Run Status: 0
";

    fn log_of(parts: &[&str]) -> LogText {
        LogText::from_string(parts.concat())
    }

    #[test]
    fn minimal_fortran_run() {
        let run = parse_text(&log_of(&[HEADER, THROUGHPUT])).unwrap();
        assert_eq!(run.backend_label, "fortran");
        assert_eq!(run.grid_resolution, (24, 144, 72));
        assert_eq!(run.node_setup, (4, 4, 96));
        assert_eq!((run.init_time, run.run_time, run.finalize_time), (12.0, 120.0, 3.5));
        assert!(run.dycore_timings.is_empty());
        assert_eq!(run.timings.len(), 1);
        assert_eq!(run.timings[0].name, RUN_ROOT);
    }

    #[test]
    fn missing_grid_is_fatal() {
        let err = parse_text(&log_of(&[" Resource Parameter: NX: 4\n", THROUGHPUT])).unwrap_err();
        assert!(matches!(err, ParseError::MissingPattern(p) if p == GRID_PATTERN));
    }

    #[test]
    fn grid_needs_three_fields() {
        let bad = " Resolution of dynamics restart = 24 144\n Resource Parameter: NX: 4\n Resource Parameter: NY: 24\n";
        let err = parse_text(&log_of(&[bad, THROUGHPUT])).unwrap_err();
        assert!(matches!(err, ParseError::FieldCount { expected: 3, found: 2, .. }));
    }

    #[test]
    fn gtfv3_backend_label() {
        let log = log_of(&["RUN_GTFV3:1\nbackend : dace:gpu\n"]);
        assert_eq!(detect_backend(&log).unwrap(), "gtfv3_dacegpu");
        let log = log_of(&["RUN_GTFV3:1\n"]);
        assert_eq!(detect_backend(&log).unwrap(), GTFV3_UNKNOWN);
    }

    #[test]
    fn gtfv3_requires_timesteps() {
        let log = log_of(&["RUN_GTFV3:1\n", HEADER, THROUGHPUT]);
        let err = parse_text(&log).unwrap_err();
        assert!(matches!(err, ParseError::MissingPattern(p) if p == GTFV3_TIMESTEP));
    }

    #[test]
    fn sanitized_backend() {
        let mut run = parse_text(&log_of(&[HEADER, THROUGHPUT])).unwrap();
        run.backend_label = GTFV3_UNKNOWN.to_string();
        assert_eq!(run.backend_sanitized(), "gtfv3-details-failed-to-parse-");
        run.backend_label = "gtfv3_dace:gpu".to_string();
        assert_eq!(run.backend_sanitized(), "gtfv3_dace-gpu");
    }

    #[test]
    fn named_index_exceptions() {
        assert_eq!(AGCM_SECTION.token_index("GOCART2G"), 2);
        assert_eq!(AGCM_SECTION.token_index("LAND"), 6);
        assert_eq!(AGCM_SECTION.token_index("LANDICE"), 1);
        assert_eq!(OGCM_SECTION.token_index("DATASEA"), 6);
        assert_eq!(OGCM_SECTION.token_index("SEAICE"), 6);
        assert_eq!(DYN_SECTION.token_index("DYN_CORE"), 4);
    }

    #[test]
    fn seaice_matches_deeper_thermo_line() {
        let global = "\
Model Throughput:  55.5 days per day
--Initialize   1 12.0 0 0 0
--Run          1 120.0 0 0 0
--------------SEAICETHERMO 1 0.4 0 0 0
------OGCM     1 5.0 0 0 0
--------SEAICE 1 1.0 0 0 0
--Finalize     1 3.5 0 0 0
GEOSgcm Run Status: 0
";
        let run = parse_text(&log_of(&[HEADER, global])).unwrap();
        let seaice = run.timing("SEAICE").unwrap();
        assert_eq!(seaice.duration_seconds, 1.0);
        assert_eq!(seaice.parent_name, "OGCM");
        assert!(OGCM_SECTION.matches_anywhere("SEAICE"));
        assert!(!OGCM_SECTION.matches_anywhere("DATASEA"));
        assert!(DYN_SECTION.matches_anywhere("DYN_CORE"));
    }

    #[test]
    fn run_timer_is_recorded_as_run_root() {
        assert_eq!(RUN_SECTION.record_name("Run"), "RUN");
        assert_eq!(RUN_SECTION.record_name("GCM"), "GCM");
        assert_eq!(AGCM_SECTION.record_name("Run"), "Run");
    }

    #[test]
    fn summary_no_panic() {
        parse_text(&log_of(&[HEADER, THROUGHPUT])).unwrap().summary();
    }
}
