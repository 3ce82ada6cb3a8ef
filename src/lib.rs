// HWBENCH -- BENCHMARK TELEMETRY PIPELINE
// SAMPLING DAEMON, HIERARCHICAL LOG PARSER, CROSS-BACKEND COMPARATOR
//
// PURE MODULES (NO I/O): numeric, hierarchy, config, series, energy, report
// EVERYTHING ELSE TOUCHES FILES, SOCKETS OR HARDWARE

pub mod breakdown;
pub mod config;
pub mod daemon;
pub mod dump;
pub mod energy;
pub mod error;
pub mod grep;
pub mod hierarchy;
pub mod numeric;
pub mod parser;
pub mod probe;
pub mod protocol;
pub mod report;
pub mod series;
