// HWBENCH v0.4 -- BENCHMARK TELEMETRY PIPELINE
// HARDWARE SAMPLER DAEMON + CLIENT, DUMP VIEWER, LOG PARSER, COMPARATOR
//
// LOGS GO TO STDERR (RUST_LOG, DEFAULT info). REPORTS GO TO STDOUT.

mod cli;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use hwbench::config::{CpuModel, GpuModel, DEFAULT_SOCKET_PATH};
use hwbench::dump::DumpFormat;
use hwbench::protocol::Action;

#[derive(Parser)]
#[command(name = "hwbench")]
#[command(about = "HWBENCH -- BENCHMARK TELEMETRY SAMPLER AND REPORTER")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Order {
    Start,
    Stop,
    Dump,
    Tick,
}

impl From<Order> for Action {
    fn from(order: Order) -> Self {
        match order {
            Order::Start => Action::Start,
            Order::Stop => Action::Stop,
            Order::Dump => Action::Dump,
            Order::Tick => Action::Tick,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Run the sampling daemon until STOP
    Server {
        // CONTROL SOCKET (STALE FILE IS REPLACED)
        #[arg(long, env = "HWS_SOCKET", default_value = DEFAULT_SOCKET_PATH)]
        socket: PathBuf,

        // bundle (.hws.gz) OR json
        #[arg(long, env = "HWSAMPLER_DUMP_FORMAT", default_value = "bundle")]
        format: DumpFormat,

        // CPU POWER MODEL
        #[arg(long, env = "HWS_HW_CPU", default_value = "EPYC 7763")]
        cpu: CpuModel,

        // NVML DEVICE TO SAMPLE
        #[arg(long, default_value_t = 0)]
        gpu_index: u32,
    },

    /// Send one order to a running daemon
    Client {
        #[arg(value_enum)]
        order: Order,

        // DUMP FILE NAME (dump) OR MARKER LABEL (tick)
        #[arg(long)]
        name: Option<String>,

        // SAMPLING INTERVAL IN SECONDS (start, DEFAULT 0.1)
        #[arg(long)]
        dt: Option<f64>,

        #[arg(long, env = "HWS_SOCKET", default_value = DEFAULT_SOCKET_PATH)]
        socket: PathBuf,
    },

    /// Plot a dump and print its energy envelope
    Graph {
        filepath: PathBuf,

        #[arg(long, env = "HWS_HW_GPU", default_value = "A100_SX40")]
        gpu: GpuModel,

        // SVG PATH (DEFAULT: NEXT TO THE DUMP)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Same as graph, restricted to a wall-clock window in seconds
    Envelop {
        filepath: PathBuf,

        #[arg(long = "data_range", num_args = 2, value_names = ["START", "STOP"])]
        data_range: Option<Vec<f64>>,

        #[arg(long, env = "HWS_HW_GPU", default_value = "A100_SX40")]
        gpu: GpuModel,

        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Parse one workload log
    Parse {
        log: PathBuf,

        // EMIT JSON INSTEAD OF THE TEXT SUMMARY
        #[arg(long)]
        json: bool,
    },

    /// Compare workload logs pairwise
    Report {
        #[arg(required = true)]
        logs: Vec<PathBuf>,

        // SAMPLER DUMP FOR THE LOG AT THE SAME POSITION
        #[arg(long)]
        telemetry: Vec<PathBuf>,

        // WRITE <backend>_gridcomp.svg PER RUN INTO DIR
        #[arg(long, value_name = "DIR")]
        breakdown_dir: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing();

    match args.command {
        Command::Server { socket, format, cpu, gpu_index } => {
            cli::server::run_server(&socket, format, cpu, gpu_index)
        }
        Command::Client { order, name, dt, socket } => {
            cli::client::run_client(&socket, order.into(), name, dt)
        }
        Command::Graph { filepath, gpu, output } => cli::graph::run_graph(&filepath, gpu, output, None),
        Command::Envelop { filepath, data_range, gpu, output } => {
            let window = match data_range.as_deref() {
                None => None,
                Some([start, stop]) => Some((*start, *stop)),
                Some(other) => bail!("--data_range takes START STOP, got {} value(s)", other.len()),
            };
            cli::graph::run_graph(&filepath, gpu, output, window)
        }
        Command::Parse { log, json } => cli::report::run_parse(&log, json),
        Command::Report { logs, telemetry, breakdown_dir } => {
            cli::report::run_report(&logs, &telemetry, breakdown_dir.as_deref())
        }
    }
}
