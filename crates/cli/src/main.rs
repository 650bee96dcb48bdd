//! DRAM controller simulator CLI.
//!
//! A single `run` subcommand: feed it a trace and an optional JSON config,
//! get back a sectioned statistics report.

use std::fs;
use std::io::BufReader;
use std::process;

use clap::{Parser, Subcommand};

use dramsim_core::config::Config;
use dramsim_core::driver::Driver;

#[derive(Parser, Debug)]
#[command(
    name = "dramsim",
    author,
    version,
    about = "Cycle-accurate DDRx DRAM memory controller simulator",
    long_about = "Replays a timestamped memory reference trace against a configurable DRAM\ntiming model and reports latency, command, and energy statistics.\n\nExample:\n  dramsim run trace.txt --config ddr3.json --max-clock 1000000"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a trace file against a DRAM configuration.
    Run {
        /// Path to a line-oriented memory reference trace.
        trace: String,

        /// JSON configuration file. Falls back to `Config::default()`.
        #[arg(long)]
        config: Option<String>,

        /// Stop after this many cycles even if the trace has not finished.
        #[arg(long)]
        max_clock: Option<u64>,

        /// Emit a tracing event for every command the scheduler issues.
        #[arg(long)]
        trace_commands: bool,

        /// Restrict the report to these sections (summary, commands, energy).
        /// Defaults to all of them.
        #[arg(long, value_delimiter = ',')]
        sections: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run { trace, config, max_clock, trace_commands, sections } => {
            cmd_run(&trace, config.as_deref(), max_clock, trace_commands, &sections);
        }
    }
}

fn cmd_run(trace_path: &str, config_path: Option<&str>, max_clock: Option<u64>, trace_commands: bool, sections: &[String]) {
    init_tracing(trace_commands);

    let config = match config_path {
        Some(path) => load_config(path),
        None => Config::default(),
    };

    let mut driver = Driver::new(&config, max_clock).unwrap_or_else(|err| {
        eprintln!("Error: invalid configuration: {err}");
        process::exit(1);
    });

    let file = fs::File::open(trace_path).unwrap_or_else(|err| {
        eprintln!("Error: cannot open trace {trace_path}: {err}");
        process::exit(1);
    });

    let stats = driver.run(BufReader::new(file)).unwrap_or_else(|err| {
        eprintln!("Error: malformed trace {trace_path}: {err}");
        process::exit(1);
    });

    stats.print_sections(sections);
}

fn load_config(path: &str) -> Config {
    let text = fs::read_to_string(path).unwrap_or_else(|err| {
        eprintln!("Error: cannot read config {path}: {err}");
        process::exit(1);
    });
    serde_json::from_str(&text).unwrap_or_else(|err| {
        eprintln!("Error: invalid config {path}: {err}");
        process::exit(1);
    })
}

fn init_tracing(trace_commands: bool) {
    let filter = if trace_commands { "trace" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .without_time()
        .init();
}
