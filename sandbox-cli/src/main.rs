//! Sandbox replay CLI
//!
//! Replays a recorded host transcript against the sandbox runtime and prints
//! every message the sandbox posts back.

use clap::Parser;
use std::path::PathBuf;
use std::process;
use tracing::Level;

mod config;
mod logging;
mod platform;
mod replay;

use crate::config::LogConfig;
use crate::logging::LogFormat;
use crate::replay::ReplayOptions;

#[derive(Parser)]
#[command(
    name = "sandbox-replay",
    about = "Replay a host transcript against the preview sandbox",
    version
)]
struct Cli {
    /// Inbound transcript, one JSON message per line
    #[arg(value_name = "TRANSCRIPT")]
    transcript: PathBuf,

    /// Scripted module effects, keyed by module shortid or title
    #[arg(long, value_name = "SCRIPT")]
    script: Option<PathBuf>,

    /// Sandbox configuration file (JSON)
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Failed availability checks before a bundle loads
    #[arg(long, default_value_t = 0)]
    bundle_checks: usize,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    /// Global log level
    #[arg(long, default_value_t = Level::WARN)]
    log_level: Level,

    /// Per-phase level, e.g. `--log compile=debug`
    #[arg(long = "log", value_name = "PHASE=LEVEL")]
    phase_levels: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let mut log_config = LogConfig::new(cli.log_level);
    for level in &cli.phase_levels {
        if let Err(e) = log_config.apply_override(level) {
            platform::print_error(&e);
            process::exit(2);
        }
    }
    logging::init(&log_config, cli.log_format);

    let options = ReplayOptions {
        transcript: cli.transcript,
        script: cli.script,
        config: cli.config,
        bundle_checks: cli.bundle_checks,
    };
    if let Err(e) = replay::run(&options).await {
        platform::print_error(&e);
        process::exit(1);
    }
}
