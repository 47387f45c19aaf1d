//! CLI logging setup
//!
//! Phase-level filtering on top of `tracing-subscriber`. Logs go to stderr;
//! stdout carries the replayed host messages.

use crate::config::LogConfig;
use sandbox_config::Phase;
use std::io;
use tracing_subscriber::{filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Target used by the CLI's own events
pub const CLI_TARGET: &str = "sandbox::cli";

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Colored, multi-line
    Pretty,
    Compact,
    /// For tool integration
    Json,
}

/// Filter with one target per phase
pub fn targets(log_config: &LogConfig) -> Targets {
    Phase::ALL
        .into_iter()
        .fold(Targets::new().with_default(log_config.global), |targets, phase| {
            targets.with_target(phase.target(), log_config.level_for(phase))
        })
        .with_target(CLI_TARGET, log_config.global)
}

/// Initialize the global subscriber
pub fn init(log_config: &LogConfig, format: LogFormat) {
    let stderr_layer = create_format_layer(format, io::stderr).with_filter(targets(log_config));
    tracing_subscriber::registry().with(stderr_layer).init();
}

fn create_format_layer<W, F>(format: LogFormat, make_writer: F) -> impl Layer<tracing_subscriber::Registry>
where
    W: io::Write + Send + Sync + 'static,
    F: Fn() -> W + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(true)
            .with_timer(fmt::time::time())
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .without_time()
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_timer(fmt::time::time())
            .with_writer(make_writer)
            .boxed(),
    }
}
