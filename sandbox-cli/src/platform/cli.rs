//! CLI output
//!
//! Outbound messages are printed one JSON object per line so a transcript
//! replay can be diffed against a recording.

use crate::logging::CLI_TARGET;
use sandbox_runtime::{HostTarget, OutboundMessage};
use serde::Serialize;
use std::error::Error;
use std::io::{self, Write};
use tracing::warn;

#[derive(Serialize)]
struct PostedLine<'a> {
    origin: &'a str,
    message: &'a OutboundMessage,
}

/// Host frame that prints every posted message to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutHost;

impl HostTarget for StdoutHost {
    fn post(&self, message: &OutboundMessage, target_origin: &str) {
        let line = PostedLine {
            origin: target_origin,
            message,
        };
        let mut stdout = io::stdout().lock();
        let written = serde_json::to_writer(&mut stdout, &line)
            .map_err(io::Error::from)
            .and_then(|()| writeln!(stdout));
        if let Err(e) = written {
            warn!(target: CLI_TARGET, error = %e, kind = message.kind(), "failed to print message");
        }
    }
}

/// Print an error and its sources to stderr
pub fn print_error(e: &dyn Error) {
    eprintln!("error: {}", e);
    let mut source = e.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {}", cause);
        source = cause.source();
    }
}
