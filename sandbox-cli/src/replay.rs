//! Transcript replay
//!
//! Wires a sandbox to in-memory host surfaces, a scripted evaluator and the
//! stdout host, then feeds it a recorded inbound transcript.

use crate::logging::CLI_TARGET;
use crate::platform::StdoutHost;
use sandbox_config::{ConfigError, Environment, SandboxConfig};
use sandbox_runtime::memory::{
    MemoryBundleHost, MemoryDocument, MemoryHistory, MemoryResizeObserver, MemoryResources,
};
use sandbox_runtime::scripted::{EvaluationScript, ScriptedBoilerplateLoader, ScriptedEvaluator};
use sandbox_runtime::{
    CompileCollaborators, CompileOrchestrator, HistoryInterceptor, InboundMessage, MessageBridge,
    Outbound, ProtocolError, StructuredErrorFormatter,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("cannot read '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid evaluation script")]
    Script(#[source] serde_json::Error),

    #[error("transcript line {line}")]
    Transcript {
        line: usize,
        #[source]
        source: ProtocolError,
    },
}

/// Inputs of one replay
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub transcript: PathBuf,
    pub script: Option<PathBuf>,
    pub config: Option<PathBuf>,
    /// Failed checks before an injected bundle becomes available
    pub bundle_checks: usize,
}

fn read(path: &Path) -> Result<String, ReplayError> {
    std::fs::read_to_string(path).map_err(|source| ReplayError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Configuration from `path`, or defaults with the environment taken from
/// the process environment
pub fn load_config(path: Option<&Path>) -> Result<SandboxConfig, ReplayError> {
    match path {
        Some(path) => Ok(SandboxConfig::from_json_str(&read(path)?)?),
        None => Ok(SandboxConfig {
            environment: Environment::from_env(),
            ..SandboxConfig::default()
        }),
    }
}

/// Decode a transcript, skipping blank lines and foreign messages
pub fn parse_transcript(source: &str) -> Result<Vec<InboundMessage>, ReplayError> {
    let mut messages = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }
        let decoded = InboundMessage::decode(raw).map_err(|source| ReplayError::Transcript {
            line: idx + 1,
            source,
        })?;
        match decoded {
            Some(message) => messages.push(message),
            None => debug!(target: CLI_TARGET, line = idx + 1, "ignoring foreign message"),
        }
    }
    Ok(messages)
}

pub async fn run(options: &ReplayOptions) -> Result<(), ReplayError> {
    let config = load_config(options.config.as_deref())?;
    let script = match &options.script {
        Some(path) => EvaluationScript::from_json_str(&read(path)?).map_err(ReplayError::Script)?,
        None => EvaluationScript::new(),
    };
    let messages = parse_transcript(&read(&options.transcript)?)?;
    info!(
        target: CLI_TARGET,
        transcript = %options.transcript.display(),
        messages = messages.len(),
        origin = config.host_origin(),
        "replaying transcript"
    );

    let document = Arc::new(MemoryDocument::new());
    let (history, navigation) = HistoryInterceptor::install(Arc::new(MemoryHistory::default()));
    let evaluator = ScriptedEvaluator::new(script, document.clone()).with_history(history.clone());

    let outbound = Outbound::new(Arc::new(StdoutHost), config.host_origin());
    let orchestrator = CompileOrchestrator::new(
        &config,
        CompileCollaborators {
            document: document.clone(),
            bundle_host: Arc::new(MemoryBundleHost::available_after(options.bundle_checks)),
            evaluator: Arc::new(evaluator),
            boilerplates: Arc::new(ScriptedBoilerplateLoader::new(document)),
            error_formatter: Arc::new(StructuredErrorFormatter),
            resources: Arc::new(MemoryResources::new()),
            resize_observer: Arc::new(MemoryResizeObserver::new()),
        },
        outbound.clone(),
    );
    let bridge = MessageBridge::new(orchestrator, history, navigation, outbound);

    let (tx, rx) = mpsc::channel(messages.len().max(1));
    for message in messages {
        if tx.send(message).await.is_err() {
            break;
        }
    }
    drop(tx);
    bridge.run(rx).await;
    Ok(())
}
