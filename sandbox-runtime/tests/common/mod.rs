//! Test helpers
//!
//! Wires a sandbox to in-memory host surfaces and a scripted evaluator.

#![allow(dead_code)]

use sandbox_runtime::memory::{
    MemoryBundleHost, MemoryDocument, MemoryHistory, MemoryHost, MemoryResizeObserver,
    MemoryResources, PostedMessage,
};
use sandbox_runtime::scripted::{EvaluationScript, ScriptedBoilerplateLoader, ScriptedEvaluator};
use sandbox_runtime::{
    CompileCollaborators, CompileOrchestrator, CompileRequest, HistoryInterceptor,
    InboundMessage, MessageBridge, Module, OutboundMessage, Outbound, SandboxConfig,
    StructuredErrorFormatter,
};
use std::sync::Arc;
use tokio::sync::mpsc;

pub const SANDBOX_ID: &str = "sandbox-1";
pub const BUNDLE_URL: &str = "https://bundles.test/abc";

/// A sandbox and every surface it talks to
pub struct Harness {
    pub host: Arc<MemoryHost>,
    pub document: Arc<MemoryDocument>,
    pub bundle_host: Arc<MemoryBundleHost>,
    pub resources: Arc<MemoryResources>,
    pub resize: Arc<MemoryResizeObserver>,
    pub history: Arc<HistoryInterceptor>,
    pub evaluator: Arc<ScriptedEvaluator>,
    bridge: Option<MessageBridge>,
}

impl Harness {
    pub fn new(script: EvaluationScript) -> Self {
        Self::with_bundle(script, MemoryBundleHost::new())
    }

    /// Bundles take `checks` failed availability checks to show up
    pub fn with_slow_bundle(script: EvaluationScript, checks: usize) -> Self {
        Self::with_bundle(script, MemoryBundleHost::available_after(checks))
    }

    fn with_bundle(script: EvaluationScript, bundle_host: MemoryBundleHost) -> Self {
        let config = SandboxConfig::default();
        let host = Arc::new(MemoryHost::new());
        let document = Arc::new(MemoryDocument::new());
        let bundle_host = Arc::new(bundle_host);
        let resources = Arc::new(MemoryResources::new());
        let resize = Arc::new(MemoryResizeObserver::new());

        let (history, navigation) = HistoryInterceptor::install(Arc::new(MemoryHistory::new("/")));
        let evaluator = Arc::new(
            ScriptedEvaluator::new(script, document.clone()).with_history(history.clone()),
        );

        let outbound = Outbound::new(host.clone(), config.host_origin());
        let orchestrator = CompileOrchestrator::new(
            &config,
            CompileCollaborators {
                document: document.clone(),
                bundle_host: bundle_host.clone(),
                evaluator: evaluator.clone(),
                boilerplates: Arc::new(ScriptedBoilerplateLoader::new(document.clone())),
                error_formatter: Arc::new(StructuredErrorFormatter),
                resources: resources.clone(),
                resize_observer: resize.clone(),
            },
            outbound.clone(),
        );
        let bridge = MessageBridge::new(orchestrator, history.clone(), navigation, outbound);

        Self {
            host,
            document,
            bundle_host,
            resources,
            resize,
            history,
            evaluator,
            bridge: Some(bridge),
        }
    }

    /// Take the bridge to drive it by hand
    pub fn take_bridge(&mut self) -> MessageBridge {
        self.bridge.take().expect("bridge already taken")
    }

    /// Feed `messages` in order, then close the channel and wait for the bridge
    pub async fn replay(&mut self, messages: Vec<InboundMessage>) {
        let bridge = self.take_bridge();
        let (tx, rx) = mpsc::channel(messages.len().max(1));
        for message in messages {
            tx.send(message).await.expect("bridge receiver dropped");
        }
        drop(tx);
        bridge.run(rx).await;
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.host.kinds()
    }

    pub fn messages(&self) -> Vec<PostedMessage> {
        self.host.messages()
    }

    /// Outbound messages after the startup handshake
    pub fn after_handshake(&self) -> Vec<OutboundMessage> {
        self.messages()
            .into_iter()
            .skip(1)
            .map(|posted| posted.message)
            .collect()
    }
}

pub fn compile(request: CompileRequest) -> InboundMessage {
    InboundMessage::compile(request)
}

pub fn entry(title: &str, code: &str) -> Module {
    Module::new(title.trim_end_matches(".js"), title, code)
}

/// A request for `module` against the test bundle url
pub fn request(module: Module) -> CompileRequest {
    CompileRequest::new(module, SANDBOX_ID).with_url(BUNDLE_URL)
}
