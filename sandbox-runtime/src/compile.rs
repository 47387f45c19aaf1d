//! Compile orchestration
//!
//! A `compile` command either reloads the dependency bundle or evaluates the
//! entry module:
//!
//! ```text
//! Idle ── url changed ──> LoadingBundle ──> Idle            (Reloaded)
//! Idle ── url stable ───> Evaluating ──> Verifying ──> Idle  (Completed)
//! ```
//!
//! While a bundle load is in flight every other compile is dropped, not
//! queued. The host resends its compile after it observes `Ready!`.

use crate::boilerplate::BoilerplateLoader;
use crate::component::Component;
use crate::context::RuntimeState;
use crate::error::CompileError;
use crate::evaluator::{ErrorFormatter, EvaluationRequest, Evaluator};
use crate::host::{BundleHost, Document, ExternalResources, Outbound, ResizeObserver};
use crate::project::{project_markup, CompileRequest};
use crate::protocol::{ErrorPayload, OutboundMessage, ANY_ORIGIN};
use crate::verify::{RenderVerifier, VerificationInput, Verified};
use sandbox_config::{BundleConfig, Phase, SandboxConfig};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

const LOG_TARGET: &str = Phase::Compile.target();

/// Result of a completed compile attempt
#[derive(Debug, Clone, PartialEq)]
pub enum CompileOutcome {
    Success,
    Error(ErrorPayload),
}

/// What became of a compile command
#[derive(Debug, Clone, PartialEq)]
pub enum CompileDisposition {
    /// A bundle load was in flight; nothing is reported
    Dropped,
    /// The bundle was (re)loaded; the host must resend the compile
    Reloaded,
    /// The entry module was evaluated and verified
    Completed(CompileOutcome),
}

impl CompileDisposition {
    /// The message the host receives for this disposition, if any
    pub fn into_message(self) -> Option<OutboundMessage> {
        match self {
            CompileDisposition::Dropped => None,
            CompileDisposition::Reloaded => Some(OutboundMessage::Ready),
            CompileDisposition::Completed(CompileOutcome::Success) => Some(OutboundMessage::Success),
            CompileDisposition::Completed(CompileOutcome::Error(error)) => {
                Some(OutboundMessage::Error { error })
            }
        }
    }
}

/// Collaborators the orchestrator drives
#[derive(Clone)]
pub struct CompileCollaborators {
    pub document: Arc<dyn Document>,
    pub bundle_host: Arc<dyn BundleHost>,
    pub evaluator: Arc<dyn Evaluator>,
    pub boilerplates: Arc<dyn BoilerplateLoader>,
    pub error_formatter: Arc<dyn ErrorFormatter>,
    pub resources: Arc<dyn ExternalResources>,
    pub resize_observer: Arc<dyn ResizeObserver>,
}

pub struct CompileOrchestrator {
    bundle: BundleConfig,
    document: Arc<dyn Document>,
    bundle_host: Arc<dyn BundleHost>,
    evaluator: Arc<dyn Evaluator>,
    error_formatter: Arc<dyn ErrorFormatter>,
    resources: Arc<dyn ExternalResources>,
    resize_observer: Arc<dyn ResizeObserver>,
    verifier: RenderVerifier,
    outbound: Outbound,
    state: Mutex<RuntimeState>,
}

impl std::fmt::Debug for CompileOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompileOrchestrator")
            .field("bundle", &self.bundle)
            .field("state", &self.state())
            .field("verifier", &self.verifier)
            .finish_non_exhaustive()
    }
}

impl CompileOrchestrator {
    pub fn new(config: &SandboxConfig, collaborators: CompileCollaborators, outbound: Outbound) -> Self {
        Self {
            bundle: config.bundle.clone(),
            verifier: RenderVerifier::new(config.verifier.clone(), collaborators.boilerplates),
            document: collaborators.document,
            bundle_host: collaborators.bundle_host,
            evaluator: collaborators.evaluator,
            error_formatter: collaborators.error_formatter,
            resources: collaborators.resources,
            resize_observer: collaborators.resize_observer,
            outbound,
            state: Mutex::new(RuntimeState::new()),
        }
    }

    /// Snapshot of the runtime state
    pub fn state(&self) -> RuntimeState {
        self.lock_state().clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, RuntimeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle a `compile` command
    ///
    /// The only suspension point is the bundle availability poll, so
    /// everything up to the decision to reload happens before this future
    /// first yields.
    pub async fn handle_compile(&self, request: CompileRequest) -> CompileDisposition {
        if self.lock_state().bundle_load_in_flight {
            debug!(target: LOG_TARGET, sandbox = %request.sandbox_id, "bundle load in flight, dropping compile");
            return CompileDisposition::Dropped;
        }

        self.resources.apply(&request.external_resources);

        let reload = {
            let mut state = self.lock_state();
            let reload = state.needs_bundle(&request.url);
            if reload {
                state.bundle_load_in_flight = true;
                state.current_bundle_url = Some(request.url.clone());
            }
            reload
        };

        if reload {
            self.load_bundle(&request.url).await;
            return CompileDisposition::Reloaded;
        }

        CompileDisposition::Completed(self.compile(&request))
    }

    async fn load_bundle(&self, url: &str) {
        if !url.is_empty() {
            let script = self.bundle.script_url(url);
            info!(target: LOG_TARGET, %script, "loading dependency bundle");
            self.bundle_host.inject_bundle(&script);

            let interval = self.bundle.poll_interval();
            let mut polls = 0u64;
            while !self.bundle_host.bundle_available() {
                polls += 1;
                tokio::time::sleep(interval).await;
            }
            debug!(target: LOG_TARGET, %script, polls, "dependency bundle available");
        }
        self.lock_state().bundle_load_in_flight = false;
    }

    fn compile(&self, request: &CompileRequest) -> CompileOutcome {
        let changed_module = request.changed_module_id();
        match self.evaluate_and_verify(request) {
            Ok(verified) => {
                debug!(target: LOG_TARGET, module = %request.module.title, ?verified, "compile succeeded");
                self.ensure_resize_listener();
                CompileOutcome::Success
            }
            Err(mut error) => {
                error.attribute_to(changed_module);
                warn!(
                    target: LOG_TARGET,
                    module = %request.module.title,
                    formatter = self.error_formatter.name(),
                    %error,
                    "error in sandbox"
                );
                CompileOutcome::Error(self.error_formatter.format(&error))
            }
        }
    }

    fn evaluate_and_verify(&self, request: &CompileRequest) -> Result<Verified, CompileError> {
        self.document
            .set_body_markup(project_markup(&request.modules));
        let pre_markup = self.document.body_markup();

        self.evaluator
            .invalidate(&request.sandbox_id, request.changed_module_id());

        debug!(
            target: LOG_TARGET,
            module = %request.module.title,
            evaluator = self.evaluator.name(),
            "evaluating entry module"
        );
        let exports = self.evaluator.evaluate(EvaluationRequest {
            module: &request.module,
            sandbox_id: &request.sandbox_id,
            modules: &request.modules,
            directories: &request.directories,
            externals: request.externals.as_ref(),
        })?;
        let post_markup = self.document.body_markup();

        let verified = self.verifier.verify(VerificationInput {
            pre_markup: &pre_markup,
            post_markup: &post_markup,
            module: &request.module,
            exports: &exports,
            boilerplates: &request.boilerplates,
            modules: &request.modules,
            directories: &request.directories,
            externals: request.externals.as_ref(),
        })?;
        Ok(verified)
    }

    fn ensure_resize_listener(&self) {
        {
            let mut state = self.lock_state();
            if state.resize_listener_installed {
                return;
            }
            state.resize_listener_installed = true;
        }

        let document = self.document.clone();
        let outbound = self.outbound.clone();
        self.resize_observer.observe_body(Box::new(move || {
            if let Some(height) = document.body_height() {
                outbound.send_to(OutboundMessage::Resize { height }, ANY_ORIGIN);
            }
        }));
        debug!(target: LOG_TARGET, "resize listener installed");
    }
}
