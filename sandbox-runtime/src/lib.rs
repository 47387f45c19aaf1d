//! Preview sandbox runtime
//!
//! Runs inside the preview frame: receives project snapshots from the host,
//! evaluates the entry module, checks that something became visible and
//! reports the outcome back.

pub mod boilerplate;
pub mod bridge;
pub mod compile;
pub mod component;
pub mod context;
pub mod deps;
pub mod error;
pub mod evaluator;
pub mod history;
pub mod host;
pub mod project;
pub mod protocol;
pub mod verify;

// Host implementations without a browser
pub mod memory;
pub mod scripted;

pub use boilerplate::{Boilerplate, BoilerplateLoader, BoilerplateRegistry};
pub use bridge::MessageBridge;
pub use compile::{CompileCollaborators, CompileDisposition, CompileOrchestrator, CompileOutcome};
pub use component::Component;
pub use context::RuntimeState;
pub use deps::{
    DependencyCache, DependencyFingerprint, DependencyManifest, DependencyRequest,
    DependencyResolver, LoadedDependencies, StatusScreen, StatusUpdate,
};
pub use error::{BoilerplateError, CompileError, EvaluationError, NoDomChangeError, ProtocolError};
pub use evaluator::{ErrorFormatter, EvaluationRequest, Evaluator, StructuredErrorFormatter};
pub use history::{
    History, HistoryInterceptor, Location, NavigationEvent, NavigationEvents, NavigationHook,
    NavigationKind,
};
pub use host::{BundleHost, Document, ExternalResources, HostTarget, Outbound, ResizeObserver};
pub use project::{
    BoilerplateSource, CompileRequest, Directory, ExportMap, ExportValue, Externals, Module,
};
pub use protocol::{ErrorPayload, InboundMessage, OutboundMessage};
pub use verify::{RenderVerifier, Verified};

pub use sandbox_config::SandboxConfig;
