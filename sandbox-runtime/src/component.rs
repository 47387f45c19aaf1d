//! Collaborator naming
//!
//! Every pluggable collaborator (resolvers, evaluators, boilerplate loaders,
//! error formatters) implements [`Component`] so the orchestrator can name
//! it in logs.

/// The base trait for all collaborator components
pub trait Component: Send + Sync {
    /// Short name identifying the implementation in log fields
    fn name(&self) -> &'static str;
}
