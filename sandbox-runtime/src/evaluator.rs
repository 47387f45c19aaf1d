//! Evaluator and error formatter traits

use crate::component::Component;
use crate::error::{CompileError, EvaluationError, NoDomChangeError};
use crate::project::{Directory, ExportMap, Externals, Module};
use crate::protocol::ErrorPayload;
use serde_json::json;

/// Everything an evaluator needs to run the entry module
#[derive(Debug, Clone, Copy)]
pub struct EvaluationRequest<'a> {
    pub module: &'a Module,
    pub sandbox_id: &'a str,
    pub modules: &'a [Module],
    pub directories: &'a [Directory],
    pub externals: Option<&'a Externals>,
}

/// Runs project modules
///
/// Implementors own the per-module artifact cache that `invalidate` scopes.
pub trait Evaluator: Component {
    /// Evaluate the entry module and return its exports
    fn evaluate(&self, request: EvaluationRequest<'_>) -> Result<ExportMap, EvaluationError>;

    /// Drop cached artifacts of `changed_module` within `sandbox_id`
    fn invalidate(&self, sandbox_id: &str, changed_module: Option<&str>);
}

/// Turns a compile failure into the payload delivered to the host
pub trait ErrorFormatter: Component {
    fn format(&self, error: &CompileError) -> ErrorPayload;
}

/// Default formatter: name, message, location and a no-DOM-change payload
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredErrorFormatter;

impl Component for StructuredErrorFormatter {
    fn name(&self) -> &'static str {
        "structured"
    }
}

impl ErrorFormatter for StructuredErrorFormatter {
    fn format(&self, error: &CompileError) -> ErrorPayload {
        match error {
            CompileError::Evaluation(e) => ErrorPayload {
                name: e.name.clone(),
                message: e.message.clone(),
                module: e.module.clone(),
                line: e.line,
                column: e.column,
                payload: None,
            },
            CompileError::NoDomChange(e) => ErrorPayload {
                name: NoDomChangeError::NAME.to_string(),
                message: e.to_string(),
                module: e.module.clone(),
                line: None,
                column: None,
                payload: Some(json!({
                    "looksLikeUiModule": e.looks_like_ui_module,
                    "exportName": e.export_name,
                })),
            },
        }
    }
}
