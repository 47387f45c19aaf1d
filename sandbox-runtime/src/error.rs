//! Error types for the sandbox runtime

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure raised by an evaluator while running project code
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{name}: {message}")]
pub struct EvaluationError {
    pub name: String,
    pub message: String,
    /// Module the failure originated in, if the evaluator knows it
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub column: Option<u32>,
}

impl EvaluationError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            module: None,
            line: None,
            column: None,
        }
    }

    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

/// Evaluation finished without any visible effect and no fallback rendered
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("evaluation produced no DOM change (looks like UI module: {looks_like_ui_module}, export: '{export_name}')")]
pub struct NoDomChangeError {
    pub looks_like_ui_module: bool,
    pub export_name: String,
    pub module: Option<String>,
}

impl NoDomChangeError {
    pub const NAME: &'static str = "NoDomChangeError";

    pub fn new(looks_like_ui_module: bool, export_name: impl Into<String>) -> Self {
        Self {
            looks_like_ui_module,
            export_name: export_name.into(),
            module: None,
        }
    }
}

/// Any failure that ends a compile attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    NoDomChange(#[from] NoDomChangeError),
}

impl CompileError {
    /// Module the failure is attributed to
    pub fn module(&self) -> Option<&str> {
        match self {
            CompileError::Evaluation(e) => e.module.as_deref(),
            CompileError::NoDomChange(e) => e.module.as_deref(),
        }
    }

    /// Attribute the failure to `module` unless it already names one
    pub fn attribute_to(&mut self, module: Option<&str>) {
        let slot = match self {
            CompileError::Evaluation(e) => &mut e.module,
            CompileError::NoDomChange(e) => &mut e.module,
        };
        if slot.is_none() {
            *slot = module.map(str::to_string);
        }
    }
}

/// Error type for boilerplate realization and rendering
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoilerplateError {
    #[error("failed to realize boilerplate '{condition}': {message}")]
    Realization { condition: String, message: String },

    #[error("boilerplate render failed: {0}")]
    Render(String),
}

/// Error type for the host message protocol
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed inbound message: {0}")]
    Decode(#[from] serde_json::Error),
}
