//! Scripted evaluation
//!
//! A deterministic evaluator and boilerplate loader for running the sandbox
//! without a JavaScript engine. Each module's effect is read from an
//! [`EvaluationScript`]: the markup it leaves in the body, its exports, an
//! error it raises, and the urls it navigates to.

use crate::boilerplate::{Boilerplate, BoilerplateLoader, BoilerplateRegistry};
use crate::component::Component;
use crate::error::{BoilerplateError, EvaluationError};
use crate::evaluator::{EvaluationRequest, Evaluator};
use crate::history::History;
use crate::host::Document;
use crate::project::{BoilerplateSource, Directory, ExportMap, Externals, Module};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Effect of evaluating one module
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScriptedModule {
    /// Body markup after evaluation; `None` leaves the document alone
    pub body: Option<String>,
    pub exports: ExportMap,
    pub error: Option<EvaluationError>,
    /// Urls pushed onto the history, in order, before the body is written
    pub navigate: Vec<String>,
}

impl ScriptedModule {
    pub fn rendering(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::default()
        }
    }

    pub fn exporting(exports: ExportMap) -> Self {
        Self {
            exports,
            ..Self::default()
        }
    }

    pub fn failing(error: EvaluationError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn navigating(mut self, url: impl Into<String>) -> Self {
        self.navigate.push(url.into());
        self
    }
}

/// Scripted modules keyed by shortid or title
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationScript(BTreeMap<String, ScriptedModule>);

impl EvaluationScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_module(mut self, key: impl Into<String>, module: ScriptedModule) -> Self {
        self.0.insert(key.into(), module);
        self
    }

    /// Script for `module`, looked up by shortid first
    pub fn lookup(&self, module: &Module) -> Option<&ScriptedModule> {
        self.0
            .get(&module.shortid)
            .or_else(|| self.0.get(&module.title))
    }
}

/// Evaluator that replays an [`EvaluationScript`]
pub struct ScriptedEvaluator {
    script: EvaluationScript,
    document: Arc<dyn Document>,
    history: Option<Arc<dyn History>>,
    invalidations: Mutex<Vec<(String, Option<String>)>>,
}

impl std::fmt::Debug for ScriptedEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedEvaluator")
            .field("script", &self.script)
            .finish_non_exhaustive()
    }
}

impl ScriptedEvaluator {
    pub fn new(script: EvaluationScript, document: Arc<dyn Document>) -> Self {
        Self {
            script,
            document,
            history: None,
            invalidations: Mutex::new(Vec::new()),
        }
    }

    /// History handle scripted navigations go through
    pub fn with_history(mut self, history: Arc<dyn History>) -> Self {
        self.history = Some(history);
        self
    }

    /// `(sandbox_id, changed_module)` pairs seen by `invalidate`
    pub fn invalidations(&self) -> Vec<(String, Option<String>)> {
        self.invalidations
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl Component for ScriptedEvaluator {
    fn name(&self) -> &'static str {
        "scripted"
    }
}

impl Evaluator for ScriptedEvaluator {
    fn evaluate(&self, request: EvaluationRequest<'_>) -> Result<ExportMap, EvaluationError> {
        let Some(scripted) = self.script.lookup(request.module) else {
            return Ok(ExportMap::new());
        };

        if let Some(history) = &self.history {
            for url in &scripted.navigate {
                history.push_state(url);
            }
        }
        if let Some(error) = &scripted.error {
            return Err(error.clone());
        }
        if let Some(body) = &scripted.body {
            self.document.set_body_markup(body);
        }
        Ok(scripted.exports.clone())
    }

    fn invalidate(&self, sandbox_id: &str, changed_module: Option<&str>) {
        if let Ok(mut calls) = self.invalidations.lock() {
            calls.push((sandbox_id.to_string(), changed_module.map(str::to_string)));
        }
    }
}

/// Boilerplate that writes its source into the body as markup
struct MarkupBoilerplate {
    extension: String,
    markup: String,
    document: Arc<dyn Document>,
}

impl Boilerplate for MarkupBoilerplate {
    fn matches(&self, module: &Module) -> bool {
        module.title.ends_with(self.extension.as_str())
    }

    fn render(&self, exports: &ExportMap) -> Result<(), BoilerplateError> {
        if exports.default_export().is_none() {
            return Err(BoilerplateError::Render("module has no default export".into()));
        }
        self.document.set_body_markup(&self.markup);
        Ok(())
    }
}

/// Loader realizing each source as a [`MarkupBoilerplate`]
///
/// Sources are matched on `extension`; the `condition` pattern is only used
/// to name a source in errors. An empty source fails realization.
pub struct ScriptedBoilerplateLoader {
    document: Arc<dyn Document>,
}

impl std::fmt::Debug for ScriptedBoilerplateLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedBoilerplateLoader").finish_non_exhaustive()
    }
}

impl ScriptedBoilerplateLoader {
    pub fn new(document: Arc<dyn Document>) -> Self {
        Self { document }
    }
}

impl Component for ScriptedBoilerplateLoader {
    fn name(&self) -> &'static str {
        "scripted"
    }
}

impl BoilerplateLoader for ScriptedBoilerplateLoader {
    fn realize(
        &self,
        sources: &[BoilerplateSource],
        _modules: &[Module],
        _directories: &[Directory],
        _externals: &Externals,
    ) -> Result<BoilerplateRegistry, BoilerplateError> {
        let mut registry = BoilerplateRegistry::new();
        for source in sources {
            if source.code.trim().is_empty() {
                return Err(BoilerplateError::Realization {
                    condition: source.condition.clone(),
                    message: "empty boilerplate source".into(),
                });
            }
            registry.register(Box::new(MarkupBoilerplate {
                extension: source.extension.clone(),
                markup: source.code.clone(),
                document: self.document.clone(),
            }));
        }
        Ok(registry)
    }
}
