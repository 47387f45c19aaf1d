//! Project snapshot types
//!
//! Everything a host sends along with a `compile` command: the module graph,
//! boilerplate sources and the externals map, plus the export map an
//! evaluation produces.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Markup used when a project declares no root `index.html`
pub const DEFAULT_ROOT_MARKUP: &str = r#"<div id="root"></div>"#;

/// Title of the module that declares the project's markup
pub const INDEX_HTML: &str = "index.html";

/// A single source module of the project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub shortid: String,
    pub title: String,
    #[serde(default)]
    pub code: String,
    /// Parent directory; `None` for modules at the project root
    #[serde(default)]
    pub directory_shortid: Option<String>,
}

impl Module {
    pub fn new(shortid: impl Into<String>, title: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            shortid: shortid.into(),
            title: title.into(),
            code: code.into(),
            directory_shortid: None,
        }
    }

    /// Place the module inside a directory
    pub fn in_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory_shortid = Some(directory.into());
        self
    }

    pub fn is_root(&self) -> bool {
        self.directory_shortid.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directory {
    pub shortid: String,
    pub title: String,
    #[serde(default)]
    pub directory_shortid: Option<String>,
}

/// Source of a fallback renderer, realized lazily by a boilerplate loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoilerplateSource {
    /// Discovery condition, interpreted by the loader
    pub condition: String,
    #[serde(default)]
    pub extension: String,
    pub code: String,
}

/// Package name to bundle path
pub type Externals = BTreeMap<String, String>;

/// Markup the document is reset to before evaluation
///
/// The module titled `index.html` at the project root wins; otherwise a bare
/// root container.
pub fn project_markup(modules: &[Module]) -> &str {
    modules
        .iter()
        .find(|m| m.title == INDEX_HTML && m.is_root())
        .map(|m| m.code.as_str())
        .unwrap_or(DEFAULT_ROOT_MARKUP)
}

/// A `compile` command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileRequest {
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub directories: Vec<Directory>,
    #[serde(default)]
    pub boilerplates: Vec<BoilerplateSource>,
    /// Evaluation entry point
    pub module: Module,
    #[serde(default)]
    pub externals: Option<Externals>,
    /// Bundle url; an empty url means no dependency bundle is needed
    #[serde(default)]
    pub url: String,
    /// Narrowest module whose cached evaluation must be dropped
    #[serde(default)]
    pub changed_module: Option<Module>,
    #[serde(default)]
    pub external_resources: Vec<String>,
    #[serde(default)]
    pub sandbox_id: String,
}

impl CompileRequest {
    /// A request for `module` with no dependency bundle
    pub fn new(module: Module, sandbox_id: impl Into<String>) -> Self {
        Self {
            modules: vec![module.clone()],
            directories: Vec::new(),
            boilerplates: Vec::new(),
            module,
            externals: None,
            url: String::new(),
            changed_module: None,
            external_resources: Vec::new(),
            sandbox_id: sandbox_id.into(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_modules(mut self, modules: Vec<Module>) -> Self {
        self.modules = modules;
        self
    }

    pub fn with_changed_module(mut self, module: Module) -> Self {
        self.changed_module = Some(module);
        self
    }

    pub fn with_boilerplates(mut self, boilerplates: Vec<BoilerplateSource>) -> Self {
        self.boilerplates = boilerplates;
        self
    }

    pub fn with_externals(mut self, externals: Externals) -> Self {
        self.externals = Some(externals);
        self
    }

    pub fn with_external_resources(mut self, resources: Vec<String>) -> Self {
        self.external_resources = resources;
        self
    }

    pub fn changed_module_id(&self) -> Option<&str> {
        self.changed_module.as_ref().map(|m| m.shortid.as_str())
    }
}

/// A single export of an evaluated module
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportValue {
    /// Function or class name, empty for anonymous values
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl ExportValue {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: serde_json::Value::Null,
        }
    }
}

/// Exports produced by evaluating a module
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportMap(BTreeMap<String, ExportValue>);

impl ExportMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(name: impl Into<String>) -> Self {
        let mut exports = Self::new();
        exports.insert("default", ExportValue::named(name));
        exports
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ExportValue) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ExportValue> {
        self.0.get(key)
    }

    pub fn default_export(&self) -> Option<&ExportValue> {
        self.get("default")
    }

    /// Name of the default export, or an empty string
    pub fn default_export_name(&self) -> String {
        self.default_export()
            .map(|export| export.name.clone())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
