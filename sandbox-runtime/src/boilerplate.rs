//! Fallback renderers
//!
//! A boilerplate renders the exports of a UI-framework module that did not
//! render itself. Loaders realize them from the sources the host sends; the
//! registry holds them in source order.

use crate::component::Component;
use crate::error::BoilerplateError;
use crate::project::{BoilerplateSource, Directory, ExportMap, Externals, Module};

/// A realized fallback renderer
pub trait Boilerplate: Send + Sync {
    /// Whether this boilerplate knows how to render `module`
    fn matches(&self, module: &Module) -> bool;

    /// Render the evaluated exports into the document
    fn render(&self, exports: &ExportMap) -> Result<(), BoilerplateError>;
}

/// Realizes boilerplate sources into renderers
pub trait BoilerplateLoader: Component {
    fn realize(
        &self,
        sources: &[BoilerplateSource],
        modules: &[Module],
        directories: &[Directory],
        externals: &Externals,
    ) -> Result<BoilerplateRegistry, BoilerplateError>;
}

/// Realized boilerplates, searched in registration order
#[derive(Default)]
pub struct BoilerplateRegistry {
    entries: Vec<Box<dyn Boilerplate>>,
}

impl std::fmt::Debug for BoilerplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoilerplateRegistry")
            .field("count", &self.entries.len())
            .finish()
    }
}

impl BoilerplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, boilerplate: Box<dyn Boilerplate>) {
        self.entries.push(boilerplate);
    }

    /// First boilerplate that matches `module`
    pub fn find(&self, module: &Module) -> Option<&dyn Boilerplate> {
        self.entries
            .iter()
            .find(|b| b.matches(module))
            .map(|b| b.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
