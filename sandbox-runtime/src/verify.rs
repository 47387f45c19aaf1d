//! Render verification
//!
//! Decides whether an evaluation produced a visible effect. When the markup
//! did not change and the entry looks like a UI-framework module, the
//! verifier tries a boilerplate fallback render before giving up.
//!
//! The UI check is a plain substring heuristic on the module source. It is
//! fooled by the marker appearing in a comment or string literal (false
//! positive), and misses UI modules that never spell the marker out, such as
//! JSX compiled through an automatic runtime (false negative).

use crate::boilerplate::{BoilerplateLoader, BoilerplateRegistry};
use crate::component::Component;
use crate::error::NoDomChangeError;
use crate::project::{BoilerplateSource, Directory, ExportMap, Externals, Module};
use sandbox_config::{Phase, VerifierConfig};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

const LOG_TARGET: &str = Phase::Verify.target();

/// Inputs of a single verification
#[derive(Debug, Clone, Copy)]
pub struct VerificationInput<'a> {
    pub pre_markup: &'a str,
    pub post_markup: &'a str,
    pub module: &'a Module,
    pub exports: &'a ExportMap,
    pub boilerplates: &'a [BoilerplateSource],
    pub modules: &'a [Module],
    pub directories: &'a [Directory],
    pub externals: Option<&'a Externals>,
}

/// Why a verification succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verified {
    /// The document changed during evaluation
    MarkupChanged,
    /// The entry is a markup file and needs no change
    MarkupEntry,
    /// A boilerplate rendered the module's exports
    Boilerplate,
}

pub struct RenderVerifier {
    config: VerifierConfig,
    loader: Arc<dyn BoilerplateLoader>,
    /// Last successful realization; an empty one is realized again
    registry: Mutex<Option<Arc<BoilerplateRegistry>>>,
}

impl std::fmt::Debug for RenderVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderVerifier")
            .field("config", &self.config)
            .field("registry", &*self.lock_registry())
            .finish_non_exhaustive()
    }
}

impl RenderVerifier {
    pub fn new(config: VerifierConfig, loader: Arc<dyn BoilerplateLoader>) -> Self {
        Self {
            config,
            loader,
            registry: Mutex::new(None),
        }
    }

    /// Whether `module` looks like a UI-framework module
    pub fn looks_like_ui_module(&self, module: &Module) -> bool {
        module.code.contains(self.config.ui_marker.as_str())
    }

    pub fn verify(&self, input: VerificationInput<'_>) -> Result<Verified, NoDomChangeError> {
        if input.pre_markup != input.post_markup {
            return Ok(Verified::MarkupChanged);
        }
        if input
            .module
            .title
            .ends_with(self.config.markup_entry_suffix.as_str())
        {
            return Ok(Verified::MarkupEntry);
        }

        let export_name = input.exports.default_export_name();
        if !self.looks_like_ui_module(input.module) {
            debug!(target: LOG_TARGET, module = %input.module.title, "no DOM change, not a UI module");
            return Err(NoDomChangeError::new(false, export_name));
        }

        let Some(registry) = self.registry(&input) else {
            debug!(target: LOG_TARGET, module = %input.module.title, "no boilerplates available");
            return Err(NoDomChangeError::new(true, export_name));
        };
        let Some(boilerplate) = registry.find(input.module) else {
            debug!(target: LOG_TARGET, module = %input.module.title, "no matching boilerplate");
            return Err(NoDomChangeError::new(true, export_name));
        };

        match boilerplate.render(input.exports) {
            Ok(()) => Ok(Verified::Boilerplate),
            Err(e) => {
                debug!(target: LOG_TARGET, module = %input.module.title, error = %e, "boilerplate render failed");
                Err(NoDomChangeError::new(true, export_name))
            }
        }
    }

    fn lock_registry(&self) -> MutexGuard<'_, Option<Arc<BoilerplateRegistry>>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Realized registry, realizing it while none with entries is held
    ///
    /// Realization only happens when boilerplate sources and externals are
    /// present; a failure is logged and retried on a later verification.
    fn registry(&self, input: &VerificationInput<'_>) -> Option<Arc<BoilerplateRegistry>> {
        let mut slot = self.lock_registry();
        if let Some(registry) = slot.as_ref().filter(|registry| !registry.is_empty()) {
            return Some(registry.clone());
        }
        let externals = input.externals?;
        if input.boilerplates.is_empty() {
            return None;
        }

        let realized = self
            .loader
            .realize(input.boilerplates, input.modules, input.directories, externals);
        match realized {
            Ok(registry) => {
                debug!(
                    target: LOG_TARGET,
                    count = registry.len(),
                    loader = self.loader.name(),
                    "boilerplates realized"
                );
                let registry = Arc::new(registry);
                *slot = Some(registry.clone());
                Some(registry)
            }
            Err(e) => {
                warn!(target: LOG_TARGET, error = %e, "couldn't load all boilerplates");
                None
            }
        }
    }

    /// Whether a realized registry is held
    pub fn has_registry(&self) -> bool {
        self.lock_registry().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boilerplate::Boilerplate;
    use crate::error::BoilerplateError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FixedBoilerplate {
        fails: bool,
    }

    impl Boilerplate for FixedBoilerplate {
        fn matches(&self, module: &Module) -> bool {
            module.title.ends_with(".js")
        }

        fn render(&self, _exports: &ExportMap) -> Result<(), BoilerplateError> {
            if self.fails {
                Err(BoilerplateError::Render("default export is not a component".into()))
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct TestLoader {
        realizations: AtomicUsize,
        broken: AtomicBool,
        /// Realize one empty registry before the real one
        empty_first: AtomicBool,
        render_fails: bool,
    }

    impl Component for TestLoader {
        fn name(&self) -> &'static str {
            "test"
        }
    }

    impl BoilerplateLoader for TestLoader {
        fn realize(
            &self,
            sources: &[BoilerplateSource],
            _modules: &[Module],
            _directories: &[Directory],
            _externals: &Externals,
        ) -> Result<BoilerplateRegistry, BoilerplateError> {
            self.realizations.fetch_add(1, Ordering::SeqCst);
            if self.broken.load(Ordering::SeqCst) {
                return Err(BoilerplateError::Realization {
                    condition: sources[0].condition.clone(),
                    message: "syntax error".into(),
                });
            }
            let mut registry = BoilerplateRegistry::new();
            if self.empty_first.swap(false, Ordering::SeqCst) {
                return Ok(registry);
            }
            registry.register(Box::new(FixedBoilerplate { fails: self.render_fails }));
            Ok(registry)
        }
    }

    fn sources() -> Vec<BoilerplateSource> {
        vec![BoilerplateSource {
            condition: "\\.js$".into(),
            extension: ".js".into(),
            code: "render(App)".into(),
        }]
    }

    fn verify_with(
        verifier: &RenderVerifier,
        module: &Module,
        pre: &str,
        post: &str,
        boilerplates: &[BoilerplateSource],
        externals: Option<&Externals>,
    ) -> Result<Verified, NoDomChangeError> {
        verifier.verify(VerificationInput {
            pre_markup: pre,
            post_markup: post,
            module,
            exports: &ExportMap::with_default("App"),
            boilerplates,
            modules: std::slice::from_ref(module),
            directories: &[],
            externals,
        })
    }

    fn verifier(loader: Arc<TestLoader>) -> RenderVerifier {
        RenderVerifier::new(VerifierConfig::default(), loader)
    }

    #[test]
    fn test_changed_markup_always_verifies() {
        let v = verifier(Arc::new(TestLoader::default()));
        let module = Module::new("m", "index.js", "console.log(1)");
        assert_eq!(
            verify_with(&v, &module, "<div></div>", "<div>hi</div>", &[], None),
            Ok(Verified::MarkupChanged)
        );

        let ui = Module::new("m", "index.js", "import React from 'react'");
        assert_eq!(
            verify_with(&v, &ui, "<div></div>", "<div id=\"root\"></div>", &sources(), None),
            Ok(Verified::MarkupChanged)
        );
    }

    #[test]
    fn test_markup_entry_exempt() {
        let v = verifier(Arc::new(TestLoader::default()));
        let module = Module::new("m", "index.html", "<p>static</p>");
        assert_eq!(
            verify_with(&v, &module, "<p>static</p>", "<p>static</p>", &[], None),
            Ok(Verified::MarkupEntry)
        );
    }

    #[test]
    fn test_plain_module_without_change_fails() {
        let v = verifier(Arc::new(TestLoader::default()));
        let module = Module::new("m", "index.js", "export default function App() {}");
        let err = verify_with(&v, &module, "<div></div>", "<div></div>", &sources(), None)
            .unwrap_err();
        assert!(!err.looks_like_ui_module);
        assert_eq!(err.export_name, "App");
    }

    #[test]
    fn test_heuristic_false_positive_in_comment() {
        let v = verifier(Arc::new(TestLoader::default()));
        let plain = Module::new("m", "index.js", "// not React at all\nexport default 1");
        assert!(v.looks_like_ui_module(&plain));
        let jsx_only = Module::new("m", "index.js", "export default () => <div />");
        assert!(!v.looks_like_ui_module(&jsx_only));
    }

    #[test]
    fn test_ui_module_rendered_by_boilerplate() {
        let loader = Arc::new(TestLoader::default());
        let v = verifier(loader.clone());
        let module = Module::new("m", "index.js", "import React from 'react'");
        let externals = Externals::new();
        assert_eq!(
            verify_with(&v, &module, "<div></div>", "<div></div>", &sources(), Some(&externals)),
            Ok(Verified::Boilerplate)
        );
        assert_eq!(
            verify_with(&v, &module, "<div></div>", "<div></div>", &sources(), Some(&externals)),
            Ok(Verified::Boilerplate)
        );
        assert_eq!(loader.realizations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_throwing_boilerplate_fails_as_ui_module() {
        let loader = Arc::new(TestLoader {
            render_fails: true,
            ..Default::default()
        });
        let v = verifier(loader);
        let module = Module::new("m", "index.js", "import React from 'react'");
        let err = verify_with(
            &v,
            &module,
            "<div></div>",
            "<div></div>",
            &sources(),
            Some(&Externals::new()),
        )
        .unwrap_err();
        assert!(err.looks_like_ui_module);
        assert_eq!(err.export_name, "App");
    }

    #[test]
    fn test_no_matching_boilerplate_fails() {
        let v = verifier(Arc::new(TestLoader::default()));
        let module = Module::new("m", "index.ts", "import React from 'react'");
        let err = verify_with(
            &v,
            &module,
            "<div></div>",
            "<div></div>",
            &sources(),
            Some(&Externals::new()),
        )
        .unwrap_err();
        assert!(err.looks_like_ui_module);
    }

    #[test]
    fn test_realization_requires_externals() {
        let loader = Arc::new(TestLoader::default());
        let v = verifier(loader.clone());
        let module = Module::new("m", "index.js", "import React from 'react'");
        let err = verify_with(&v, &module, "", "", &sources(), None).unwrap_err();
        assert!(err.looks_like_ui_module);
        assert_eq!(loader.realizations.load(Ordering::SeqCst), 0);
        assert!(!v.has_registry());
    }

    #[test]
    fn test_realization_failure_is_not_fatal_and_retried() {
        let loader = Arc::new(TestLoader::default());
        loader.broken.store(true, Ordering::SeqCst);
        let v = verifier(loader.clone());
        let module = Module::new("m", "index.js", "import React from 'react'");
        let externals = Externals::new();

        let err = verify_with(&v, &module, "", "", &sources(), Some(&externals)).unwrap_err();
        assert!(err.looks_like_ui_module);
        assert!(!v.has_registry());

        loader.broken.store(false, Ordering::SeqCst);
        assert_eq!(
            verify_with(&v, &module, "", "", &sources(), Some(&externals)),
            Ok(Verified::Boilerplate)
        );
        assert_eq!(loader.realizations.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_empty_realization_is_retried() {
        let loader = Arc::new(TestLoader::default());
        loader.empty_first.store(true, Ordering::SeqCst);
        let v = verifier(loader.clone());
        let module = Module::new("m", "index.js", "import React from 'react'");
        let externals = Externals::new();

        let err = verify_with(&v, &module, "", "", &sources(), Some(&externals)).unwrap_err();
        assert!(err.looks_like_ui_module);

        assert_eq!(
            verify_with(&v, &module, "", "", &sources(), Some(&externals)),
            Ok(Verified::Boilerplate)
        );
        assert_eq!(
            verify_with(&v, &module, "", "", &sources(), Some(&externals)),
            Ok(Verified::Boilerplate)
        );
        assert_eq!(loader.realizations.load(Ordering::SeqCst), 2);
    }
}
