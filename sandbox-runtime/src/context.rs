//! Runtime state of one sandbox instance

/// Mutable state the compile flow consults between commands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeState {
    /// Url of the bundle currently loaded; `None` until the first compile
    pub current_bundle_url: Option<String>,
    /// Set while a bundle script is being injected and awaited
    pub bundle_load_in_flight: bool,
    /// Set once the body resize listener has been installed
    pub resize_listener_installed: bool,
}

impl RuntimeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `url` requires a bundle (re)load
    pub fn needs_bundle(&self, url: &str) -> bool {
        self.current_bundle_url.as_deref() != Some(url)
    }
}
