//! Host page surfaces
//!
//! The runtime never touches a real page directly. Whatever embeds it (a
//! browser binding, the replay CLI, tests) supplies these implementations.

use crate::protocol::OutboundMessage;
use std::sync::Arc;

/// The visible document of the frame
pub trait Document: Send + Sync {
    /// Current markup of the document body
    fn body_markup(&self) -> String;

    /// Replace the document body
    fn set_body_markup(&self, markup: &str);

    /// Rendered body height, if a body exists
    fn body_height(&self) -> Option<f64>;
}

/// Loader for the externally built dependency bundle
pub trait BundleHost: Send + Sync {
    /// Clear the global bundle symbol and append a fresh script reference
    fn inject_bundle(&self, script_url: &str);

    /// Whether the bundle's global symbol has become available
    fn bundle_available(&self) -> bool;
}

/// The embedding frame that receives outbound messages
pub trait HostTarget: Send + Sync {
    fn post(&self, message: &OutboundMessage, target_origin: &str);
}

/// Injector for external stylesheets and scripts
pub trait ExternalResources: Send + Sync {
    fn apply(&self, resources: &[String]);
}

/// Callback fired when the observed body changes size
pub type ResizeListener = Box<dyn Fn() + Send + Sync>;

/// Installer for body size observation
pub trait ResizeObserver: Send + Sync {
    fn observe_body(&self, listener: ResizeListener);
}

/// A host target bound to the configured origin
#[derive(Clone)]
pub struct Outbound {
    target: Arc<dyn HostTarget>,
    origin: &'static str,
}

impl std::fmt::Debug for Outbound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbound")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl Outbound {
    pub fn new(target: Arc<dyn HostTarget>, origin: &'static str) -> Self {
        Self { target, origin }
    }

    /// Post to the configured host origin
    pub fn send(&self, message: OutboundMessage) {
        self.target.post(&message, self.origin);
    }

    /// Post to an explicit origin
    pub fn send_to(&self, message: OutboundMessage, origin: &str) {
        self.target.post(&message, origin);
    }

    pub fn origin(&self) -> &'static str {
        self.origin
    }
}
