//! In-memory host surfaces
//!
//! Backing implementations for embedding the runtime without a browser:
//! the replay CLI and tests drive the sandbox through these and inspect
//! what it did afterwards.

use crate::deps::{StatusScreen, StatusUpdate};
use crate::history::{History, Location};
use crate::host::{
    BundleHost, Document, ExternalResources, HostTarget, ResizeListener, ResizeObserver,
};
use crate::protocol::OutboundMessage;
use std::sync::Mutex;

/// Document held as a markup string
#[derive(Debug)]
pub struct MemoryDocument {
    body: Mutex<String>,
    height: Mutex<Option<f64>>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self {
            body: Mutex::new(String::new()),
            height: Mutex::new(Some(0.0)),
        }
    }

    /// Set the height reported to resize listeners; `None` means no body
    pub fn set_height(&self, height: Option<f64>) {
        if let Ok(mut slot) = self.height.lock() {
            *slot = height;
        }
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl Document for MemoryDocument {
    fn body_markup(&self) -> String {
        self.body.lock().map(|body| body.clone()).unwrap_or_default()
    }

    fn set_body_markup(&self, markup: &str) {
        if let Ok(mut body) = self.body.lock() {
            *body = markup.to_string();
        }
    }

    fn body_height(&self) -> Option<f64> {
        self.height.lock().ok().and_then(|height| *height)
    }
}

/// Bundle host whose bundle shows up after a fixed number of checks
#[derive(Debug, Default)]
pub struct MemoryBundleHost {
    checks_until_available: usize,
    remaining: Mutex<usize>,
    injected: Mutex<Vec<String>>,
}

impl MemoryBundleHost {
    /// Bundles are available on the first check
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundles become available after `checks` failed checks
    pub fn available_after(checks: usize) -> Self {
        Self {
            checks_until_available: checks,
            ..Self::default()
        }
    }

    /// Script urls injected so far
    pub fn injected(&self) -> Vec<String> {
        self.injected
            .lock()
            .map(|injected| injected.clone())
            .unwrap_or_default()
    }
}

impl BundleHost for MemoryBundleHost {
    fn inject_bundle(&self, script_url: &str) {
        if let Ok(mut injected) = self.injected.lock() {
            injected.push(script_url.to_string());
        }
        if let Ok(mut remaining) = self.remaining.lock() {
            *remaining = self.checks_until_available;
        }
    }

    fn bundle_available(&self) -> bool {
        match self.remaining.lock() {
            Ok(mut remaining) if *remaining > 0 => {
                *remaining -= 1;
                false
            }
            _ => true,
        }
    }
}

/// A message as the host frame received it
#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    pub origin: String,
    pub message: OutboundMessage,
}

/// Host frame that records every posted message
#[derive(Debug, Default)]
pub struct MemoryHost {
    messages: Mutex<Vec<PostedMessage>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<PostedMessage> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    /// Message kinds in posting order
    pub fn kinds(&self) -> Vec<&'static str> {
        self.messages()
            .iter()
            .map(|posted| posted.message.kind())
            .collect()
    }

    /// Return and clear the recorded messages
    pub fn drain(&self) -> Vec<PostedMessage> {
        if let Ok(mut messages) = self.messages.lock() {
            std::mem::take(&mut *messages)
        } else {
            Vec::new()
        }
    }
}

impl HostTarget for MemoryHost {
    fn post(&self, message: &OutboundMessage, target_origin: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(PostedMessage {
                origin: target_origin.to_string(),
                message: message.clone(),
            });
        }
    }
}

#[derive(Debug)]
struct SessionEntries {
    entries: Vec<Location>,
    index: usize,
}

/// Session history as a list of entries and a cursor
#[derive(Debug)]
pub struct MemoryHistory {
    session: Mutex<SessionEntries>,
}

impl MemoryHistory {
    pub fn new(initial_url: &str) -> Self {
        Self {
            session: Mutex::new(SessionEntries {
                entries: vec![Location::parse(initial_url)],
                index: 0,
            }),
        }
    }

    /// Number of entries in the session
    pub fn len(&self) -> usize {
        self.session
            .lock()
            .map(|session| session.entries.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn step(&self, forward: bool) -> bool {
        let Ok(mut session) = self.session.lock() else {
            return false;
        };
        if forward && session.index + 1 < session.entries.len() {
            session.index += 1;
            true
        } else if !forward && session.index > 0 {
            session.index -= 1;
            true
        } else {
            false
        }
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new("/")
    }
}

impl History for MemoryHistory {
    fn push_state(&self, url: &str) {
        if let Ok(mut session) = self.session.lock() {
            let next = session.index + 1;
            session.entries.truncate(next);
            session.entries.push(Location::parse(url));
            session.index = next;
        }
    }

    fn replace_state(&self, url: &str) {
        if let Ok(mut session) = self.session.lock() {
            let index = session.index;
            session.entries[index] = Location::parse(url);
        }
    }

    fn back(&self) -> bool {
        self.step(false)
    }

    fn forward(&self) -> bool {
        self.step(true)
    }

    fn location(&self) -> Location {
        self.session
            .lock()
            .map(|session| session.entries[session.index].clone())
            .unwrap_or_default()
    }
}

/// Records each batch of applied external resources
#[derive(Debug, Default)]
pub struct MemoryResources {
    applied: Mutex<Vec<Vec<String>>>,
}

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn applied(&self) -> Vec<Vec<String>> {
        self.applied
            .lock()
            .map(|applied| applied.clone())
            .unwrap_or_default()
    }
}

impl ExternalResources for MemoryResources {
    fn apply(&self, resources: &[String]) {
        if let Ok(mut applied) = self.applied.lock() {
            applied.push(resources.to_vec());
        }
    }
}

/// Resize observer fired by hand
#[derive(Default)]
pub struct MemoryResizeObserver {
    listeners: Mutex<Vec<ResizeListener>>,
}

impl std::fmt::Debug for MemoryResizeObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryResizeObserver")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl MemoryResizeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .map(|listeners| listeners.len())
            .unwrap_or_default()
    }

    /// Simulate a body resize
    pub fn trigger(&self) {
        if let Ok(listeners) = self.listeners.lock() {
            for listener in listeners.iter() {
                listener();
            }
        }
    }
}

impl ResizeObserver for MemoryResizeObserver {
    fn observe_body(&self, listener: ResizeListener) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(listener);
        }
    }
}

/// Status screen that keeps every update
#[derive(Debug, Default)]
pub struct MemoryStatusScreen {
    updates: Mutex<Vec<StatusUpdate>>,
}

impl MemoryStatusScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<StatusUpdate> {
        self.updates
            .lock()
            .map(|updates| updates.clone())
            .unwrap_or_default()
    }
}

impl StatusScreen for MemoryStatusScreen {
    fn set(&self, status: StatusUpdate) {
        if let Ok(mut updates) = self.updates.lock() {
            updates.push(status);
        }
    }
}
