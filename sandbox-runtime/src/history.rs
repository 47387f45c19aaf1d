//! In-frame navigation
//!
//! [`HistoryInterceptor`] wraps the frame's [`History`] so every navigation,
//! including navigation started by evaluated project code, runs a hook. The
//! default hook queues a [`NavigationEvent`]; the message bridge drains the
//! queue on its next turn and reports the location to the host, which is
//! what defers the `urlchange` until the navigation itself has completed.

use sandbox_config::Phase;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tracing::trace;

const LOG_TARGET: &str = Phase::History.target();

/// Current location of the frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub pathname: String,
    /// Query string including the leading `?`, or empty
    pub search: String,
}

impl Location {
    /// Split a url into path and query, dropping any fragment
    pub fn parse(url: &str) -> Self {
        let without_fragment = url.split('#').next().unwrap_or_default();
        let (pathname, search) = match without_fragment.find('?') {
            Some(idx) => without_fragment.split_at(idx),
            None => (without_fragment, ""),
        };
        let pathname = if pathname.is_empty() { "/" } else { pathname };
        Self {
            pathname: pathname.to_string(),
            search: search.to_string(),
        }
    }

    /// Path plus query string, as reported in `urlchange`
    pub fn path_and_query(&self) -> String {
        format!("{}{}", self.pathname, self.search)
    }
}

/// The frame's session history
pub trait History: Send + Sync {
    fn push_state(&self, url: &str);

    fn replace_state(&self, url: &str);

    /// Step back one entry; returns whether the position moved
    fn back(&self) -> bool;

    /// Step forward one entry; returns whether the position moved
    fn forward(&self) -> bool;

    fn location(&self) -> Location;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    Push,
    Replace,
    Traverse,
}

/// A navigation observed by the interceptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEvent {
    pub kind: NavigationKind,
    /// Target url for push and replace; `None` for traversal
    pub url: Option<String>,
}

/// Hook invoked on every navigation
pub type NavigationHook = Arc<dyn Fn(&NavigationEvent) + Send + Sync>;

/// Receiving end of the navigation queue
pub type NavigationEvents = mpsc::UnboundedReceiver<NavigationEvent>;

/// History wrapper that reports every navigation to a hook
pub struct HistoryInterceptor {
    inner: Arc<dyn History>,
    hook: RwLock<NavigationHook>,
    notifier: NavigationHook,
}

impl std::fmt::Debug for HistoryInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryInterceptor")
            .field("location", &self.inner.location())
            .finish_non_exhaustive()
    }
}

impl HistoryInterceptor {
    /// Wrap `inner`; the returned queue receives one event per navigation
    pub fn install(inner: Arc<dyn History>) -> (Arc<Self>, NavigationEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let notifier: NavigationHook = Arc::new(move |event: &NavigationEvent| {
            // The receiver only goes away with the bridge; late events are moot.
            let _ = tx.send(event.clone());
        });
        let interceptor = Arc::new(Self {
            inner,
            hook: RwLock::new(notifier.clone()),
            notifier,
        });
        (interceptor, rx)
    }

    /// Replace the hook
    ///
    /// The default hook is available from [`HistoryInterceptor::notifier`]
    /// so an override can still queue the `urlchange`.
    pub fn set_hook(&self, hook: NavigationHook) {
        match self.hook.write() {
            Ok(mut slot) => *slot = hook,
            Err(poisoned) => *poisoned.into_inner() = hook,
        }
    }

    /// The default hook, which queues the event for the bridge
    pub fn notifier(&self) -> NavigationHook {
        self.notifier.clone()
    }

    fn notify(&self, kind: NavigationKind, url: Option<&str>) {
        let event = NavigationEvent {
            kind,
            url: url.map(str::to_string),
        };
        trace!(target: LOG_TARGET, ?event, "navigation");
        let hook = match self.hook.read() {
            Ok(hook) => hook.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        hook(&event);
    }
}

impl History for HistoryInterceptor {
    fn push_state(&self, url: &str) {
        self.notify(NavigationKind::Push, Some(url));
        self.inner.push_state(url);
    }

    fn replace_state(&self, url: &str) {
        self.notify(NavigationKind::Replace, Some(url));
        self.inner.replace_state(url);
    }

    fn back(&self) -> bool {
        let moved = self.inner.back();
        if moved {
            self.notify(NavigationKind::Traverse, None);
        }
        moved
    }

    fn forward(&self) -> bool {
        let moved = self.inner.forward();
        if moved {
            self.notify(NavigationKind::Traverse, None);
        }
        moved
    }

    fn location(&self) -> Location {
        self.inner.location()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHistory;
    use std::sync::Mutex;

    #[test]
    fn test_location_parse() {
        let loc = Location::parse("/users?id=3#top");
        assert_eq!(loc.pathname, "/users");
        assert_eq!(loc.search, "?id=3");
        assert_eq!(loc.path_and_query(), "/users?id=3");
        assert_eq!(Location::parse("").path_and_query(), "/");
        assert_eq!(Location::parse("?q=1").path_and_query(), "/?q=1");
    }

    #[test]
    fn test_each_navigation_queues_one_event() {
        let (history, mut events) = HistoryInterceptor::install(Arc::new(MemoryHistory::new("/")));

        history.push_state("/a?x=1");
        history.replace_state("/b");
        assert!(history.back());
        assert!(history.forward());

        let kinds: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                NavigationKind::Push,
                NavigationKind::Replace,
                NavigationKind::Traverse,
                NavigationKind::Traverse,
            ]
        );
        assert_eq!(history.location().path_and_query(), "/b");
    }

    #[test]
    fn test_traversal_at_edge_is_silent() {
        let (history, mut events) = HistoryInterceptor::install(Arc::new(MemoryHistory::new("/")));
        assert!(!history.back());
        assert!(!history.forward());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_hook_override() {
        let (history, mut events) = HistoryInterceptor::install(Arc::new(MemoryHistory::new("/")));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let recorder = seen.clone();
        let notifier = history.notifier();
        history.set_hook(Arc::new(move |event: &NavigationEvent| {
            recorder.lock().unwrap().push(event.url.clone());
            notifier(event);
        }));

        history.push_state("/next");
        assert_eq!(*seen.lock().unwrap(), vec![Some("/next".to_string())]);
        assert_eq!(events.try_recv().unwrap().kind, NavigationKind::Push);
        assert_eq!(history.location().pathname, "/next");
    }
}
