//! Dependency manifest cache
//!
//! Remembers the manifest of the last resolved dependency combination so an
//! unchanged dependency set never triggers a second resolution.

use crate::component::Component;
use sandbox_config::{DependencyConfig, Phase};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

const LOG_TARGET: &str = Phase::Deps.target();

/// Status text shown while freshly resolved dependencies are transpiled
pub const TRANSPILING_STATUS: &str = "Transpiling Modules...";

/// Package name to version or range
pub type DependencyRequest = BTreeMap<String, String>;

/// Canonical cache key of a dependency set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyFingerprint(String);

impl DependencyFingerprint {
    /// Fingerprint an already filtered request
    ///
    /// The request is encoded as a JSON object in name order, so key order
    /// never matters and separators inside names or versions stay quoted.
    pub fn of(request: &DependencyRequest) -> Self {
        let object = request
            .iter()
            .map(|(name, version)| (name.clone(), serde_json::Value::String(version.clone())))
            .collect::<serde_json::Map<_, _>>();
        Self(serde_json::Value::Object(object).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DependencyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolved dependency data, opaque to the runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyManifest(serde_json::Value);

impl DependencyManifest {
    pub fn new(data: serde_json::Value) -> Self {
        Self(data)
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Progress shown on the long-running status display
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Loading { text: String },
}

/// Long-running status display
pub trait StatusScreen: Send + Sync {
    fn set(&self, status: StatusUpdate);
}

impl<T: StatusScreen + ?Sized> StatusScreen for Arc<T> {
    fn set(&self, status: StatusUpdate) {
        (**self).set(status);
    }
}

/// Resolves a dependency request into a manifest
pub trait DependencyResolver: Component {
    type Error: std::error::Error + Send + Sync + 'static;

    fn resolve(
        &self,
        dependencies: &DependencyRequest,
    ) -> impl Future<Output = Result<DependencyManifest, Self::Error>> + Send;
}

/// Result of [`DependencyCache::load`]
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDependencies {
    pub manifest: Option<DependencyManifest>,
    pub is_new_combination: bool,
}

#[derive(Debug, Default)]
struct CacheSlot {
    last_fingerprint: Option<DependencyFingerprint>,
    manifest: Option<DependencyManifest>,
}

/// Single-slot manifest cache in front of a resolver
pub struct DependencyCache<R, S> {
    resolver: R,
    status: S,
    config: DependencyConfig,
    slot: CacheSlot,
}

impl<R, S> DependencyCache<R, S>
where
    R: DependencyResolver,
    S: StatusScreen,
{
    pub fn new(resolver: R, status: S, config: DependencyConfig) -> Self {
        Self {
            resolver,
            status,
            config,
            slot: CacheSlot::default(),
        }
    }

    /// Drop entries that only carry type information
    pub fn runtime_dependencies(&self, dependencies: &DependencyRequest) -> DependencyRequest {
        let marker = self.config.type_only_marker.as_str();
        dependencies
            .iter()
            .filter(|(name, _)| !name.contains(marker))
            .map(|(name, version)| (name.clone(), version.clone()))
            .collect()
    }

    /// Load the manifest for `dependencies`, resolving only new combinations
    ///
    /// A failed resolution leaves the cached fingerprint and manifest as they
    /// were and hands the resolver's error back untouched.
    pub async fn load(
        &mut self,
        dependencies: &DependencyRequest,
    ) -> Result<LoadedDependencies, R::Error> {
        let filtered = self.runtime_dependencies(dependencies);
        if filtered.is_empty() {
            debug!(target: LOG_TARGET, "no runtime dependencies requested");
            return Ok(LoadedDependencies {
                manifest: None,
                is_new_combination: false,
            });
        }

        let fingerprint = DependencyFingerprint::of(&filtered);
        if self.slot.last_fingerprint.as_ref() == Some(&fingerprint) {
            debug!(target: LOG_TARGET, %fingerprint, "dependency combination unchanged");
            return Ok(LoadedDependencies {
                manifest: self.slot.manifest.clone(),
                is_new_combination: false,
            });
        }

        info!(
            target: LOG_TARGET,
            %fingerprint,
            resolver = self.resolver.name(),
            "resolving new dependency combination"
        );
        let manifest = self.resolver.resolve(&filtered).await?;

        self.slot = CacheSlot {
            last_fingerprint: Some(fingerprint),
            manifest: Some(manifest.clone()),
        };
        self.status.set(StatusUpdate::Loading {
            text: TRANSPILING_STATUS.to_string(),
        });

        Ok(LoadedDependencies {
            manifest: Some(manifest),
            is_new_combination: true,
        })
    }

    pub fn last_fingerprint(&self) -> Option<&DependencyFingerprint> {
        self.slot.last_fingerprint.as_ref()
    }

    pub fn manifest(&self) -> Option<&DependencyManifest> {
        self.slot.manifest.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStatusScreen;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Debug, thiserror::Error)]
    #[error("registry unreachable")]
    struct Unreachable;

    #[derive(Default)]
    struct CountingResolver {
        calls: Arc<AtomicUsize>,
        fail: Arc<AtomicBool>,
    }

    impl Component for CountingResolver {
        fn name(&self) -> &'static str {
            "counting"
        }
    }

    impl DependencyResolver for CountingResolver {
        type Error = Unreachable;

        async fn resolve(
            &self,
            dependencies: &DependencyRequest,
        ) -> Result<DependencyManifest, Unreachable> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(Unreachable);
            }
            Ok(DependencyManifest::new(json!({ "dependencies": dependencies })))
        }
    }

    fn request(entries: &[(&str, &str)]) -> DependencyRequest {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn cache() -> (
        DependencyCache<CountingResolver, Arc<MemoryStatusScreen>>,
        Arc<AtomicUsize>,
        Arc<AtomicBool>,
        Arc<MemoryStatusScreen>,
    ) {
        let resolver = CountingResolver::default();
        let calls = resolver.calls.clone();
        let fail = resolver.fail.clone();
        let status = Arc::new(MemoryStatusScreen::new());
        let cache = DependencyCache::new(resolver, status.clone(), DependencyConfig::default());
        (cache, calls, fail, status)
    }

    #[test]
    fn test_fingerprint_ignores_insertion_order() {
        let mut a = DependencyRequest::new();
        a.insert("react".into(), "16.0.0".into());
        a.insert("lodash".into(), "4".into());
        let mut b = DependencyRequest::new();
        b.insert("lodash".into(), "4".into());
        b.insert("react".into(), "16.0.0".into());
        assert_eq!(DependencyFingerprint::of(&a), DependencyFingerprint::of(&b));
        assert_eq!(DependencyFingerprint::of(&a).as_str(), r#"{"lodash":"4","react":"16.0.0"}"#);
    }

    #[test]
    fn test_fingerprint_keeps_separators_in_versions_apart() {
        let joined = request(&[("a", "1+b@2")]);
        let split = request(&[("a", "1"), ("b", "2")]);
        assert_ne!(DependencyFingerprint::of(&joined), DependencyFingerprint::of(&split));
    }

    #[tokio::test]
    async fn test_same_combination_resolves_once() {
        let (mut cache, calls, _, _) = cache();
        let first = cache
            .load(&request(&[("react", "16"), ("@types/react", "16")]))
            .await
            .unwrap();
        assert!(first.is_new_combination);

        let second = cache.load(&request(&[("react", "16")])).await.unwrap();
        assert!(!second.is_new_combination);
        assert_eq!(second.manifest, first.manifest);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_request_never_resolves() {
        let (mut cache, calls, _, status) = cache();
        let loaded = cache.load(&DependencyRequest::new()).await.unwrap();
        assert_eq!(loaded.manifest, None);
        assert!(!loaded.is_new_combination);

        let only_types = cache.load(&request(&[("@types/node", "8")])).await.unwrap();
        assert_eq!(only_types.manifest, None);
        assert!(!only_types.is_new_combination);

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(status.updates().is_empty());
        assert!(cache.last_fingerprint().is_none());
    }

    #[tokio::test]
    async fn test_distinct_versions_resolve_separately() {
        let (mut cache, calls, _, status) = cache();
        assert!(cache.load(&request(&[("a", "1")])).await.unwrap().is_new_combination);
        assert!(cache.load(&request(&[("a", "2")])).await.unwrap().is_new_combination);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.last_fingerprint().map(|f| f.as_str()), Some(r#"{"a":"2"}"#));
        assert_eq!(
            status.updates(),
            vec![
                StatusUpdate::Loading { text: TRANSPILING_STATUS.into() },
                StatusUpdate::Loading { text: TRANSPILING_STATUS.into() },
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_resolution_keeps_previous_slot() {
        let (mut cache, calls, fail, _) = cache();
        let first = cache.load(&request(&[("a", "1")])).await.unwrap();

        fail.store(true, Ordering::SeqCst);
        assert!(cache.load(&request(&[("a", "2")])).await.is_err());
        assert_eq!(cache.last_fingerprint().map(|f| f.as_str()), Some(r#"{"a":"1"}"#));
        assert_eq!(cache.manifest(), first.manifest.as_ref());

        fail.store(false, Ordering::SeqCst);
        let again = cache.load(&request(&[("a", "1")])).await.unwrap();
        assert!(!again.is_new_combination);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
