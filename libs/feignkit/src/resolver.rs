//! Effective per-client configuration.
//!
//! Resolution rules for a client with context id `C`:
//! - scalars: the client scope wins, then the default scope, then system defaults;
//! - lists: default-scope entries first, then client-scope entries;
//! - when inheritance is off the default scope is ignored entirely.
//!
//! Inheritance is on only if both the descriptor and the client scope's
//! `inherit_parent_config` allow it. Results are cached per context id, and every
//! scope a resolution reads is sealed in the store.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::customizer::{AsyncBuilderDraft, BuilderDraft, CustomizerEntry};
use crate::descriptor::ClientDescriptor;
use crate::fragment::{Capability, ConfigFragment, LogLevel, RequestInterceptor, Scope};
use crate::store::ConfigurationStore;
use crate::transport::RequestOptions;

/// Fully resolved configuration of one client.
#[derive(Clone)]
pub struct EffectiveConfig {
    pub context_id: String,
    /// Whether the default scope took part in resolution
    pub inherited: bool,
    pub log_level: LogLevel,
    pub decode404: bool,
    pub options: RequestOptions,
    pub request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    pub capabilities: Vec<Arc<dyn Capability>>,
    pub default_request_headers: Vec<(String, String)>,
    pub customizers: Vec<CustomizerEntry<BuilderDraft>>,
    pub async_customizers: Vec<CustomizerEntry<AsyncBuilderDraft>>,
}

impl EffectiveConfig {
    /// Configuration used when no scope sets anything.
    #[must_use]
    pub fn system_default(context_id: &str) -> Self {
        Self {
            context_id: context_id.to_owned(),
            inherited: false,
            log_level: LogLevel::default(),
            decode404: false,
            options: RequestOptions::default(),
            request_interceptors: Vec::new(),
            capabilities: Vec::new(),
            default_request_headers: Vec::new(),
            customizers: Vec::new(),
            async_customizers: Vec::new(),
        }
    }

    /// Serializable summary, used for configuration dumps.
    #[must_use]
    pub fn view(&self) -> EffectiveConfigView {
        EffectiveConfigView {
            context_id: self.context_id.clone(),
            inherited: self.inherited,
            log_level: self.log_level,
            decode404: self.decode404,
            connect_timeout: humantime::format_duration(self.options.connect_timeout).to_string(),
            read_timeout: humantime::format_duration(self.options.read_timeout).to_string(),
            follow_redirects: self.options.follow_redirects,
            request_interceptors: self
                .request_interceptors
                .iter()
                .map(|i| i.name().to_owned())
                .collect(),
            capabilities: self
                .capabilities
                .iter()
                .map(|c| c.name().to_owned())
                .collect(),
            default_request_headers: self.default_request_headers.clone(),
            customizers: self.customizers.len(),
            async_customizers: self.async_customizers.len(),
        }
    }
}

impl fmt::Debug for EffectiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.view(), f)
    }
}

/// Printable form of an [`EffectiveConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveConfigView {
    pub context_id: String,
    pub inherited: bool,
    pub log_level: LogLevel,
    pub decode404: bool,
    pub connect_timeout: String,
    pub read_timeout: String,
    pub follow_redirects: bool,
    pub request_interceptors: Vec<String>,
    pub capabilities: Vec<String>,
    pub default_request_headers: Vec<(String, String)>,
    pub customizers: usize,
    pub async_customizers: usize,
}

/// Merges store fragments into [`EffectiveConfig`]s.
pub struct ConfigurationResolver {
    store: Arc<ConfigurationStore>,
    cache: RwLock<HashMap<String, Arc<EffectiveConfig>>>,
}

impl ConfigurationResolver {
    #[must_use]
    pub fn new(store: Arc<ConfigurationStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<ConfigurationStore> {
        &self.store
    }

    /// Effective configuration of `descriptor`'s context.
    ///
    /// Never fails: absent scopes contribute nothing. Repeated calls for the same
    /// context id return the cached result.
    #[must_use]
    pub fn resolve(&self, descriptor: &ClientDescriptor) -> Arc<EffectiveConfig> {
        let context_id = descriptor.context_id();
        if let Some(hit) = self.cache.read().get(context_id) {
            return Arc::clone(hit);
        }

        let mut w = self.cache.write();
        if let Some(hit) = w.get(context_id) {
            return Arc::clone(hit);
        }

        let client = self.store.seal(&Scope::client(context_id));
        let default = self.store.seal(&Scope::Default);
        let inherit =
            descriptor.inherit_parent_config() && client.inherit_parent_config.unwrap_or(true);

        let resolved = Arc::new(merge(
            context_id,
            inherit.then_some(&*default),
            &client,
        ));
        tracing::debug!(
            context_id,
            inherit,
            log_level = ?resolved.log_level,
            interceptors = resolved.request_interceptors.len(),
            "Resolved client configuration"
        );
        w.insert(context_id.to_owned(), Arc::clone(&resolved));
        resolved
    }

    /// Whether `context_id` has already been resolved.
    #[must_use]
    pub fn is_resolved(&self, context_id: &str) -> bool {
        self.cache.read().contains_key(context_id)
    }
}

fn merge(
    context_id: &str,
    default: Option<&ConfigFragment>,
    client: &ConfigFragment,
) -> EffectiveConfig {
    let system = RequestOptions::default();
    let mut config = EffectiveConfig::system_default(context_id);

    config.inherited = default.is_some();
    config.log_level = pick(client, default, |f| f.log_level).unwrap_or_default();
    config.decode404 = pick(client, default, |f| f.decode404).unwrap_or(false);
    config.options = RequestOptions {
        connect_timeout: pick(client, default, |f| f.connect_timeout)
            .unwrap_or(system.connect_timeout),
        read_timeout: pick(client, default, |f| f.read_timeout).unwrap_or(system.read_timeout),
        follow_redirects: pick(client, default, |f| f.follow_redirects)
            .unwrap_or(system.follow_redirects),
    };

    for fragment in default.into_iter().chain(std::iter::once(client)) {
        config
            .request_interceptors
            .extend(fragment.request_interceptors.iter().cloned());
        config
            .capabilities
            .extend(fragment.capabilities.iter().cloned());
        config
            .default_request_headers
            .extend(fragment.default_request_headers.iter().cloned());
        config
            .customizers
            .extend(fragment.customizers.iter().cloned());
        config
            .async_customizers
            .extend(fragment.async_customizers.iter().cloned());
    }
    config
}

fn pick<T>(
    client: &ConfigFragment,
    default: Option<&ConfigFragment>,
    field: impl Fn(&ConfigFragment) -> Option<T>,
) -> Option<T> {
    field(client).or_else(move || default.and_then(field))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::DynamicClient;
    use crate::error::FeignError;
    use crate::transport::Request;
    use std::time::Duration;

    struct Named(&'static str);

    impl RequestInterceptor for Named {
        fn apply(&self, _request: &mut Request) {}

        fn name(&self) -> &str {
            self.0
        }
    }

    fn descriptor(context_id: &str) -> ClientDescriptor {
        ClientDescriptor::for_type::<DynamicClient>("svc").with_context_id(context_id)
    }

    fn seeded_store() -> Arc<ConfigurationStore> {
        let store = Arc::new(ConfigurationStore::new());
        store
            .put(
                Scope::Default,
                ConfigFragment::new()
                    .log_level(LogLevel::Full)
                    .read_timeout(Duration::from_secs(5))
                    .request_interceptor(Arc::new(Named("foo")))
                    .request_interceptor(Arc::new(Named("bar"))),
            )
            .unwrap();
        store
    }

    fn names(config: &EffectiveConfig) -> Vec<String> {
        config
            .request_interceptors
            .iter()
            .map(|i| i.name().to_owned())
            .collect()
    }

    #[test]
    fn client_scalars_override_default_and_lists_append() {
        let store = seeded_store();
        store
            .put(
                Scope::client("foo"),
                ConfigFragment::new()
                    .log_level(LogLevel::Headers)
                    .request_interceptor(Arc::new(Named("baz"))),
            )
            .unwrap();

        let resolver = ConfigurationResolver::new(store);
        let config = resolver.resolve(&descriptor("foo"));

        assert!(config.inherited);
        assert_eq!(config.log_level, LogLevel::Headers);
        assert_eq!(config.options.read_timeout, Duration::from_secs(5));
        assert_eq!(config.options.connect_timeout, Duration::from_secs(10));
        assert_eq!(names(&config), ["foo", "bar", "baz"]);
    }

    #[test]
    fn scope_flag_disables_inheritance() {
        let store = seeded_store();
        store
            .put(
                Scope::client("lonely"),
                ConfigFragment::new()
                    .log_level(LogLevel::Headers)
                    .inherit_parent_config(false),
            )
            .unwrap();

        let config = ConfigurationResolver::new(store).resolve(&descriptor("lonely"));

        assert!(!config.inherited);
        assert_eq!(config.log_level, LogLevel::Headers);
        assert!(config.request_interceptors.is_empty());
        assert_eq!(config.options.read_timeout, Duration::from_secs(60));
    }

    #[test]
    fn descriptor_flag_disables_inheritance() {
        let store = seeded_store();
        let resolver = ConfigurationResolver::new(store);

        let config = resolver.resolve(&descriptor("solo").with_inherit_parent_config(false));

        assert!(!config.inherited);
        assert_eq!(config.log_level, LogLevel::None);
        assert!(config.request_interceptors.is_empty());
    }

    #[test]
    fn absent_scopes_yield_system_defaults() {
        let resolver = ConfigurationResolver::new(Arc::new(ConfigurationStore::new()));
        let config = resolver.resolve(&descriptor("bare"));

        assert_eq!(config.log_level, LogLevel::None);
        assert!(!config.decode404);
        assert_eq!(config.options, RequestOptions::default());
    }

    #[test]
    fn results_are_cached_per_context() {
        let resolver = ConfigurationResolver::new(seeded_store());
        let first = resolver.resolve(&descriptor("foo"));
        let second = resolver.resolve(&descriptor("foo"));

        assert!(Arc::ptr_eq(&first, &second));
        assert!(resolver.is_resolved("foo"));
        assert!(!resolver.is_resolved("bar"));
    }

    #[test]
    fn resolution_seals_read_scopes() {
        let store = seeded_store();
        let resolver = ConfigurationResolver::new(Arc::clone(&store));
        resolver.resolve(&descriptor("foo"));

        let err = store
            .put(Scope::client("foo"), ConfigFragment::new())
            .unwrap_err();
        assert!(matches!(err, FeignError::FragmentAlreadyResolved { .. }));
        assert!(store.is_sealed(&Scope::Default));

        store
            .put(Scope::client("other"), ConfigFragment::new())
            .unwrap();
    }

    #[test]
    fn view_formats_durations() {
        let resolver = ConfigurationResolver::new(seeded_store());
        let view = resolver.resolve(&descriptor("foo")).view();

        assert_eq!(view.read_timeout, "5s");
        assert_eq!(view.connect_timeout, "10s");
        assert_eq!(view.request_interceptors, ["foo", "bar"]);
    }
}
