//! Builder drafts and the ordered customizer chain that mutates them.
//!
//! A draft is seeded from an [`EffectiveConfig`] and threaded through every
//! customizer of the matching chain. Entries run sorted by `(order, sequence_no)`;
//! entries without an explicit order run after all ordered ones. Each entry sees the
//! previous entry's output, so scalar fields are last-writer-wins and list fields
//! accumulate.
//!
//! Synchronous and asynchronous clients use independent chains. An
//! [`AsyncBuilderDraft`] wraps a nested [`BuilderDraft`]; both are run through the same
//! [`CustomizerChain::apply`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::fragment::{Capability, LogLevel, RequestInterceptor};
use crate::resolver::EffectiveConfig;
use crate::transport::RequestOptions;

/// A draft-mutating function.
pub type CustomizerFn<D> = Arc<dyn Fn(D) -> D + Send + Sync>;

/// One customizer with its ordering metadata.
pub struct CustomizerEntry<D> {
    order: Option<i32>,
    sequence_no: u64,
    apply: CustomizerFn<D>,
}

impl<D> CustomizerEntry<D> {
    /// Unordered customizer; runs after every ordered one.
    #[must_use]
    pub fn new(apply: impl Fn(D) -> D + Send + Sync + 'static) -> Self {
        Self {
            order: None,
            sequence_no: 0,
            apply: Arc::new(apply),
        }
    }

    /// Customizer with an explicit order (lower runs first).
    #[must_use]
    pub fn ordered(order: i32, apply: impl Fn(D) -> D + Send + Sync + 'static) -> Self {
        Self {
            order: Some(order),
            sequence_no: 0,
            apply: Arc::new(apply),
        }
    }

    #[must_use]
    pub fn order(&self) -> Option<i32> {
        self.order
    }

    #[must_use]
    pub fn sequence_no(&self) -> u64 {
        self.sequence_no
    }

    /// Stamp the registration order; done by the store when a fragment is put.
    #[must_use]
    pub(super) fn with_sequence_no(mut self, sequence_no: u64) -> Self {
        self.sequence_no = sequence_no;
        self
    }

    fn sort_key(&self) -> (bool, i32, u64) {
        (
            self.order.is_none(),
            self.order.unwrap_or_default(),
            self.sequence_no,
        )
    }
}

impl<D> Clone for CustomizerEntry<D> {
    fn clone(&self) -> Self {
        Self {
            order: self.order,
            sequence_no: self.sequence_no,
            apply: Arc::clone(&self.apply),
        }
    }
}

impl<D> fmt::Debug for CustomizerEntry<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomizerEntry")
            .field("order", &self.order)
            .field("sequence_no", &self.sequence_no)
            .finish_non_exhaustive()
    }
}

/// Ordering and application of customizer entries.
pub struct CustomizerChain;

impl CustomizerChain {
    /// Entries in application order. The sort is stable, so entries that were never
    /// stamped by a store keep their slice order as the final tie-break.
    #[must_use]
    pub fn sorted<D>(entries: &[CustomizerEntry<D>]) -> Vec<&CustomizerEntry<D>> {
        let mut sorted: Vec<_> = entries.iter().collect();
        sorted.sort_by_key(|e| e.sort_key());
        sorted
    }

    /// Run `draft` through every entry in application order.
    #[must_use]
    pub fn apply<D>(draft: D, entries: &[CustomizerEntry<D>]) -> D {
        Self::sorted(entries)
            .into_iter()
            .fold(draft, |draft, entry| (entry.apply)(draft))
    }
}

/// Mutable builder state for a synchronous client.
#[derive(Clone)]
pub struct BuilderDraft {
    log_level: LogLevel,
    decode404: bool,
    options: RequestOptions,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    capabilities: Vec<Arc<dyn Capability>>,
    default_headers: Vec<(String, String)>,
}

impl BuilderDraft {
    /// Seed a draft with the resolved configuration of one client.
    #[must_use]
    pub fn from_config(config: &EffectiveConfig) -> Self {
        Self {
            log_level: config.log_level,
            decode404: config.decode404,
            options: config.options,
            request_interceptors: config.request_interceptors.clone(),
            capabilities: config.capabilities.clone(),
            default_headers: config.default_request_headers.clone(),
        }
    }

    #[must_use]
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    #[must_use]
    pub fn with_decode404(mut self) -> Self {
        self.decode404 = true;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.options.read_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.options.follow_redirects = follow;
        self
    }

    #[must_use]
    pub fn with_request_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.request_interceptors.push(interceptor);
        self
    }

    #[must_use]
    pub fn with_capability(mut self, capability: Arc<dyn Capability>) -> Self {
        self.capabilities.push(capability);
        self
    }

    #[must_use]
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    #[must_use]
    pub fn is_decode404(&self) -> bool {
        self.decode404
    }

    #[must_use]
    pub fn options(&self) -> RequestOptions {
        self.options
    }

    #[must_use]
    pub fn request_interceptors(&self) -> &[Arc<dyn RequestInterceptor>] {
        &self.request_interceptors
    }

    #[must_use]
    pub fn capabilities(&self) -> &[Arc<dyn Capability>] {
        &self.capabilities
    }

    #[must_use]
    pub fn default_headers(&self) -> &[(String, String)] {
        &self.default_headers
    }
}

impl fmt::Debug for BuilderDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuilderDraft")
            .field("log_level", &self.log_level)
            .field("decode404", &self.decode404)
            .field("options", &self.options)
            .field("request_interceptors", &self.request_interceptors.len())
            .field("capabilities", &self.capabilities.len())
            .field("default_headers", &self.default_headers)
            .finish()
    }
}

/// Mutable builder state for an asynchronous client.
///
/// Logging, interceptors and options live on the nested synchronous draft; the
/// async draft owns its own `decode404` flag.
#[derive(Clone, Debug)]
pub struct AsyncBuilderDraft {
    builder: BuilderDraft,
    decode404: bool,
}

impl AsyncBuilderDraft {
    #[must_use]
    pub fn from_config(config: &EffectiveConfig) -> Self {
        Self {
            builder: BuilderDraft::from_config(config),
            decode404: config.decode404,
        }
    }

    #[must_use]
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.builder = self.builder.with_log_level(level);
        self
    }

    #[must_use]
    pub fn with_decode404(mut self) -> Self {
        self.decode404 = true;
        self
    }

    #[must_use]
    pub fn with_request_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.builder = self.builder.with_request_interceptor(interceptor);
        self
    }

    #[must_use]
    pub fn with_capability(mut self, capability: Arc<dyn Capability>) -> Self {
        self.builder = self.builder.with_capability(capability);
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.builder = self.builder.with_options(options);
        self
    }

    /// Apply a synchronous-draft mutation to the nested builder.
    #[must_use]
    pub fn map_nested(mut self, f: impl FnOnce(BuilderDraft) -> BuilderDraft) -> Self {
        self.builder = f(self.builder);
        self
    }

    #[must_use]
    pub fn nested(&self) -> &BuilderDraft {
        &self.builder
    }

    #[must_use]
    pub fn is_decode404(&self) -> bool {
        self.decode404
    }

    pub(super) fn into_parts(self) -> (BuilderDraft, bool) {
        (self.builder, self.decode404)
    }
}
