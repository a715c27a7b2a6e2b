//! Configuration fragments and the pieces they are made of.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::customizer::{AsyncBuilderDraft, BuilderDraft, CustomizerEntry};
use crate::transport::{AsyncClient, Client, Request};

/// Call logging verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// No logging
    #[default]
    None,
    /// Request method and URL, response status and elapsed time
    Basic,
    /// `Basic` plus request and response headers
    Headers,
    /// `Headers` plus body sizes
    Full,
}

/// Name of a configuration bucket.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// Shared by every client that inherits parent configuration
    Default,
    /// Owned by the client with this context id
    Client(Arc<str>),
}

impl Scope {
    #[must_use]
    pub fn client(context_id: impl Into<Arc<str>>) -> Self {
        Scope::Client(context_id.into())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Default => f.write_str("default"),
            Scope::Client(id) => f.write_str(id),
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Mutates every outbound request of a client, in effective-config order.
pub trait RequestInterceptor: Send + Sync {
    fn apply(&self, request: &mut Request);

    /// Label used in logs and configuration dumps.
    fn name(&self) -> &str {
        "anonymous"
    }
}

impl<F> RequestInterceptor for F
where
    F: Fn(&mut Request) + Send + Sync,
{
    fn apply(&self, request: &mut Request) {
        self(request);
    }
}

/// Extension point that may wrap the transport of a client.
pub trait Capability: Send + Sync {
    fn name(&self) -> &str;

    fn enrich_client(&self, client: Arc<dyn Client>) -> Arc<dyn Client> {
        client
    }

    fn enrich_async_client(&self, client: Arc<dyn AsyncClient>) -> Arc<dyn AsyncClient> {
        client
    }
}

/// One scope's worth of configuration.
///
/// Scalars are `None` when the fragment does not set them; lists are appended in the
/// order given. Once put into a [`crate::ConfigurationStore`] a fragment is immutable.
#[derive(Clone, Default)]
pub struct ConfigFragment {
    pub log_level: Option<LogLevel>,
    pub decode404: Option<bool>,
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub follow_redirects: Option<bool>,
    /// Only honoured on client scopes; `Some(false)` cuts the default scope off.
    pub inherit_parent_config: Option<bool>,
    pub request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    pub capabilities: Vec<Arc<dyn Capability>>,
    pub default_request_headers: Vec<(String, String)>,
    pub customizers: Vec<CustomizerEntry<BuilderDraft>>,
    pub async_customizers: Vec<CustomizerEntry<AsyncBuilderDraft>>,
}

impl ConfigFragment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    #[must_use]
    pub fn decode404(mut self, decode404: bool) -> Self {
        self.decode404 = Some(decode404);
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = Some(follow);
        self
    }

    #[must_use]
    pub fn inherit_parent_config(mut self, inherit: bool) -> Self {
        self.inherit_parent_config = Some(inherit);
        self
    }

    #[must_use]
    pub fn request_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.request_interceptors.push(interceptor);
        self
    }

    #[must_use]
    pub fn capability(mut self, capability: Arc<dyn Capability>) -> Self {
        self.capabilities.push(capability);
        self
    }

    #[must_use]
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_request_headers
            .push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn customizer(mut self, entry: CustomizerEntry<BuilderDraft>) -> Self {
        self.customizers.push(entry);
        self
    }

    #[must_use]
    pub fn async_customizer(mut self, entry: CustomizerEntry<AsyncBuilderDraft>) -> Self {
        self.async_customizers.push(entry);
        self
    }

    /// Combine two declarations of the same scope: `later` wins on scalars and its
    /// list entries come after ours.
    #[must_use]
    pub fn merge(mut self, later: ConfigFragment) -> Self {
        self.log_level = later.log_level.or(self.log_level);
        self.decode404 = later.decode404.or(self.decode404);
        self.connect_timeout = later.connect_timeout.or(self.connect_timeout);
        self.read_timeout = later.read_timeout.or(self.read_timeout);
        self.follow_redirects = later.follow_redirects.or(self.follow_redirects);
        self.inherit_parent_config = later.inherit_parent_config.or(self.inherit_parent_config);
        self.request_interceptors.extend(later.request_interceptors);
        self.capabilities.extend(later.capabilities);
        self.default_request_headers
            .extend(later.default_request_headers);
        self.customizers.extend(later.customizers);
        self.async_customizers.extend(later.async_customizers);
        self
    }
}

impl fmt::Debug for ConfigFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigFragment")
            .field("log_level", &self.log_level)
            .field("decode404", &self.decode404)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("follow_redirects", &self.follow_redirects)
            .field("inherit_parent_config", &self.inherit_parent_config)
            .field(
                "request_interceptors",
                &self
                    .request_interceptors
                    .iter()
                    .map(|i| i.name())
                    .collect::<Vec<_>>(),
            )
            .field(
                "capabilities",
                &self
                    .capabilities
                    .iter()
                    .map(|c| c.name())
                    .collect::<Vec<_>>(),
            )
            .field("default_request_headers", &self.default_request_headers)
            .field("customizers", &self.customizers.len())
            .field("async_customizers", &self.async_customizers.len())
            .finish()
    }
}
