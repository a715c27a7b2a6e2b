//! Property-driven configuration.
//!
//! The `feign` property tree is loaded in layers (defaults, then an optional YAML file,
//! then `FEIGN__*` environment variables) and turned into store fragments:
//!
//! ```yaml
//! client:
//!   default_config: default
//!   config:
//!     default:
//!       logger_level: basic
//!       request_interceptors: [auth]
//!     users:
//!       logger_level: full
//!       read_timeout: 5s
//!       inherit_parent_config: false
//! httpclient:
//!   max_connections: 100
//! clients:
//!   - name: users
//!     url: http://localhost:8080
//! ```
//!
//! Interceptor and capability names are looked up in a [`ComponentCatalog`]. A strict
//! catalog rejects unknown names; a permissive one stands in a no-op placeholder that
//! keeps the name, which is enough to inspect a configuration without the real
//! components.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

use crate::descriptor::ClientDescriptor;
use crate::error::FeignError;
use crate::fragment::{Capability, ConfigFragment, LogLevel, RequestInterceptor, Scope};
use crate::http_props::HttpClientProperties;
use crate::proxy::{AsyncDynamicClient, DynamicClient};
use crate::store::ConfigurationStore;
use crate::transport::Request;

/// Environment variable prefix; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "FEIGN__";

/// Configuration error for property loading and conversion
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("invalid configuration: {0}")]
    Load(#[source] Box<figment::Error>),

    #[error("unknown request interceptor '{name}' in client config '{config}'")]
    UnknownInterceptor { config: String, name: String },

    #[error("unknown capability '{name}' in client config '{config}'")]
    UnknownCapability { config: String, name: String },

    #[error(transparent)]
    Store(#[from] FeignError),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Load(Box::new(e))
    }
}

/// Root of the `feign` property tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeignProperties {
    pub client: FeignClientProperties,
    pub httpclient: HttpClientProperties,
    pub clients: Vec<ClientDeclarationProperties>,
}

/// `client.*`: per-scope configuration keyed by config name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeignClientProperties {
    /// Config name that maps to the default scope
    pub default_config: String,
    pub config: BTreeMap<String, ClientConfigProperties>,
}

impl Default for FeignClientProperties {
    fn default() -> Self {
        Self {
            default_config: "default".to_owned(),
            config: BTreeMap::new(),
        }
    }
}

/// `client.config.<name>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfigProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logger_level: Option<LogLevel>,
    #[serde(
        with = "crate::humantime_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub connect_timeout: Option<Duration>,
    #[serde(
        with = "crate::humantime_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub read_timeout: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_redirects: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decode404: Option<bool>,
    pub request_interceptors: Vec<String>,
    pub capabilities: Vec<String>,
    pub default_request_headers: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inherit_parent_config: Option<bool>,
}

impl ClientConfigProperties {
    /// Convert to a fragment, resolving component names through `catalog`.
    ///
    /// # Errors
    /// `ConfigError::UnknownInterceptor` / `ConfigError::UnknownCapability` for names the
    /// catalog cannot supply.
    pub fn to_fragment(
        &self,
        config_name: &str,
        catalog: &ComponentCatalog,
    ) -> Result<ConfigFragment, ConfigError> {
        let mut fragment = ConfigFragment {
            log_level: self.logger_level,
            decode404: self.decode404,
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            follow_redirects: self.follow_redirects,
            inherit_parent_config: self.inherit_parent_config,
            ..ConfigFragment::default()
        };

        for name in &self.request_interceptors {
            let interceptor =
                catalog
                    .interceptor(name)
                    .ok_or_else(|| ConfigError::UnknownInterceptor {
                        config: config_name.to_owned(),
                        name: name.clone(),
                    })?;
            fragment.request_interceptors.push(interceptor);
        }
        for name in &self.capabilities {
            let capability =
                catalog
                    .capability(name)
                    .ok_or_else(|| ConfigError::UnknownCapability {
                        config: config_name.to_owned(),
                        name: name.clone(),
                    })?;
            fragment.capabilities.push(capability);
        }
        for (header, values) in &self.default_request_headers {
            for value in values {
                fragment
                    .default_request_headers
                    .push((header.clone(), value.clone()));
            }
        }
        Ok(fragment)
    }
}

/// `clients[]`: a client declared in configuration rather than in code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientDeclarationProperties {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    pub url: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    pub qualifiers: Vec<String>,
    pub inherit_parent_config: bool,
    #[serde(rename = "async")]
    pub is_async: bool,
}

impl Default for ClientDeclarationProperties {
    fn default() -> Self {
        Self {
            name: String::new(),
            context_id: None,
            url: String::new(),
            path: String::new(),
            qualifier: None,
            qualifiers: Vec::new(),
            inherit_parent_config: true,
            is_async: false,
        }
    }
}

impl ClientDeclarationProperties {
    /// Descriptor targeting the untyped [`DynamicClient`] / [`AsyncDynamicClient`].
    #[must_use]
    pub fn to_descriptor(&self) -> ClientDescriptor {
        let mut descriptor = if self.is_async {
            ClientDescriptor::for_async_type::<AsyncDynamicClient>(self.name.clone())
        } else {
            ClientDescriptor::for_type::<DynamicClient>(self.name.clone())
        };
        if let Some(context_id) = &self.context_id {
            descriptor = descriptor.with_context_id(context_id.clone());
        }
        if let Some(qualifier) = &self.qualifier {
            descriptor = descriptor.with_qualifier(qualifier.clone());
        }
        descriptor
            .with_url(self.url.clone())
            .with_path(self.path.clone())
            .with_qualifiers(self.qualifiers.iter().cloned())
            .with_inherit_parent_config(self.inherit_parent_config)
    }
}

impl FeignProperties {
    /// Layered load: defaults -> YAML file (if given) -> env (`FEIGN__*`).
    ///
    /// # Errors
    /// - `ConfigError::NotFound` if `path` is given but does not exist
    /// - `ConfigError::Load` if any layer fails to parse or does not fit the model
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(FeignProperties::default()));
        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            figment = figment.merge(Yaml::file(path));
        }
        Self::extract(figment)
    }

    /// Same layering as [`FeignProperties::load`] with the YAML given inline.
    ///
    /// # Errors
    /// `ConfigError::Load` if the YAML or env layer is invalid.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(FeignProperties::default()))
            .merge(Yaml::string(yaml));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let props: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        tracing::debug!(
            scopes = props.client.config.len(),
            clients = props.clients.len(),
            "Loaded feign properties"
        );
        Ok(props)
    }

    /// Scope of a `client.config` entry.
    #[must_use]
    pub fn scope_of(&self, config_name: &str) -> Scope {
        if config_name == self.client.default_config {
            Scope::Default
        } else {
            Scope::client(config_name)
        }
    }

    /// One fragment per `client.config` entry, in config-name order.
    ///
    /// # Errors
    /// See [`ClientConfigProperties::to_fragment`].
    pub fn fragments(
        &self,
        catalog: &ComponentCatalog,
    ) -> Result<Vec<(Scope, ConfigFragment)>, ConfigError> {
        self.client
            .config
            .iter()
            .map(|(name, props)| Ok((self.scope_of(name), props.to_fragment(name, catalog)?)))
            .collect()
    }

    /// Put every scope into `store`. For a scope declared both in code and in
    /// properties, the code fragment comes first and the property fragment is merged
    /// over it.
    ///
    /// # Errors
    /// Conversion errors, or the store's `DuplicateScope` / `FragmentAlreadyResolved`.
    pub fn populate(
        &self,
        store: &ConfigurationStore,
        catalog: &ComponentCatalog,
        code: Vec<(Scope, ConfigFragment)>,
    ) -> Result<(), ConfigError> {
        let mut merged: BTreeMap<Scope, ConfigFragment> = BTreeMap::new();
        for (scope, fragment) in code.into_iter().chain(self.fragments(catalog)?) {
            let combined = match merged.remove(&scope) {
                Some(earlier) => earlier.merge(fragment),
                None => fragment,
            };
            merged.insert(scope, combined);
        }
        for (scope, fragment) in merged {
            store.put(scope, fragment)?;
        }
        Ok(())
    }

    /// Descriptors for the `clients` list.
    #[must_use]
    pub fn descriptors(&self) -> Vec<ClientDescriptor> {
        self.clients
            .iter()
            .map(ClientDeclarationProperties::to_descriptor)
            .collect()
    }
}

/// Named request interceptors and capabilities available to configuration.
#[derive(Clone, Default)]
pub struct ComponentCatalog {
    interceptors: HashMap<String, Arc<dyn RequestInterceptor>>,
    capabilities: HashMap<String, Arc<dyn Capability>>,
    permissive: bool,
}

impl ComponentCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog that answers unknown names with named no-op placeholders.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            permissive: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_interceptor(
        mut self,
        name: impl Into<String>,
        interceptor: Arc<dyn RequestInterceptor>,
    ) -> Self {
        let name = name.into();
        self.interceptors.insert(
            name.clone(),
            Arc::new(NamedInterceptor {
                name,
                inner: Some(interceptor),
            }),
        );
        self
    }

    #[must_use]
    pub fn with_capability(
        mut self,
        name: impl Into<String>,
        capability: Arc<dyn Capability>,
    ) -> Self {
        self.capabilities.insert(name.into(), capability);
        self
    }

    #[must_use]
    pub fn interceptor(&self, name: &str) -> Option<Arc<dyn RequestInterceptor>> {
        if let Some(found) = self.interceptors.get(name) {
            return Some(Arc::clone(found));
        }
        self.permissive.then(|| {
            Arc::new(NamedInterceptor {
                name: name.to_owned(),
                inner: None,
            }) as Arc<dyn RequestInterceptor>
        })
    }

    #[must_use]
    pub fn capability(&self, name: &str) -> Option<Arc<dyn Capability>> {
        if let Some(found) = self.capabilities.get(name) {
            return Some(Arc::clone(found));
        }
        self.permissive.then(|| {
            Arc::new(PlaceholderCapability {
                name: name.to_owned(),
            }) as Arc<dyn Capability>
        })
    }
}

struct NamedInterceptor {
    name: String,
    inner: Option<Arc<dyn RequestInterceptor>>,
}

impl RequestInterceptor for NamedInterceptor {
    fn apply(&self, request: &mut Request) {
        if let Some(inner) = &self.inner {
            inner.apply(request);
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct PlaceholderCapability {
    name: String,
}

impl Capability for PlaceholderCapability {
    fn name(&self) -> &str {
        &self.name
    }
}
