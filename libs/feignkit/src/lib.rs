#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Declarative remote-service clients
//!
//! A client is declared as a [`ClientDescriptor`] and built from layered
//! configuration:
//! - [`ConfigurationStore`] holds one [`ConfigFragment`] per scope (the default scope
//!   and one per client context id)
//! - [`ConfigurationResolver`] merges them into one [`EffectiveConfig`] per client,
//!   honouring `inherit_parent_config`
//! - [`CustomizerChain`] runs ordered customizers over a builder draft
//! - [`ClientProxyFactory`] freezes the draft and binds it to the adapter type
//! - [`QualifierResolver`] decides the aliases the client is published under in the
//!   [`ClientRegistry`]
//!
//! [`FeignClientsRegistrar`] runs the whole pipeline. The crate performs no network
//! I/O of its own: transports are supplied through [`TransportProvider`].
//!
//! # Example
//!
//! ```ignore
//! use feignkit::{
//!     CallArgs, ClientDescriptor, ConfigFragment, ConfigurationStore, FeignClientsRegistrar,
//!     LogLevel, Scope,
//! };
//! use std::sync::Arc;
//!
//! feignkit::feign_client! {
//!     pub struct UsersClient {
//!         fn get_user => GET "/users/{id}";
//!     }
//! }
//!
//! let store = Arc::new(ConfigurationStore::new());
//! store.put(Scope::Default, ConfigFragment::new().log_level(LogLevel::Basic))?;
//!
//! let registrar = FeignClientsRegistrar::new(store, transports);
//! registrar.register(
//!     &ClientDescriptor::for_type::<UsersClient>("users").with_url("http://localhost:8080"),
//! )?;
//!
//! let users = registrar.registry().get::<UsersClient>("users")?;
//! let user: User = users.get_user(CallArgs::new().path_var("id", 42))?.json()?;
//! ```

mod macros;

pub mod config;
mod customizer;
mod descriptor;
mod error;
mod factory;
mod fragment;
pub mod http_props;
pub mod humantime_serde;
mod proxy;
mod qualifier;
mod registrar;
mod registry;
mod resolver;
mod store;
mod transport;
mod validator;

pub use http;

pub use config::{ComponentCatalog, ConfigError, FeignProperties};
pub use customizer::{
    AsyncBuilderDraft, BuilderDraft, CustomizerChain, CustomizerEntry, CustomizerFn,
};
pub use descriptor::{Binder, ClientDescriptor, Published, TargetType};
pub use error::{BoxError, FeignError};
pub use factory::ClientProxyFactory;
pub use fragment::{Capability, ConfigFragment, LogLevel, RequestInterceptor, Scope};
pub use http_props::HttpClientProperties;
pub use proxy::{
    AsyncClientProxy, AsyncDynamicClient, AsyncFeignTarget, CallArgs, CallHandle, ClientProxy,
    DynamicClient, FeignTarget, MethodMeta,
};
pub use qualifier::QualifierResolver;
pub use registrar::{FeignClientsRegistrar, RegisteredClient};
pub use registry::ClientRegistry;
pub use resolver::{ConfigurationResolver, EffectiveConfig, EffectiveConfigView};
pub use store::ConfigurationStore;
pub use transport::{
    AsyncClient, Client, Request, RequestOptions, Response, SharedTransport, TransportProvider,
};
pub use validator::Validator;
