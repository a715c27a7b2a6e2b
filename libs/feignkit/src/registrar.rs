//! Registration pipeline: validate, resolve, build, publish.
//!
//! Everything here runs on one thread during start-up. A failing descriptor aborts the
//! batch at that point; clients published before it stay published.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::descriptor::ClientDescriptor;
use crate::error::FeignError;
use crate::factory::ClientProxyFactory;
use crate::qualifier::QualifierResolver;
use crate::registry::ClientRegistry;
use crate::resolver::ConfigurationResolver;
use crate::store::ConfigurationStore;
use crate::transport::TransportProvider;
use crate::validator::Validator;

/// Outcome of registering one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredClient {
    pub context_id: String,
    /// Qualifier-derived aliases; the client is also reachable by its context id
    pub aliases: BTreeSet<String>,
}

/// Drives descriptors through the whole pipeline into a [`ClientRegistry`].
pub struct FeignClientsRegistrar {
    resolver: ConfigurationResolver,
    factory: ClientProxyFactory,
    registry: Arc<ClientRegistry>,
    allow_override: bool,
}

impl FeignClientsRegistrar {
    #[must_use]
    pub fn new(store: Arc<ConfigurationStore>, transports: Arc<dyn TransportProvider>) -> Self {
        Self {
            resolver: ConfigurationResolver::new(store),
            factory: ClientProxyFactory::new(transports),
            registry: Arc::new(ClientRegistry::new()),
            allow_override: false,
        }
    }

    /// Publish into an existing registry instead of a fresh one.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<ClientRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Let a later declaration of a context id replace an earlier one.
    #[must_use]
    pub fn allow_override(mut self, allow: bool) -> Self {
        self.allow_override = allow;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn resolver(&self) -> &ConfigurationResolver {
        &self.resolver
    }

    /// Register one client.
    ///
    /// # Errors
    /// Any validation, build or publication error; also
    /// `FeignError::DuplicateClientName` if the context id was registered before and
    /// overriding is disabled.
    pub fn register(&self, descriptor: &ClientDescriptor) -> Result<RegisteredClient, FeignError> {
        Validator::validate(descriptor)?;
        self.ensure_not_registered(descriptor)?;
        self.register_validated(descriptor)
    }

    /// Register a batch. The batch is validated as a whole first, so a duplicate
    /// context id fails before anything is built.
    ///
    /// # Errors
    /// The first error hit; see [`FeignClientsRegistrar::register`].
    pub fn register_all(
        &self,
        descriptors: Vec<ClientDescriptor>,
    ) -> Result<Vec<RegisteredClient>, FeignError> {
        tracing::info!("Phase: validate");
        let accepted = Validator::validate_batch(descriptors, self.allow_override)
            .inspect_err(|e| tracing::warn!(error = %e, "Rejected client declarations"))?;

        tracing::info!(clients = accepted.len(), "Phase: build");
        let mut registered = Vec::with_capacity(accepted.len());
        for descriptor in accepted {
            self.ensure_not_registered(&descriptor)?;
            registered.push(self.register_validated(&descriptor)?);
        }
        Ok(registered)
    }

    /// A context id already published by that same client is a duplicate declaration.
    /// A name taken by another client is left to the registry, which reports it as a
    /// `FeignError::DuplicateAlias`.
    fn ensure_not_registered(&self, descriptor: &ClientDescriptor) -> Result<(), FeignError> {
        let context_id = descriptor.context_id();
        if !self.allow_override
            && self.registry.owner_of(context_id).as_deref() == Some(context_id)
        {
            return Err(FeignError::DuplicateClientName {
                name: context_id.to_owned(),
            });
        }
        Ok(())
    }

    fn register_validated(
        &self,
        descriptor: &ClientDescriptor,
    ) -> Result<RegisteredClient, FeignError> {
        let context_id = descriptor.context_id();
        let config = self.resolver.resolve(descriptor);
        let client = self
            .factory
            .build(descriptor, &config)
            .inspect_err(|e| tracing::warn!(context_id, error = %e, "Failed to build client"))?;

        let aliases = QualifierResolver::aliases_for(descriptor);
        let names = std::iter::once(context_id).chain(aliases.iter().map(String::as_str));
        self.registry
            .publish(context_id, names, &client)
            .inspect_err(|e| tracing::warn!(context_id, error = %e, "Failed to publish client"))?;

        tracing::info!(
            context_id,
            aliases = ?aliases,
            is_async = descriptor.is_async(),
            "Registered client"
        );
        Ok(RegisteredClient {
            context_id: context_id.to_owned(),
            aliases,
        })
    }
}
