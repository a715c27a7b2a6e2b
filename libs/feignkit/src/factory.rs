//! Turns a descriptor and its effective configuration into a callable client.

use std::any::TypeId;
use std::sync::Arc;

use crate::customizer::{AsyncBuilderDraft, BuilderDraft, CustomizerChain};
use crate::descriptor::{Binder, ClientDescriptor, Published};
use crate::error::FeignError;
use crate::proxy::{AsyncClientProxy, AsyncFeignTarget, ClientProxy, FeignTarget};
use crate::resolver::EffectiveConfig;
use crate::transport::TransportProvider;

/// Builds client proxies on top of a [`TransportProvider`].
pub struct ClientProxyFactory {
    transports: Arc<dyn TransportProvider>,
}

impl ClientProxyFactory {
    #[must_use]
    pub fn new(transports: Arc<dyn TransportProvider>) -> Self {
        Self { transports }
    }

    /// Build the client `descriptor` declares.
    ///
    /// Steps: look up the transport, seed a draft from `config`, run the resolved
    /// customizer chain (sync or async, per the target) and then the descriptor's own
    /// customizers, freeze, let each capability wrap the transport, and bind the
    /// adapter type.
    ///
    /// # Errors
    /// - `FeignError::CapabilityLookup` carrying the provider's error unchanged
    /// - `FeignError::InvalidHeader` if a default header cannot be encoded
    pub fn build(
        &self,
        descriptor: &ClientDescriptor,
        config: &EffectiveConfig,
    ) -> Result<Published, FeignError> {
        let context_id = descriptor.context_id();
        let base_url = descriptor.target_url();

        match descriptor.target().binder() {
            Binder::Sync(bind) => {
                let transport = self
                    .transports
                    .client(context_id)
                    .map_err(FeignError::CapabilityLookup)?;

                let draft = CustomizerChain::apply(
                    BuilderDraft::from_config(config),
                    &config.customizers,
                );
                let draft = CustomizerChain::apply(draft, descriptor.customizers());

                let transport = draft
                    .capabilities()
                    .iter()
                    .fold(transport, |t, capability| capability.enrich_client(t));
                let proxy = ClientProxy::new(context_id, base_url, &draft, transport)?;
                tracing::debug!(
                    context_id,
                    target = descriptor.target().name(),
                    log_level = ?proxy.log_level(),
                    "Built client proxy"
                );
                Ok(bind(proxy))
            }
            Binder::Async(bind) => {
                let transport = self
                    .transports
                    .async_client(context_id)
                    .map_err(FeignError::CapabilityLookup)?;

                let draft = CustomizerChain::apply(
                    AsyncBuilderDraft::from_config(config),
                    &config.async_customizers,
                );
                let (draft, decode404) =
                    CustomizerChain::apply(draft, descriptor.async_customizers()).into_parts();

                let transport = draft
                    .capabilities()
                    .iter()
                    .fold(transport, |t, capability| capability.enrich_async_client(t));
                let proxy =
                    AsyncClientProxy::new(context_id, base_url, &draft, decode404, transport)?;
                tracing::debug!(
                    context_id,
                    target = descriptor.target().name(),
                    log_level = ?proxy.log_level(),
                    "Built async client proxy"
                );
                Ok(bind(proxy))
            }
        }
    }

    /// Build and downcast to the blocking adapter `T`.
    ///
    /// # Errors
    /// `FeignError::TargetMismatch` if `descriptor` does not target `T`, otherwise as
    /// [`ClientProxyFactory::build`].
    pub fn build_typed<T: FeignTarget>(
        &self,
        descriptor: &ClientDescriptor,
        config: &EffectiveConfig,
    ) -> Result<Arc<T>, FeignError> {
        self.build_as::<T>(descriptor, config)
    }

    /// Build and downcast to the non-blocking adapter `T`.
    ///
    /// # Errors
    /// `FeignError::TargetMismatch` if `descriptor` does not target `T`, otherwise as
    /// [`ClientProxyFactory::build`].
    pub fn build_async_typed<T: AsyncFeignTarget>(
        &self,
        descriptor: &ClientDescriptor,
        config: &EffectiveConfig,
    ) -> Result<Arc<T>, FeignError> {
        self.build_as::<T>(descriptor, config)
    }

    fn build_as<T: Send + Sync + 'static>(
        &self,
        descriptor: &ClientDescriptor,
        config: &EffectiveConfig,
    ) -> Result<Arc<T>, FeignError> {
        let mismatch = || FeignError::TargetMismatch {
            expected: descriptor.target().name(),
            actual: std::any::type_name::<T>(),
        };
        if descriptor.target().type_id() != TypeId::of::<T>() {
            return Err(mismatch());
        }
        self.build(descriptor, config)?
            .downcast::<T>()
            .map_err(|_| mismatch())
    }
}
