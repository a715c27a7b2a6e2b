//! Client declarations.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::customizer::{AsyncBuilderDraft, BuilderDraft, CustomizerEntry};
use crate::proxy::{AsyncClientProxy, AsyncFeignTarget, ClientProxy, FeignTarget, MethodMeta};

/// A built client, type-erased for publication.
pub type Published = Arc<dyn Any + Send + Sync>;

/// How a proxy is turned into the target adapter.
#[derive(Clone, Copy)]
pub enum Binder {
    Sync(fn(ClientProxy) -> Published),
    Async(fn(AsyncClientProxy) -> Published),
}

/// Handle to the adapter type a descriptor builds.
#[derive(Clone)]
pub struct TargetType {
    type_id: TypeId,
    name: &'static str,
    methods: Vec<MethodMeta>,
    binder: Binder,
}

impl TargetType {
    /// Target built from a synchronous proxy.
    #[must_use]
    pub fn sync<T: FeignTarget>(methods: Vec<MethodMeta>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            methods,
            binder: Binder::Sync(|proxy| Arc::new(T::from_proxy(proxy))),
        }
    }

    /// Target built from an asynchronous proxy.
    #[must_use]
    pub fn asynchronous<T: AsyncFeignTarget>(methods: Vec<MethodMeta>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            methods,
            binder: Binder::Async(|proxy| Arc::new(T::from_proxy(proxy))),
        }
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn methods(&self) -> &[MethodMeta] {
        &self.methods
    }

    #[must_use]
    pub fn binder(&self) -> Binder {
        self.binder
    }

    #[must_use]
    pub fn is_async(&self) -> bool {
        matches!(self.binder, Binder::Async(_))
    }
}

impl fmt::Debug for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetType")
            .field("name", &self.name)
            .field("methods", &self.methods.len())
            .field("async", &self.is_async())
            .finish_non_exhaustive()
    }
}

/// Declarative record of one client to build.
#[derive(Clone)]
pub struct ClientDescriptor {
    name: String,
    context_id: String,
    target: TargetType,
    url: String,
    path: String,
    qualifier: Option<String>,
    qualifiers: Vec<String>,
    inherit_parent_config: bool,
    customizers: Vec<CustomizerEntry<BuilderDraft>>,
    async_customizers: Vec<CustomizerEntry<AsyncBuilderDraft>>,
}

impl ClientDescriptor {
    /// Descriptor for target `target`; `url` and `path` default to empty and the
    /// context id defaults to `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, target: TargetType) -> Self {
        let name = name.into();
        Self {
            context_id: name.clone(),
            name,
            target,
            url: String::new(),
            path: String::new(),
            qualifier: None,
            qualifiers: Vec::new(),
            inherit_parent_config: true,
            customizers: Vec::new(),
            async_customizers: Vec::new(),
        }
    }

    #[must_use]
    pub fn for_type<T: FeignTarget>(name: impl Into<String>) -> Self {
        Self::new(name, T::target())
    }

    #[must_use]
    pub fn for_async_type<T: AsyncFeignTarget>(name: impl Into<String>) -> Self {
        Self::new(name, T::target())
    }

    #[must_use]
    pub fn with_context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = context_id.into();
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    #[must_use]
    pub fn with_qualifiers<I, S>(mut self, qualifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.qualifiers = qualifiers.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_inherit_parent_config(mut self, inherit: bool) -> Self {
        self.inherit_parent_config = inherit;
        self
    }

    /// Customizer applied after the resolved chain, in insertion order.
    #[must_use]
    pub fn customizer(
        mut self,
        apply: impl Fn(BuilderDraft) -> BuilderDraft + Send + Sync + 'static,
    ) -> Self {
        self.customizers.push(CustomizerEntry::new(apply));
        self
    }

    /// Async counterpart of [`ClientDescriptor::customizer`].
    #[must_use]
    pub fn async_customizer(
        mut self,
        apply: impl Fn(AsyncBuilderDraft) -> AsyncBuilderDraft + Send + Sync + 'static,
    ) -> Self {
        self.async_customizers.push(CustomizerEntry::new(apply));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    #[must_use]
    pub fn target(&self) -> &TargetType {
        &self.target
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    #[must_use]
    pub fn qualifiers(&self) -> &[String] {
        &self.qualifiers
    }

    #[must_use]
    pub fn inherit_parent_config(&self) -> bool {
        self.inherit_parent_config
    }

    #[must_use]
    pub fn is_async(&self) -> bool {
        self.target.is_async()
    }

    #[must_use]
    pub fn customizers(&self) -> &[CustomizerEntry<BuilderDraft>] {
        &self.customizers
    }

    #[must_use]
    pub fn async_customizers(&self) -> &[CustomizerEntry<AsyncBuilderDraft>] {
        &self.async_customizers
    }

    /// Base URL the proxy calls: the url (or `http://<name>` when empty) with the
    /// path appended. Placeholders are left untouched.
    #[must_use]
    pub fn target_url(&self) -> String {
        let url = self.url.trim();
        let base = if url.is_empty() {
            format!("http://{}", self.name.trim())
        } else if url.contains("://") || url.contains("${") {
            url.to_owned()
        } else {
            format!("http://{url}")
        };
        format!("{}{}", base.trim_end_matches('/'), normalize_path(&self.path))
    }
}

impl fmt::Debug for ClientDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientDescriptor")
            .field("name", &self.name)
            .field("context_id", &self.context_id)
            .field("target", &self.target.name)
            .field("url", &self.url)
            .field("path", &self.path)
            .field("qualifier", &self.qualifier)
            .field("qualifiers", &self.qualifiers)
            .field("inherit_parent_config", &self.inherit_parent_config)
            .finish_non_exhaustive()
    }
}

/// `""` stays empty; otherwise a single leading `/` and no trailing `/`.
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::{AsyncDynamicClient, DynamicClient};

    #[test]
    fn for_type_defaults_url_and_path_to_empty() {
        let d = ClientDescriptor::for_type::<DynamicClient>("bar");

        assert_eq!(d.name(), "bar");
        assert_eq!(d.context_id(), "bar");
        assert_eq!(d.url(), "");
        assert_eq!(d.path(), "");
        assert!(d.inherit_parent_config());
        assert!(!d.is_async());
        assert_eq!(d.target().type_id(), TypeId::of::<DynamicClient>());
    }

    #[test]
    fn async_target_marks_descriptor_async() {
        let d = ClientDescriptor::for_async_type::<AsyncDynamicClient>("bar");
        assert!(d.is_async());
    }

    #[test]
    fn target_url_falls_back_to_service_id() {
        let d = ClientDescriptor::for_type::<DynamicClient>("localapp");
        assert_eq!(d.target_url(), "http://localapp");
    }

    #[test]
    fn target_url_adds_scheme_and_normalizes_path() {
        let d = ClientDescriptor::for_type::<DynamicClient>("foo")
            .with_url("localhost:8080/")
            .with_path("api/v1/");
        assert_eq!(d.target_url(), "http://localhost:8080/api/v1");

        let d = ClientDescriptor::for_type::<DynamicClient>("foo")
            .with_url("https://example.com")
            .with_path("/");
        assert_eq!(d.target_url(), "https://example.com");
    }

    #[test]
    fn target_url_keeps_placeholders() {
        let d = ClientDescriptor::for_type::<DynamicClient>("foo")
            .with_url("${feignClient.url:https://example.com}");
        assert_eq!(d.target_url(), "${feignClient.url:https://example.com}");
    }
}
