#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for the proxy factory

mod common;

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use common::{FailingProvider, LookupFailed, RecordingClient};
use feignkit::{
    AsyncDynamicClient, ClientDescriptor, ClientProxyFactory, ConfigFragment,
    ConfigurationResolver, ConfigurationStore, DynamicClient, EffectiveConfig,
    FeignClientsRegistrar, FeignError, LogLevel, RequestOptions, Scope,
};

#[test]
fn test_capability_lookup_failure_is_propagated_unchanged() {
    let factory = ClientProxyFactory::new(Arc::new(FailingProvider {
        message: "pool exhausted",
    }));
    let descriptor = ClientDescriptor::for_type::<DynamicClient>("foo");

    let err = factory
        .build(&descriptor, &EffectiveConfig::system_default("foo"))
        .unwrap_err();

    assert_eq!(err.to_string(), "pool exhausted");
    let FeignError::CapabilityLookup(inner) = err else {
        panic!("expected a capability lookup failure");
    };
    let original = inner.downcast_ref::<LookupFailed>().expect("original error type");
    assert_eq!(original.0, "pool exhausted");
}

#[test]
fn test_capability_lookup_failure_aborts_registration() {
    let registrar = FeignClientsRegistrar::new(
        Arc::new(ConfigurationStore::new()),
        Arc::new(FailingProvider { message: "down" }),
    );

    let err = registrar
        .register(&ClientDescriptor::for_async_type::<AsyncDynamicClient>("foo"))
        .unwrap_err();

    assert!(matches!(err, FeignError::CapabilityLookup(_)));
    assert!(err.source().is_none());
    assert!(registrar.registry().is_empty());
}

#[test]
fn test_defaults_flow_into_the_proxy() {
    let transport = RecordingClient::ok();
    let factory = ClientProxyFactory::new(common::shared(&transport));
    let descriptor = ClientDescriptor::for_type::<DynamicClient>("bar");

    let client = factory
        .build_typed::<DynamicClient>(&descriptor, &EffectiveConfig::system_default("bar"))
        .unwrap();
    let proxy = client.proxy();

    assert_eq!(proxy.context_id(), "bar");
    assert_eq!(proxy.base_url(), "http://bar");
    assert_eq!(proxy.log_level(), LogLevel::None);
    assert!(!proxy.is_decode404());
    assert_eq!(proxy.options(), RequestOptions::default());
    assert!(proxy.interceptor_names().is_empty());
}

#[test]
fn test_resolved_scalars_seed_the_draft() {
    let store = Arc::new(ConfigurationStore::new());
    store
        .put(
            Scope::client("bar"),
            ConfigFragment::new()
                .connect_timeout(Duration::from_millis(250))
                .follow_redirects(false)
                .log_level(LogLevel::Basic),
        )
        .unwrap();
    let resolver = ConfigurationResolver::new(store);
    let descriptor = ClientDescriptor::for_type::<DynamicClient>("bar");
    let config = resolver.resolve(&descriptor);

    let factory = ClientProxyFactory::new(common::shared(&RecordingClient::ok()));
    let client = factory
        .build_typed::<DynamicClient>(&descriptor, &config)
        .unwrap();

    let options = client.proxy().options();
    assert_eq!(options.connect_timeout, Duration::from_millis(250));
    assert_eq!(options.read_timeout, Duration::from_secs(60));
    assert!(!options.follow_redirects);
    assert_eq!(client.proxy().log_level(), LogLevel::Basic);
}

#[test]
fn test_building_as_the_wrong_adapter_fails() {
    let factory = ClientProxyFactory::new(common::shared(&RecordingClient::ok()));
    let descriptor = ClientDescriptor::for_type::<DynamicClient>("bar");

    let err = factory
        .build_async_typed::<AsyncDynamicClient>(
            &descriptor,
            &EffectiveConfig::system_default("bar"),
        )
        .unwrap_err();
    assert!(matches!(err, FeignError::TargetMismatch { .. }));
}
