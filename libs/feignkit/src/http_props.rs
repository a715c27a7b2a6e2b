//! Pass-through settings for whoever builds the transports.
//!
//! Nothing in this crate reads these values to make a decision; they are loaded with
//! the rest of the configuration and handed to the [`crate::TransportProvider`] owner.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection pool and protocol settings for the HTTP transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpClientProperties {
    pub disable_ssl_validation: bool,
    pub max_connections: usize,
    pub max_connections_per_route: usize,
    #[serde(with = "crate::humantime_serde")]
    pub time_to_live: Duration,
    pub follow_redirects: bool,
    #[serde(with = "crate::humantime_serde")]
    pub connection_timeout: Duration,
    #[serde(with = "crate::humantime_serde")]
    pub connection_timer_repeat: Duration,
    pub async_pool: AsyncPoolProperties,
}

impl Default for HttpClientProperties {
    fn default() -> Self {
        Self {
            disable_ssl_validation: false,
            max_connections: 200,
            max_connections_per_route: 50,
            time_to_live: Duration::from_secs(900),
            follow_redirects: true,
            connection_timeout: Duration::from_millis(2000),
            connection_timer_repeat: Duration::from_millis(3000),
            async_pool: AsyncPoolProperties::default(),
        }
    }
}

/// Settings specific to the non-blocking transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AsyncPoolProperties {
    pub pool_concurrency_policy: PoolConcurrencyPolicy,
    pub pool_reuse_policy: PoolReusePolicy,
    #[serde(with = "crate::humantime_serde")]
    pub response_timeout: Duration,
    pub http_version_policy: HttpVersionPolicy,
}

impl Default for AsyncPoolProperties {
    fn default() -> Self {
        Self {
            pool_concurrency_policy: PoolConcurrencyPolicy::Strict,
            pool_reuse_policy: PoolReusePolicy::Fifo,
            response_timeout: Duration::from_secs(5),
            http_version_policy: HttpVersionPolicy::ForceHttp1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolConcurrencyPolicy {
    /// Connection limits are enforced exactly
    #[default]
    Strict,
    /// Limits may be exceeded briefly under contention
    Lax,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolReusePolicy {
    /// Least recently used connection first
    #[default]
    Fifo,
    /// Most recently used connection first
    Lifo,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HttpVersionPolicy {
    #[default]
    ForceHttp1,
    ForceHttp2,
    Negotiate,
}
