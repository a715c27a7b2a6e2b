//! Transport capability seam.
//!
//! The crate never talks to the network itself. A [`TransportProvider`] hands out a
//! blocking [`Client`] or an [`AsyncClient`] per client context; everything about
//! connection pools, TLS and protocol versions lives behind those traits and is
//! configured from [`crate::HttpClientProperties`] by the provider's owner.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{BoxError, FeignError};

/// Per-request transport options resolved from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub follow_redirects: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
            follow_redirects: true,
        }
    }
}

/// A fully expanded outbound request, as handed to the transport.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// A response as returned by the transport; the body is fully buffered.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    #[must_use]
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body as UTF-8 text (lossy).
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    /// Returns `FeignError::Decode` if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FeignError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Decode the body as JSON, mapping a 404 (only ever seen here when `decode404`
    /// is enabled) to `None`.
    ///
    /// # Errors
    /// Returns `FeignError::Decode` if a non-404 body is not valid JSON for `T`.
    pub fn json_opt<T: DeserializeOwned>(&self) -> Result<Option<T>, FeignError> {
        if self.status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        self.json().map(Some)
    }
}

/// Blocking transport used by synchronous proxies.
pub trait Client: Send + Sync {
    /// Execute one request.
    ///
    /// # Errors
    /// Any transport-level failure; the proxy wraps it in `FeignError::Transport`.
    fn execute(&self, request: Request, options: &RequestOptions) -> Result<Response, BoxError>;
}

/// Non-blocking transport used by asynchronous proxies.
#[async_trait]
pub trait AsyncClient: Send + Sync {
    /// Execute one request.
    ///
    /// # Errors
    /// Any transport-level failure; the proxy wraps it in `FeignError::Transport`.
    async fn execute(&self, request: Request, options: &RequestOptions)
    -> Result<Response, BoxError>;
}

/// Capability lookup the proxy factory depends on.
///
/// Failures are propagated by the factory unchanged (see
/// [`FeignError::CapabilityLookup`]); the factory never retries.
pub trait TransportProvider: Send + Sync {
    /// Blocking transport for the given client context.
    ///
    /// # Errors
    /// Whatever the provider fails with.
    fn client(&self, context_id: &str) -> Result<Arc<dyn Client>, BoxError>;

    /// Non-blocking transport for the given client context.
    ///
    /// # Errors
    /// Whatever the provider fails with.
    fn async_client(&self, context_id: &str) -> Result<Arc<dyn AsyncClient>, BoxError>;
}

/// Provider that hands out the same transports to every client context.
pub struct SharedTransport {
    client: Arc<dyn Client>,
    async_client: Arc<dyn AsyncClient>,
}

impl SharedTransport {
    #[must_use]
    pub fn new(client: Arc<dyn Client>, async_client: Arc<dyn AsyncClient>) -> Self {
        Self {
            client,
            async_client,
        }
    }
}

impl TransportProvider for SharedTransport {
    fn client(&self, _context_id: &str) -> Result<Arc<dyn Client>, BoxError> {
        Ok(Arc::clone(&self.client))
    }

    fn async_client(&self, _context_id: &str) -> Result<Arc<dyn AsyncClient>, BoxError> {
        Ok(Arc::clone(&self.async_client))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Hello {
        message: String,
    }

    #[test]
    fn json_opt_maps_not_found_to_none() {
        let resp = Response::new(StatusCode::NOT_FOUND, "<html>nope</html>");
        let decoded: Option<Hello> = resp.json_opt().unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn json_decodes_body() {
        let resp = Response::new(StatusCode::OK, r#"{"message":"hello world 1"}"#);
        let decoded: Hello = resp.json().unwrap();
        assert_eq!(decoded.message, "hello world 1");
    }

    #[test]
    fn json_reports_decode_errors() {
        let resp = Response::new(StatusCode::OK, "not json");
        let err = resp.json::<Hello>().unwrap_err();
        assert!(matches!(err, FeignError::Decode(_)));
    }

    #[test]
    fn default_options_follow_redirects() {
        let opts = RequestOptions::default();
        assert!(opts.follow_redirects);
        assert_eq!(opts.connect_timeout, Duration::from_secs(10));
        assert_eq!(opts.read_timeout, Duration::from_secs(60));
    }
}
