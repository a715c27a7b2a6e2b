#![allow(dead_code)]

//! Fake transports shared by the integration tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use feignkit::http::StatusCode;
use feignkit::{
    AsyncClient, BoxError, Client, ConfigurationStore, FeignClientsRegistrar, Request,
    RequestOptions, Response, SharedTransport, TransportProvider,
};
use parking_lot::Mutex;

/// Answers every request with a fixed status and remembers what it was sent.
pub struct RecordingClient {
    status: StatusCode,
    body: &'static str,
    seen: Mutex<Vec<Request>>,
}

impl RecordingClient {
    pub fn new(status: StatusCode, body: &'static str) -> Arc<Self> {
        Arc::new(Self {
            status,
            body,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn ok() -> Arc<Self> {
        Self::new(StatusCode::OK, "{}")
    }

    pub fn requests(&self) -> Vec<Request> {
        self.seen.lock().clone()
    }

    pub fn last(&self) -> Request {
        self.seen.lock().last().cloned().expect("no request recorded")
    }
}

impl Client for RecordingClient {
    fn execute(&self, request: Request, _options: &RequestOptions) -> Result<Response, BoxError> {
        self.seen.lock().push(request);
        Ok(Response::new(self.status, self.body))
    }
}

#[async_trait]
impl AsyncClient for RecordingClient {
    async fn execute(
        &self,
        request: Request,
        _options: &RequestOptions,
    ) -> Result<Response, BoxError> {
        self.seen.lock().push(request);
        Ok(Response::new(self.status, self.body))
    }
}

/// Async transport that sleeps before answering any URL containing `/slow`.
pub struct SlowAsyncClient {
    pub delay: Duration,
}

#[async_trait]
impl AsyncClient for SlowAsyncClient {
    async fn execute(
        &self,
        request: Request,
        _options: &RequestOptions,
    ) -> Result<Response, BoxError> {
        if request.url.contains("/slow") {
            tokio::time::sleep(self.delay).await;
        }
        Ok(Response::new(StatusCode::OK, request.url))
    }
}

/// Provider whose lookups always fail with the given error text.
pub struct FailingProvider {
    pub message: &'static str,
}

#[derive(Debug)]
pub struct LookupFailed(pub &'static str);

impl std::fmt::Display for LookupFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for LookupFailed {}

impl TransportProvider for FailingProvider {
    fn client(&self, _context_id: &str) -> Result<Arc<dyn Client>, BoxError> {
        Err(Box::new(LookupFailed(self.message)))
    }

    fn async_client(&self, _context_id: &str) -> Result<Arc<dyn AsyncClient>, BoxError> {
        Err(Box::new(LookupFailed(self.message)))
    }
}

pub fn shared(client: &Arc<RecordingClient>) -> Arc<SharedTransport> {
    Arc::new(SharedTransport::new(client.clone(), client.clone()))
}

pub fn registrar(store: Arc<ConfigurationStore>) -> (FeignClientsRegistrar, Arc<RecordingClient>) {
    let client = RecordingClient::ok();
    (FeignClientsRegistrar::new(store, shared(&client)), client)
}
