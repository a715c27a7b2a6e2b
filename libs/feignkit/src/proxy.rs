//! Callable client proxies.
//!
//! A proxy is the frozen result of one build: the customized builder state plus the
//! (possibly capability-enriched) transport. Adapters generated by
//! [`crate::feign_client!`] dispatch every method to [`ClientProxy::execute`] or
//! [`AsyncClientProxy::submit`]; both share the same request preparation and response
//! handling.
//!
//! Proxies are immutable and cheap to clone. Async calls each get their own
//! cancellation token, so cancelling one [`CallHandle`] never affects another call.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::customizer::BuilderDraft;
use crate::descriptor::TargetType;
use crate::error::{BoxError, FeignError};
use crate::fragment::{LogLevel, RequestInterceptor};
use crate::transport::{AsyncClient, Client, Request, RequestOptions, Response};

const CALL_TARGET: &str = "feignkit::call";
const BODY_PREVIEW_CHARS: usize = 256;

/// Metadata of one adapter method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMeta {
    name: Cow<'static, str>,
    method: Method,
    path: Cow<'static, str>,
}

impl MethodMeta {
    /// `path` may contain `{var}` segments filled from [`CallArgs::path_var`].
    #[must_use]
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        method: Method,
        path: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            name: name.into(),
            method,
            path: path.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Per-call arguments.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    path_vars: Vec<(String, String)>,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<Bytes>,
}

impl CallArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn path_var(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.path_vars.push((name.into(), value.to_string()));
        self
    }

    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// JSON-encode `value` as the body and set `content-type`.
    ///
    /// # Errors
    /// Returns `FeignError::Decode` if `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, FeignError> {
        let body = serde_json::to_vec(value)?;
        Ok(self
            .header(http::header::CONTENT_TYPE.as_str(), "application/json")
            .body(body))
    }
}

/// Immutable builder state shared by every call of one proxy.
struct ClientSnapshot {
    context_id: String,
    base_url: String,
    log_level: LogLevel,
    decode404: bool,
    options: RequestOptions,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
    capabilities: Vec<String>,
    default_headers: HeaderMap,
}

impl ClientSnapshot {
    fn freeze(
        context_id: &str,
        base_url: String,
        draft: &BuilderDraft,
        decode404: bool,
    ) -> Result<Self, FeignError> {
        Ok(Self {
            context_id: context_id.to_owned(),
            base_url,
            log_level: draft.log_level(),
            decode404,
            options: draft.options(),
            interceptors: draft.request_interceptors().to_vec(),
            capabilities: draft
                .capabilities()
                .iter()
                .map(|c| c.name().to_owned())
                .collect(),
            default_headers: header_map(draft.default_headers())?,
        })
    }

    fn prepare(&self, meta: &MethodMeta, args: CallArgs) -> Result<Request, FeignError> {
        let mut url = format!("{}{}", self.base_url, expand_path(&meta.path, &args.path_vars));
        if !args.query.is_empty() {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&args.query)
                .finish();
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&query);
        }

        let mut headers = self.default_headers.clone();
        for (name, value) in &header_map(&args.headers)? {
            headers.append(name.clone(), value.clone());
        }

        let mut request = Request {
            method: meta.method.clone(),
            url,
            headers,
            body: args.body,
        };
        for interceptor in &self.interceptors {
            interceptor.apply(&mut request);
        }
        self.log_request(meta, &request);
        Ok(request)
    }

    fn finish(
        &self,
        meta: &MethodMeta,
        method: Method,
        url: String,
        started: Instant,
        outcome: Result<Response, BoxError>,
    ) -> Result<Response, FeignError> {
        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                if self.log_level != LogLevel::None {
                    tracing::debug!(
                        target: CALL_TARGET,
                        client = %self.context_id,
                        method = meta.name(),
                        error = %e,
                        "<-- transport error"
                    );
                }
                return Err(FeignError::Transport(e));
            }
        };
        self.log_response(meta, &response, started);

        if response.is_success() || (self.decode404 && response.status == StatusCode::NOT_FOUND) {
            return Ok(response);
        }
        Err(FeignError::Status {
            status: response.status,
            method,
            url,
            body_preview: response.text().chars().take(BODY_PREVIEW_CHARS).collect(),
        })
    }

    fn log_request(&self, meta: &MethodMeta, request: &Request) {
        match self.log_level {
            LogLevel::None => {}
            LogLevel::Basic => tracing::debug!(
                target: CALL_TARGET,
                client = %self.context_id,
                method = meta.name(),
                "--> {} {}",
                request.method,
                request.url
            ),
            LogLevel::Headers => tracing::debug!(
                target: CALL_TARGET,
                client = %self.context_id,
                method = meta.name(),
                headers = ?request.headers,
                "--> {} {}",
                request.method,
                request.url
            ),
            LogLevel::Full => tracing::debug!(
                target: CALL_TARGET,
                client = %self.context_id,
                method = meta.name(),
                headers = ?request.headers,
                body_bytes = request.body.as_ref().map_or(0, Bytes::len),
                "--> {} {}",
                request.method,
                request.url
            ),
        }
    }

    fn log_response(&self, meta: &MethodMeta, response: &Response, started: Instant) {
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match self.log_level {
            LogLevel::None => {}
            LogLevel::Basic => tracing::debug!(
                target: CALL_TARGET,
                client = %self.context_id,
                method = meta.name(),
                elapsed_ms,
                "<-- {}",
                response.status
            ),
            LogLevel::Headers => tracing::debug!(
                target: CALL_TARGET,
                client = %self.context_id,
                method = meta.name(),
                elapsed_ms,
                headers = ?response.headers,
                "<-- {}",
                response.status
            ),
            LogLevel::Full => tracing::debug!(
                target: CALL_TARGET,
                client = %self.context_id,
                method = meta.name(),
                elapsed_ms,
                headers = ?response.headers,
                body_bytes = response.body.len(),
                "<-- {}",
                response.status
            ),
        }
    }
}

fn header_map(pairs: &[(String, String)]) -> Result<HeaderMap, FeignError> {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let invalid = || FeignError::InvalidHeader { name: name.clone() };
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        headers.append(header_name, header_value);
    }
    Ok(headers)
}

fn expand_path(template: &str, vars: &[(String, String)]) -> String {
    vars.iter().fold(template.to_owned(), |path, (name, value)| {
        let encoded: String = url::form_urlencoded::byte_serialize(value.as_bytes()).collect();
        path.replace(&format!("{{{name}}}"), &encoded.replace('+', "%20"))
    })
}

/// Blocking client proxy.
#[derive(Clone)]
pub struct ClientProxy {
    snapshot: Arc<ClientSnapshot>,
    client: Arc<dyn Client>,
}

impl ClientProxy {
    pub(super) fn new(
        context_id: &str,
        base_url: String,
        draft: &BuilderDraft,
        client: Arc<dyn Client>,
    ) -> Result<Self, FeignError> {
        let snapshot = ClientSnapshot::freeze(context_id, base_url, draft, draft.is_decode404())?;
        Ok(Self {
            snapshot: Arc::new(snapshot),
            client,
        })
    }

    /// Run one call on the current thread.
    ///
    /// # Errors
    /// - `FeignError::InvalidHeader` for an unusable per-call header
    /// - `FeignError::Transport` if the transport fails
    /// - `FeignError::Status` for a non-2xx answer (404 passes when `decode404` is on)
    pub fn execute(&self, meta: &MethodMeta, args: CallArgs) -> Result<Response, FeignError> {
        let request = self.snapshot.prepare(meta, args)?;
        let (method, url) = (request.method.clone(), request.url.clone());
        let started = Instant::now();
        let outcome = self.client.execute(request, &self.snapshot.options);
        self.snapshot.finish(meta, method, url, started, outcome)
    }

    #[must_use]
    pub fn context_id(&self) -> &str {
        &self.snapshot.context_id
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.snapshot.base_url
    }

    #[must_use]
    pub fn log_level(&self) -> LogLevel {
        self.snapshot.log_level
    }

    #[must_use]
    pub fn is_decode404(&self) -> bool {
        self.snapshot.decode404
    }

    #[must_use]
    pub fn options(&self) -> RequestOptions {
        self.snapshot.options
    }

    #[must_use]
    pub fn interceptor_names(&self) -> Vec<&str> {
        self.snapshot.interceptors.iter().map(|i| i.name()).collect()
    }

    #[must_use]
    pub fn capability_names(&self) -> &[String] {
        &self.snapshot.capabilities
    }

    #[must_use]
    pub fn default_headers(&self) -> &HeaderMap {
        &self.snapshot.default_headers
    }
}

impl fmt::Debug for ClientProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientProxy")
            .field("context_id", &self.snapshot.context_id)
            .field("base_url", &self.snapshot.base_url)
            .field("log_level", &self.snapshot.log_level)
            .field("decode404", &self.snapshot.decode404)
            .finish_non_exhaustive()
    }
}

/// Non-blocking client proxy.
#[derive(Clone)]
pub struct AsyncClientProxy {
    snapshot: Arc<ClientSnapshot>,
    client: Arc<dyn AsyncClient>,
}

impl AsyncClientProxy {
    pub(super) fn new(
        context_id: &str,
        base_url: String,
        draft: &BuilderDraft,
        decode404: bool,
        client: Arc<dyn AsyncClient>,
    ) -> Result<Self, FeignError> {
        let snapshot = ClientSnapshot::freeze(context_id, base_url, draft, decode404)?;
        Ok(Self {
            snapshot: Arc::new(snapshot),
            client,
        })
    }

    /// Run one call to completion.
    ///
    /// # Errors
    /// Same as [`ClientProxy::execute`].
    pub async fn call(&self, meta: &MethodMeta, args: CallArgs) -> Result<Response, FeignError> {
        let request = self.snapshot.prepare(meta, args)?;
        let (method, url) = (request.method.clone(), request.url.clone());
        let started = Instant::now();
        let outcome = self.client.execute(request, &self.snapshot.options).await;
        self.snapshot.finish(meta, method, url, started, outcome)
    }

    /// Spawn one call onto the current tokio runtime and return its handle.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    #[must_use]
    pub fn submit(&self, meta: &MethodMeta, args: CallArgs) -> CallHandle {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let proxy = self.clone();
        let meta = meta.clone();

        let task = tokio::spawn(async move {
            tokio::select! {
                () = cancelled.cancelled() => {
                    tracing::debug!(
                        target: CALL_TARGET,
                        client = %proxy.snapshot.context_id,
                        method = meta.name(),
                        "call cancelled"
                    );
                    Err(FeignError::Cancelled)
                }
                result = proxy.call(&meta, args) => result,
            }
        });
        CallHandle { token, task }
    }

    #[must_use]
    pub fn context_id(&self) -> &str {
        &self.snapshot.context_id
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.snapshot.base_url
    }

    #[must_use]
    pub fn log_level(&self) -> LogLevel {
        self.snapshot.log_level
    }

    #[must_use]
    pub fn is_decode404(&self) -> bool {
        self.snapshot.decode404
    }

    #[must_use]
    pub fn options(&self) -> RequestOptions {
        self.snapshot.options
    }

    #[must_use]
    pub fn interceptor_names(&self) -> Vec<&str> {
        self.snapshot.interceptors.iter().map(|i| i.name()).collect()
    }

    #[must_use]
    pub fn capability_names(&self) -> &[String] {
        &self.snapshot.capabilities
    }
}

impl fmt::Debug for AsyncClientProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncClientProxy")
            .field("context_id", &self.snapshot.context_id)
            .field("base_url", &self.snapshot.base_url)
            .field("log_level", &self.snapshot.log_level)
            .field("decode404", &self.snapshot.decode404)
            .finish_non_exhaustive()
    }
}

/// Handle to one outstanding async call.
#[derive(Debug)]
pub struct CallHandle {
    token: CancellationToken,
    task: JoinHandle<Result<Response, FeignError>>,
}

impl CallHandle {
    /// Cancel this call only.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for the call to finish.
    ///
    /// # Errors
    /// `FeignError::Cancelled` if the call was cancelled before it completed, otherwise
    /// whatever the call failed with.
    pub async fn result(self) -> Result<Response, FeignError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(FeignError::Cancelled),
            Err(e) => Err(FeignError::Transport(Box::new(e))),
        }
    }
}

/// Adapter type built from a blocking proxy.
pub trait FeignTarget: Send + Sync + Sized + 'static {
    fn target() -> TargetType;

    fn from_proxy(proxy: ClientProxy) -> Self;
}

/// Adapter type built from a non-blocking proxy.
pub trait AsyncFeignTarget: Send + Sync + Sized + 'static {
    fn target() -> TargetType;

    fn from_proxy(proxy: AsyncClientProxy) -> Self;
}

/// Untyped blocking client: method and path are given per call.
#[derive(Debug, Clone)]
pub struct DynamicClient {
    proxy: ClientProxy,
}

impl DynamicClient {
    /// # Errors
    /// Same as [`ClientProxy::execute`].
    pub fn call(&self, method: Method, path: &str, args: CallArgs) -> Result<Response, FeignError> {
        self.proxy
            .execute(&MethodMeta::new("call", method, path.to_owned()), args)
    }

    #[must_use]
    pub fn proxy(&self) -> &ClientProxy {
        &self.proxy
    }
}

impl FeignTarget for DynamicClient {
    fn target() -> TargetType {
        TargetType::sync::<Self>(Vec::new())
    }

    fn from_proxy(proxy: ClientProxy) -> Self {
        Self { proxy }
    }
}

/// Untyped non-blocking client.
#[derive(Debug, Clone)]
pub struct AsyncDynamicClient {
    proxy: AsyncClientProxy,
}

impl AsyncDynamicClient {
    #[must_use]
    pub fn submit(&self, method: Method, path: &str, args: CallArgs) -> CallHandle {
        self.proxy
            .submit(&MethodMeta::new("call", method, path.to_owned()), args)
    }

    #[must_use]
    pub fn proxy(&self) -> &AsyncClientProxy {
        &self.proxy
    }
}

impl AsyncFeignTarget for AsyncDynamicClient {
    fn target() -> TargetType {
        TargetType::asynchronous::<Self>(Vec::new())
    }

    fn from_proxy(proxy: AsyncClientProxy) -> Self {
        Self { proxy }
    }
}
