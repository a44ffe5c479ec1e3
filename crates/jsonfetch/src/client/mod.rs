//! JSON HTTP client.
//!
//! Provides an async request facade with:
//! - Default headers merged with per-call headers
//! - Token auth attached after middleware, so middleware cannot strip it
//! - Per-instance rate limiting (best-effort, see [`rate_limit`])
//! - In-memory response caching keyed by `METHOD:url`
//! - A middleware chain over outgoing request options
//! - Success/error events for every completed call

mod auth;
pub mod cache;
pub mod middleware;
pub mod rate_limit;
pub mod request;

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use auth::AuthToken;
pub use cache::{CacheEntry, ResponseCache};
pub use middleware::{Middleware, MiddlewareChain, SetHeader, from_async_fn, from_fn};
pub use rate_limit::{RateLimiter, now_millis};
pub use request::{CallOptions, FormPart, MultipartForm, RequestBody, RequestOptions};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::events::{ClientEvent, EventHandler, EventNotifier};
use request::{assemble_headers, cache_key, join_url};

/// WebDAV COPY.
static COPY: LazyLock<Method> =
    LazyLock::new(|| Method::from_bytes(b"COPY").expect("COPY is a valid method token"));

/// JSON HTTP client.
///
/// Cloning yields another handle to the same client: settings, cache,
/// middleware and handlers are shared.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<ClientState>,
}

struct ClientState {
    /// HTTP transport, optionally with reqwest-middleware layers.
    transport: ClientWithMiddleware,

    /// Prefix for every request path.
    base_url: String,

    /// Headers sent unless a call overrides them.
    default_headers: RwLock<HeaderMap>,

    /// Auth token (optional).
    auth: RwLock<Option<AuthToken>>,

    /// Dispatch spacing.
    rate_limiter: RateLimiter,

    /// Response cache.
    cache: ResponseCache,

    /// Request option middleware.
    middleware: RwLock<MiddlewareChain>,

    /// Success/error handlers.
    events: EventNotifier,
}

impl HttpClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails.
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .gzip(true);

        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let transport = ClientBuilder::new(builder.build()?).build();

        Ok(Self::with_transport(config, transport))
    }

    /// Create a client over a caller-built transport stack.
    ///
    /// Transport fields of `config` (timeouts, user agent) are ignored.
    #[must_use]
    pub fn with_transport(config: ClientConfig, transport: ClientWithMiddleware) -> Self {
        let state = ClientState {
            transport,
            base_url: config.base_url,
            default_headers: RwLock::new(config.default_headers),
            auth: RwLock::new(config.auth_token.map(AuthToken::bearer)),
            rate_limiter: RateLimiter::new(config.rate_limit_delay),
            cache: ResponseCache::new(config.cache_lifetime),
            middleware: RwLock::new(MiddlewareChain::new()),
            events: EventNotifier::new(),
        };

        Self { inner: Arc::new(state) }
    }

    /// Base URL every path is appended to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn set_auth_token(&self, token: impl Into<String>) {
        *self.inner.auth.write() = Some(AuthToken::bearer(token));
    }

    /// Send `token` under `header_name`, prefixed with `Bearer ` if asked.
    pub fn set_auth_token_with(
        &self,
        token: impl Into<String>,
        header_name: impl Into<String>,
        use_bearer_prefix: bool,
    ) {
        *self.inner.auth.write() = Some(AuthToken::new(token, header_name, use_bearer_prefix));
    }

    /// Stop sending the auth token.
    pub fn clear_auth_token(&self) {
        *self.inner.auth.write() = None;
    }

    /// Check if an auth token is configured.
    #[must_use]
    pub fn has_auth_token(&self) -> bool {
        self.inner.auth.read().is_some()
    }

    /// Add or replace a default header.
    pub fn set_default_header(&self, name: HeaderName, value: HeaderValue) {
        self.inner.default_headers.write().insert(name, value);
    }

    /// Current default headers.
    #[must_use]
    pub fn default_headers(&self) -> HeaderMap {
        self.inner.default_headers.read().clone()
    }

    /// Minimum spacing between dispatches.
    pub fn set_rate_limit_delay(&self, delay: Duration) {
        self.inner.rate_limiter.set_delay(delay);
    }

    /// Current dispatch spacing.
    #[must_use]
    pub fn rate_limit_delay(&self) -> Duration {
        self.inner.rate_limiter.delay()
    }

    /// Override the recorded time of the last dispatch (epoch milliseconds).
    pub fn set_last_request_timestamp(&self, timestamp: i64) {
        self.inner.rate_limiter.set_last_request(timestamp);
    }

    /// Epoch milliseconds of the last successful dispatch, `0` if none.
    #[must_use]
    pub fn last_request_timestamp(&self) -> i64 {
        self.inner.rate_limiter.last_request()
    }

    /// How long responses stay cached.
    pub fn set_cache_lifetime(&self, lifetime: Duration) {
        self.inner.cache.set_lifetime(lifetime);
    }

    /// Current cache lifetime.
    #[must_use]
    pub fn cache_lifetime(&self) -> Duration {
        self.inner.cache.lifetime()
    }

    /// Drop every cached response.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    /// Append a middleware. Returns `self` so registrations can be chained.
    pub fn use_middleware<M>(&self, middleware: M) -> &Self
    where
        M: Middleware + 'static,
    {
        self.inner.middleware.write().push(Arc::new(middleware));
        self
    }

    /// Register an event handler.
    pub fn add_event_handler(&self, handler: EventHandler) {
        self.inner.events.add(handler);
    }

    /// Unregister a handler previously passed to [`Self::add_event_handler`].
    ///
    /// Returns false if the handler was not registered.
    pub fn remove_event_handler(&self, handler: &EventHandler) -> bool {
        self.inner.events.remove(handler)
    }

    /// GET `path`.
    pub async fn get<T>(&self, path: &str, call: CallOptions) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, path, RequestBody::Empty, call).await
    }

    /// POST `data` as JSON to `path`.
    pub async fn post<T, B>(&self, path: &str, data: &B, call: CallOptions) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, RequestBody::json(data)?, call).await
    }

    /// POST a multipart form to `path`.
    pub async fn post_multipart<T>(
        &self,
        path: &str,
        form: MultipartForm,
        call: CallOptions,
    ) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, RequestBody::Multipart(form), call).await
    }

    /// PUT `data` as JSON to `path`.
    pub async fn put<T, B>(&self, path: &str, data: &B, call: CallOptions) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PUT, path, RequestBody::json(data)?, call).await
    }

    /// PUT a multipart form to `path`.
    pub async fn put_multipart<T>(
        &self,
        path: &str,
        form: MultipartForm,
        call: CallOptions,
    ) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.request(Method::PUT, path, RequestBody::Multipart(form), call).await
    }

    /// PATCH `data` as JSON to `path`.
    pub async fn patch<T, B>(&self, path: &str, data: &B, call: CallOptions) -> ClientResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PATCH, path, RequestBody::json(data)?, call).await
    }

    /// DELETE `path`.
    pub async fn delete<T>(&self, path: &str, call: CallOptions) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.request(Method::DELETE, path, RequestBody::Empty, call).await
    }

    /// HEAD `path`. The empty body decodes as JSON `null`.
    pub async fn head<T>(&self, path: &str, call: CallOptions) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.request(Method::HEAD, path, RequestBody::Empty, call).await
    }

    /// OPTIONS `path`.
    pub async fn options<T>(&self, path: &str, call: CallOptions) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.request(Method::OPTIONS, path, RequestBody::Empty, call).await
    }

    /// CONNECT `path`.
    pub async fn connect<T>(&self, path: &str, call: CallOptions) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.request(Method::CONNECT, path, RequestBody::Empty, call).await
    }

    /// TRACE `path`.
    pub async fn trace<T>(&self, path: &str, call: CallOptions) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.request(Method::TRACE, path, RequestBody::Empty, call).await
    }

    /// COPY `path`.
    pub async fn copy<T>(&self, path: &str, call: CallOptions) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        self.request(COPY.clone(), path, RequestBody::Empty, call).await
    }

    /// Send a request and decode the JSON response.
    ///
    /// Every failure is logged, reported to the error handlers once, and
    /// returned unchanged.
    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
        call: CallOptions,
    ) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        let url = join_url(&self.inner.base_url, path);

        match self.execute(&method, &url, body, call).await {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::error!(method = %method, url = %url, error = %err, "Request failed");
                self.inner.events.emit(&ClientEvent::Error(&err));
                Err(err)
            }
        }
    }

    async fn execute<T>(
        &self,
        method: &Method,
        url: &str,
        body: RequestBody,
        call: CallOptions,
    ) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        let state = &self.inner;

        // Rate limit
        state.rate_limiter.throttle().await;

        // Check cache
        let key = cache_key(method, url);
        if let Some(cached) = state.cache.lookup_at(&key, now_millis()).await {
            tracing::debug!(key = %key, "Serving cached response");
            let typed = decode_value(&cached)?;
            state.events.emit(&ClientEvent::Success(&cached));
            return Ok(typed);
        }

        let headers = assemble_headers(&state.default_headers.read(), &call.headers);
        let chain = state.middleware.read().clone();
        let mut options =
            chain.apply(RequestOptions { method: method.clone(), headers, body }).await?;

        // Let the transport write the multipart boundary header
        if options.body.is_multipart() {
            options.headers.remove(CONTENT_TYPE);
        }

        if !call.skip_auth {
            let auth = state.auth.read().clone();
            if let Some(auth) = auth {
                auth.apply(&mut options.headers)?;
            }
        }

        let value = match call.timeout {
            Some(limit) => tokio::time::timeout(limit, self.send(url, options))
                .await
                .map_err(|_| ClientError::Timeout(limit))??,
            None => self.send(url, options).await?,
        };

        let typed = decode_value(&value)?;

        // Cache response
        state.cache.store_at(key, value.clone(), now_millis()).await;
        state.events.emit(&ClientEvent::Success(&value));
        state.rate_limiter.set_last_request(now_millis());

        Ok(typed)
    }

    /// Dispatch over the transport and decode the body as JSON.
    async fn send(&self, url: &str, options: RequestOptions) -> ClientResult<Value> {
        let RequestOptions { method, headers, body } = options;
        tracing::debug!(method = %method, url, "Dispatching request");

        let builder = self.inner.transport.request(method.clone(), url).headers(headers);
        let builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(text) => builder.body(text),
            RequestBody::Multipart(form) => builder.multipart(form.into_reqwest()?),
        };

        let response = builder.send().await.map_err(ClientError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ClientError::status_error(status.as_u16(), &method, url, text));
        }

        let bytes = response.bytes().await?;
        decode_body(&bytes)
    }
}

/// Decode a response body; an empty body decodes as `null`.
fn decode_body(bytes: &[u8]) -> ClientResult<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(ClientError::Decode)
}

fn decode_value<T: DeserializeOwned>(value: &Value) -> ClientResult<T> {
    T::deserialize(value).map_err(ClientError::Decode)
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.inner.base_url)
            .field("has_auth_token", &self.has_auth_token())
            .field("rate_limit_delay", &self.rate_limit_delay())
            .field("cache_lifetime", &self.cache_lifetime())
            .finish_non_exhaustive()
    }
}
