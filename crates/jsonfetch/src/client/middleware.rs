//! Middleware for outgoing request options.
//!
//! Each middleware sees the options produced by the ones registered before it
//! and returns the next version, or `None` to leave them unchanged. The chain
//! runs before the auth header is attached, so middleware cannot strip it.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

use super::request::RequestOptions;
use crate::error::ClientResult;

/// Transforms request options before dispatch.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Return the next version of `options`, or `None` for no change.
    ///
    /// An error aborts the request and is reported like any other failure.
    async fn process(&self, options: &RequestOptions) -> ClientResult<Option<RequestOptions>>;
}

/// Middleware backed by a synchronous closure.
pub struct FnMiddleware<F> {
    f: F,
}

/// Wrap a closure as middleware.
pub fn from_fn<F>(f: F) -> FnMiddleware<F>
where
    F: Fn(&RequestOptions) -> Option<RequestOptions> + Send + Sync,
{
    FnMiddleware { f }
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&RequestOptions) -> Option<RequestOptions> + Send + Sync,
{
    async fn process(&self, options: &RequestOptions) -> ClientResult<Option<RequestOptions>> {
        Ok((self.f)(options))
    }
}

/// Middleware backed by an async closure.
pub struct AsyncFnMiddleware<F> {
    f: F,
}

/// Wrap an async closure as middleware. The closure receives its own copy of the options.
pub fn from_async_fn<F, Fut>(f: F) -> AsyncFnMiddleware<F>
where
    F: Fn(RequestOptions) -> Fut + Send + Sync,
    Fut: Future<Output = ClientResult<Option<RequestOptions>>> + Send,
{
    AsyncFnMiddleware { f }
}

#[async_trait]
impl<F, Fut> Middleware for AsyncFnMiddleware<F>
where
    F: Fn(RequestOptions) -> Fut + Send + Sync,
    Fut: Future<Output = ClientResult<Option<RequestOptions>>> + Send,
{
    async fn process(&self, options: &RequestOptions) -> ClientResult<Option<RequestOptions>> {
        (self.f)(options.clone()).await
    }
}

/// Sets a fixed header on every request.
#[derive(Debug, Clone)]
pub struct SetHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl SetHeader {
    /// Create a header-setting middleware.
    #[must_use]
    pub const fn new(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }
}

#[async_trait]
impl Middleware for SetHeader {
    async fn process(&self, options: &RequestOptions) -> ClientResult<Option<RequestOptions>> {
        Ok(Some(options.with_header(self.name.clone(), self.value.clone())))
    }
}

/// Ordered list of middleware.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    /// Create an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware.
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// Number of registered middlewares.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Thread `options` through every middleware in registration order.
    pub async fn apply(&self, options: RequestOptions) -> ClientResult<RequestOptions> {
        let mut current = options;
        for middleware in &self.middlewares {
            if let Some(next) = middleware.process(&current).await? {
                current = next;
            }
        }
        Ok(current)
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain").field("len", &self.len()).finish()
    }
}
