//! jsonfetch
//!
//! A small JSON HTTP client facade over reqwest. One [`HttpClient`] per API:
//! it prefixes paths with a base URL, merges default headers, attaches an
//! auth token, spaces out requests, caches responses, runs request
//! middleware, and notifies handlers of every outcome.
//!
//! # Features
//!
//! - **Verb methods**: GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS, CONNECT, TRACE, COPY
//! - **Auth**: `Authorization: Bearer <token>` or any header, with or without prefix
//! - **Rate-limited**: minimum spacing between dispatches per client
//! - **Cached**: responses kept for a configurable lifetime, keyed by method and URL
//! - **Middleware**: sync or async transforms of outgoing request options
//! - **Events**: success/error callbacks
//!
//! No retries are performed; a failed attempt is returned to the caller as is.
//!
//! # Example
//!
//! ```no_run
//! use jsonfetch::{CallOptions, ClientConfig, HttpClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = HttpClient::new(ClientConfig::new("https://api.example.com"))?;
//!     client.set_auth_token("secret");
//!
//!     let user: serde_json::Value = client.get("/users/1", CallOptions::default()).await?;
//!     println!("{user}");
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use client::{
    CallOptions, HttpClient, Middleware, MultipartForm, RequestBody, RequestOptions,
};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use events::{ClientEvent, EventHandler};
