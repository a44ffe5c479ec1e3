//! Outgoing request options and the helpers that assemble them.

use std::time::Duration;

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde::Serialize;

use crate::error::{ClientError, ClientResult};

/// Request options threaded through the middleware chain.
///
/// The URL is fixed before middleware runs and is not part of the options.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Request method.
    pub method: Method,

    /// Headers to send.
    pub headers: HeaderMap,

    /// Request body.
    pub body: RequestBody,
}

impl RequestOptions {
    /// Create options with no body.
    #[must_use]
    pub fn new(method: Method, headers: HeaderMap) -> Self {
        Self { method, headers, body: RequestBody::Empty }
    }

    /// Header value as a string, if present and visible ASCII.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Return a copy with `name` set to `value`.
    ///
    /// Handy inside closure middlewares that build the next version of the options.
    #[must_use]
    pub fn with_header(&self, name: HeaderName, value: HeaderValue) -> Self {
        let mut next = self.clone();
        next.headers.insert(name, value);
        next
    }
}

/// Body of an outgoing request.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// Serialized JSON text.
    Json(String),
    /// Multipart form; the transport writes the boundary header.
    Multipart(MultipartForm),
}

impl RequestBody {
    /// Serialize `data` to JSON text.
    pub fn json<B: Serialize + ?Sized>(data: &B) -> ClientResult<Self> {
        serde_json::to_string(data).map(Self::Json).map_err(ClientError::Encode)
    }

    /// Returns true for multipart bodies.
    #[must_use]
    pub const fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart(_))
    }
}

/// Multipart form payload.
///
/// Kept as plain data so request options stay cloneable; converted to a
/// reqwest form only at dispatch.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    parts: Vec<(String, FormPart)>,
}

/// One field of a [`MultipartForm`].
#[derive(Debug, Clone)]
pub enum FormPart {
    /// Plain text field.
    Text(String),
    /// File upload.
    File {
        /// File contents.
        data: Vec<u8>,
        /// File name reported to the server.
        file_name: Option<String>,
        /// MIME type, e.g. `image/png`.
        mime: Option<String>,
    },
}

impl MultipartForm {
    /// Create an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push((name.into(), FormPart::Text(value.into())));
        self
    }

    /// Add a file field.
    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        data: impl Into<Vec<u8>>,
        file_name: impl Into<String>,
    ) -> Self {
        self.parts.push((
            name.into(),
            FormPart::File { data: data.into(), file_name: Some(file_name.into()), mime: None },
        ));
        self
    }

    /// Add a file field with an explicit MIME type.
    #[must_use]
    pub fn file_with_mime(
        mut self,
        name: impl Into<String>,
        data: impl Into<Vec<u8>>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
    ) -> Self {
        self.parts.push((
            name.into(),
            FormPart::File {
                data: data.into(),
                file_name: Some(file_name.into()),
                mime: Some(mime.into()),
            },
        ));
        self
    }

    /// Fields in insertion order.
    pub fn parts(&self) -> impl Iterator<Item = (&str, &FormPart)> {
        self.parts.iter().map(|(name, part)| (name.as_str(), part))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns true if the form has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub(crate) fn into_reqwest(self) -> ClientResult<Form> {
        let mut form = Form::new();
        for (name, part) in self.parts {
            form = match part {
                FormPart::Text(value) => form.text(name, value),
                FormPart::File { data, file_name, mime } => {
                    let mut part = Part::bytes(data);
                    if let Some(file_name) = file_name {
                        part = part.file_name(file_name);
                    }
                    if let Some(mime) = mime {
                        part = part.mime_str(&mime)?;
                    }
                    form.part(name, part)
                }
            };
        }
        Ok(form)
    }
}

/// Per-call options accepted by every verb.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Headers that override the client's defaults for this call.
    pub headers: HeaderMap,

    /// Cancel the network operation after this long.
    pub timeout: Option<Duration>,

    /// Do not attach the configured auth token.
    pub skip_auth: bool,
}

impl CallOptions {
    /// Create empty call options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Add a header from strings.
    pub fn try_header(self, name: &str, value: &str) -> ClientResult<Self> {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ClientError::invalid_header(name, e))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|e| ClientError::invalid_header(name, e))?;
        Ok(self.header(header_name, header_value))
    }

    /// Set the timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Suppress the auth header for this call.
    #[must_use]
    pub fn without_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }
}

/// Join base URL and path by plain concatenation.
#[must_use]
pub fn join_url(base_url: &str, path: &str) -> String {
    let mut url = String::with_capacity(base_url.len() + path.len());
    url.push_str(base_url);
    url.push_str(path);
    url
}

/// Cache key for a request: `METHOD:url`.
#[must_use]
pub fn cache_key(method: &Method, url: &str) -> String {
    format!("{}:{}", method.as_str(), url)
}

/// Merge default headers with per-call headers; per-call values replace defaults.
#[must_use]
pub fn assemble_headers(defaults: &HeaderMap, overrides: &HeaderMap) -> HeaderMap {
    let mut headers = defaults.clone();
    for name in overrides.keys() {
        headers.remove(name);
        for value in overrides.get_all(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use reqwest::header::{ACCEPT, CONTENT_TYPE};

    use super::*;

    fn defaults() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    #[test]
    fn test_join_url_is_plain_concatenation() {
        assert_eq!(join_url("https://x", "/y"), "https://x/y");
        assert_eq!(join_url("https://x/", "/y"), "https://x//y");
        assert_eq!(join_url("", "/y"), "/y");
    }

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key(&Method::GET, "https://x/y"), "GET:https://x/y");
        assert_eq!(cache_key(&Method::DELETE, "https://x/y"), "DELETE:https://x/y");
    }

    #[test]
    fn test_assemble_headers_keeps_defaults() {
        let headers = assemble_headers(&defaults(), &HeaderMap::new());
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_assemble_headers_overrides_defaults() {
        let mut overrides = HeaderMap::new();
        overrides.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        overrides.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let headers = assemble_headers(&defaults(), &overrides);
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
        assert_eq!(headers.get_all(CONTENT_TYPE).iter().count(), 1);
    }

    #[test]
    fn test_assemble_headers_keeps_multi_valued_overrides() {
        let mut overrides = HeaderMap::new();
        overrides.append(ACCEPT, HeaderValue::from_static("application/json"));
        overrides.append(ACCEPT, HeaderValue::from_static("text/plain"));

        let headers = assemble_headers(&defaults(), &overrides);
        assert_eq!(headers.get_all(ACCEPT).iter().count(), 2);
    }

    #[test]
    fn test_json_body() {
        let body = RequestBody::json(&serde_json::json!({"a": 1})).unwrap();
        match body {
            RequestBody::Json(text) => assert_eq!(text, r#"{"a":1}"#),
            other => panic!("unexpected body: {other:?}"),
        }
        assert!(!RequestBody::Empty.is_multipart());
    }

    #[test]
    fn test_multipart_form_builder() {
        let form = MultipartForm::new()
            .text("title", "report")
            .file_with_mime("upload", b"hello".to_vec(), "hello.txt", "text/plain");
        assert_eq!(form.len(), 2);
        let names: Vec<&str> = form.parts().map(|(name, _)| name).collect();
        assert_eq!(names, ["title", "upload"]);
        assert!(RequestBody::Multipart(form.clone()).is_multipart());
        assert!(form.into_reqwest().is_ok());
    }

    #[test]
    fn test_multipart_form_rejects_bad_mime() {
        let form = MultipartForm::new().file_with_mime("f", vec![1, 2], "f.bin", "not a mime");
        assert!(form.into_reqwest().is_err());
    }

    #[test]
    fn test_call_options_builder() {
        let call = CallOptions::new()
            .try_header("X-Trace", "1")
            .unwrap()
            .timeout(Duration::from_millis(10))
            .without_auth();
        assert_eq!(call.headers.get("x-trace").unwrap(), "1");
        assert_eq!(call.timeout, Some(Duration::from_millis(10)));
        assert!(call.skip_auth);
    }

    #[test]
    fn test_call_options_rejects_bad_header() {
        assert!(CallOptions::new().try_header("bad header", "v").is_err());
        assert!(CallOptions::new().try_header("X-Ok", "line\nbreak").is_err());
    }

    #[test]
    fn test_request_options_with_header() {
        let options = RequestOptions::new(Method::GET, defaults());
        let next = options.with_header(ACCEPT, HeaderValue::from_static("*/*"));
        assert_eq!(next.header("accept"), Some("*/*"));
        assert_eq!(options.header("accept"), None);
    }
}
