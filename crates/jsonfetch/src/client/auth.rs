//! Auth token attached to outgoing requests.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::config::defaults;
use crate::error::{ClientError, ClientResult};

/// Credentials installed with `set_auth_token`.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    token: String,
    header_name: String,
    use_bearer_prefix: bool,
}

impl AuthToken {
    /// `Authorization: Bearer <token>`.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::new(token, defaults::AUTH_HEADER, true)
    }

    /// Token sent under `header_name`, optionally prefixed with `Bearer `.
    #[must_use]
    pub fn new(
        token: impl Into<String>,
        header_name: impl Into<String>,
        use_bearer_prefix: bool,
    ) -> Self {
        Self { token: token.into(), header_name: header_name.into(), use_bearer_prefix }
    }

    /// Header that carries the token.
    #[must_use]
    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    /// Header value as sent on the wire.
    #[must_use]
    pub fn header_value(&self) -> String {
        if self.use_bearer_prefix {
            format!("Bearer {}", self.token)
        } else {
            self.token.clone()
        }
    }

    /// Set the auth header, replacing any value already present.
    pub(crate) fn apply(&self, headers: &mut HeaderMap) -> ClientResult<()> {
        let name = HeaderName::from_bytes(self.header_name.as_bytes())
            .map_err(|e| ClientError::invalid_header(&self.header_name, e))?;
        let mut value = HeaderValue::from_str(&self.header_value())
            .map_err(|e| ClientError::invalid_header(&self.header_name, e))?;
        value.set_sensitive(true);
        headers.insert(name, value);
        Ok(())
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("header_name", &self.header_name)
            .field("use_bearer_prefix", &self.use_bearer_prefix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::AUTHORIZATION;

    use super::*;

    #[test]
    fn test_bearer_default() {
        let auth = AuthToken::bearer("abc");
        assert_eq!(auth.header_name(), "Authorization");
        assert_eq!(auth.header_value(), "Bearer abc");
    }

    #[test]
    fn test_custom_header_without_prefix() {
        let auth = AuthToken::new("abc", "X-Token", false);
        let mut headers = HeaderMap::new();
        auth.apply(&mut headers).unwrap();
        assert_eq!(headers.get("x-token").unwrap(), "abc");
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_apply_replaces_existing_value() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic stale"));
        AuthToken::bearer("fresh").apply(&mut headers).unwrap();
        assert_eq!(headers.get_all(AUTHORIZATION).iter().count(), 1);
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer fresh");
    }

    #[test]
    fn test_invalid_header_name_is_an_error() {
        let mut headers = HeaderMap::new();
        let err = AuthToken::new("abc", "not valid", false).apply(&mut headers).unwrap_err();
        assert!(matches!(err, ClientError::InvalidHeader { .. }));
    }

    #[test]
    fn test_debug_hides_token() {
        let debug = format!("{:?}", AuthToken::bearer("super-secret"));
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("Authorization"));
    }
}
