//! Configuration for the jsonfetch client.

use std::env::VarError;
use std::time::Duration;

use anyhow::Context;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};

/// Default values.
pub mod defaults {
    use std::time::Duration;

    /// No spacing between requests unless asked for.
    pub const RATE_LIMIT_DELAY: Duration = Duration::from_millis(0);

    /// Cached responses stay fresh for one minute.
    pub const CACHE_LIFETIME: Duration = Duration::from_secs(60);

    /// Connection timeout.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Content type sent with every request unless overridden.
    pub const CONTENT_TYPE: &str = "application/json";

    /// Header that carries the auth token by default.
    pub const AUTH_HEADER: &str = "Authorization";

    /// User agent reported to servers.
    pub const USER_AGENT: &str = concat!("jsonfetch/", env!("CARGO_PKG_VERSION"));
}

/// Environment variables read by [`ClientConfig::from_env`].
pub mod env {
    /// Base URL, required.
    pub const BASE_URL: &str = "JSONFETCH_BASE_URL";

    /// Rate-limit delay in milliseconds.
    pub const RATE_LIMIT_MS: &str = "JSONFETCH_RATE_LIMIT_MS";

    /// Cache lifetime in milliseconds.
    pub const CACHE_LIFETIME_MS: &str = "JSONFETCH_CACHE_LIFETIME_MS";

    /// Bearer token attached to every request.
    pub const AUTH_TOKEN: &str = "JSONFETCH_AUTH_TOKEN";
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Prefix prepended verbatim to every request path.
    pub base_url: String,

    /// Headers sent with every request; per-call headers override them.
    pub default_headers: HeaderMap,

    /// Bearer token installed at construction (optional).
    pub auth_token: Option<String>,

    /// Minimum spacing between dispatches.
    pub rate_limit_delay: Duration,

    /// How long a cached response stays fresh.
    pub cache_lifetime: Duration,

    /// Transport-wide request timeout (optional).
    pub request_timeout: Option<Duration>,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// User agent.
    pub user_agent: String,
}

impl ClientConfig {
    /// Create a configuration for `base_url` with default settings.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            default_headers: default_headers(),
            auth_token: None,
            rate_limit_delay: defaults::RATE_LIMIT_DELAY,
            cache_lifetime: defaults::CACHE_LIFETIME,
            request_timeout: None,
            connect_timeout: defaults::CONNECT_TIMEOUT,
            user_agent: defaults::USER_AGENT.to_string(),
        }
    }

    /// Create a test configuration pointing at a mock server.
    #[must_use]
    pub fn for_testing(base_url: &str) -> Self {
        Self {
            rate_limit_delay: Duration::from_millis(0), // No delay in tests
            cache_lifetime: Duration::from_secs(0),     // No caching in tests
            request_timeout: Some(Duration::from_secs(5)),
            connect_timeout: Duration::from_secs(2),
            ..Self::new(base_url)
        }
    }

    /// Set the auth token.
    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set the rate-limit delay.
    #[must_use]
    pub fn with_rate_limit_delay(mut self, delay: Duration) -> Self {
        self.rate_limit_delay = delay;
        self
    }

    /// Set the cache lifetime.
    #[must_use]
    pub fn with_cache_lifetime(mut self, lifetime: Duration) -> Self {
        self.cache_lifetime = lifetime;
        self
    }

    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is missing, a value is not valid
    /// unicode, or a number does not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name))
    }

    /// Create configuration from variables resolved by `lookup`.
    ///
    /// `lookup` has the contract of [`std::env::var`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_env`].
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let base_url = lookup(env::BASE_URL)
            .with_context(|| format!("{} must be set", env::BASE_URL))?;

        let mut config = Self::new(base_url);

        if let Some(delay) = millis_from(&lookup, env::RATE_LIMIT_MS)? {
            config.rate_limit_delay = delay;
        }
        if let Some(lifetime) = millis_from(&lookup, env::CACHE_LIFETIME_MS)? {
            config.cache_lifetime = lifetime;
        }
        config.auth_token = optional(&lookup, env::AUTH_TOKEN)?;

        Ok(config)
    }

    /// Check if an auth token is configured.
    #[must_use]
    pub const fn has_auth_token(&self) -> bool {
        self.auth_token.is_some()
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(defaults::CONTENT_TYPE));
    headers
}

/// Unset is `None`; a value that is not unicode is an error, never a silent default.
fn optional<F>(lookup: &F, name: &str) -> anyhow::Result<Option<String>>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    match lookup(name) {
        Ok(raw) => Ok(Some(raw)),
        Err(VarError::NotPresent) => Ok(None),
        Err(err @ VarError::NotUnicode(_)) => {
            Err(anyhow::Error::new(err).context(format!("{name} must be valid unicode")))
        }
    }
}

fn millis_from<F>(lookup: &F, name: &str) -> anyhow::Result<Option<Duration>>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let Some(raw) = optional(lookup, name)? else {
        return Ok(None);
    };
    let millis: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{name} must be a whole number of milliseconds"))?;
    Ok(Some(Duration::from_millis(millis)))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::ffi::OsString;

    use super::*;

    fn lookup_in(
        vars: &[(&'static str, &'static str)],
    ) -> impl Fn(&str) -> Result<String, VarError> {
        let vars: HashMap<_, _> = vars.iter().copied().collect();
        move |name: &str| vars.get(name).map(|v| (*v).to_string()).ok_or(VarError::NotPresent)
    }

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::new("https://api.example.com");
        assert_eq!(config.base_url, "https://api.example.com");
        assert!(!config.has_auth_token());
        assert_eq!(config.rate_limit_delay, defaults::RATE_LIMIT_DELAY);
        assert_eq!(config.cache_lifetime, defaults::CACHE_LIFETIME);
        assert_eq!(
            config.default_headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
    }

    #[test]
    fn test_config_for_testing_disables_delay_and_cache() {
        let config = ClientConfig::for_testing("http://127.0.0.1:1");
        assert_eq!(config.rate_limit_delay, Duration::ZERO);
        assert_eq!(config.cache_lifetime, Duration::ZERO);
        assert_eq!(config.base_url, "http://127.0.0.1:1");
    }

    #[test]
    fn test_config_builders() {
        let config = ClientConfig::new("https://x")
            .with_auth_token("abc")
            .with_rate_limit_delay(Duration::from_millis(250))
            .with_cache_lifetime(Duration::from_secs(5));
        assert_eq!(config.auth_token.as_deref(), Some("abc"));
        assert_eq!(config.rate_limit_delay, Duration::from_millis(250));
        assert_eq!(config.cache_lifetime, Duration::from_secs(5));
    }

    #[test]
    fn test_user_agent_names_crate() {
        assert!(defaults::USER_AGENT.starts_with("jsonfetch/"));
    }

    #[test]
    fn test_from_lookup_reads_every_variable() {
        let config = ClientConfig::from_lookup(lookup_in(&[
            (env::BASE_URL, "https://api.example.com"),
            (env::RATE_LIMIT_MS, "250"),
            (env::CACHE_LIFETIME_MS, " 5000 "),
            (env::AUTH_TOKEN, "tok"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.rate_limit_delay, Duration::from_millis(250));
        assert_eq!(config.cache_lifetime, Duration::from_secs(5));
        assert_eq!(config.auth_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_from_lookup_keeps_defaults_when_unset() {
        let config = ClientConfig::from_lookup(lookup_in(&[(env::BASE_URL, "https://x")])).unwrap();

        assert_eq!(config.rate_limit_delay, defaults::RATE_LIMIT_DELAY);
        assert_eq!(config.cache_lifetime, defaults::CACHE_LIFETIME);
        assert!(!config.has_auth_token());
    }

    #[test]
    fn test_from_lookup_requires_base_url() {
        let err = ClientConfig::from_lookup(lookup_in(&[])).unwrap_err();
        assert!(err.to_string().contains(env::BASE_URL));
    }

    #[test]
    fn test_from_lookup_rejects_bad_number() {
        let err = ClientConfig::from_lookup(lookup_in(&[
            (env::BASE_URL, "https://x"),
            (env::RATE_LIMIT_MS, "abc"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(env::RATE_LIMIT_MS));

        let err = ClientConfig::from_lookup(lookup_in(&[
            (env::BASE_URL, "https://x"),
            (env::CACHE_LIFETIME_MS, "-1"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(env::CACHE_LIFETIME_MS));
    }

    #[test]
    fn test_from_lookup_rejects_non_unicode_value() {
        for bad in [env::RATE_LIMIT_MS, env::CACHE_LIFETIME_MS, env::AUTH_TOKEN] {
            let lookup = |name: &str| match name {
                env::BASE_URL => Ok("https://x".to_string()),
                n if n == bad => Err(VarError::NotUnicode(OsString::from("5"))),
                _ => Err(VarError::NotPresent),
            };

            let err = ClientConfig::from_lookup(lookup).unwrap_err();
            assert!(err.to_string().contains(bad), "{bad}: {err}");
        }
    }
}
