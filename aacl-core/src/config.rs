//! Client configuration.
//!
//! # Configuration File Format
//!
//! ```yaml
//! base_url: "https://vault.example.com"
//! timeout_secs: 10
//! user_agent: "my-app/1.2"
//! session_cookie: "session=eyJ1c2VyX2lkIjoiMTIzIn0"
//! ```
//!
//! Every field can be overridden from the environment:
//!
//! - `AACL_BASE_URL`
//! - `AACL_TIMEOUT_SECS`
//! - `AACL_USER_AGENT`
//! - `AACL_SESSION_COOKIE` (`name=value`)
//! - `AACL_BEARER_TOKEN`
//!
//! The file and `AACL_TIMEOUT_SECS` give the timeout in whole seconds;
//! [`ClientConfig::with_timeout`] takes any [`Duration`].
//!
//! Credentials are held as [`SecretString`] and are redacted from `Debug`
//! output.

use crate::error::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const ENV_BASE_URL: &str = "AACL_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "AACL_TIMEOUT_SECS";
pub const ENV_USER_AGENT: &str = "AACL_USER_AGENT";
pub const ENV_SESSION_COOKIE: &str = "AACL_SESSION_COOKIE";
pub const ENV_BEARER_TOKEN: &str = "AACL_BEARER_TOKEN";

/// Connection settings for one AACL server.
#[derive(Debug, Deserialize)]
pub struct ClientConfig {
    /// Server origin the `/aacl/...` endpoints are resolved against.
    pub base_url: String,
    /// Whole-request HTTP timeout. `None` leaves latency bounds to the caller.
    #[serde(default, rename = "timeout_secs", deserialize_with = "deserialize_secs")]
    pub timeout: Option<Duration>,
    /// User-Agent header sent on both endpoints.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Session cookie (`name=value`) seeded into the cookie jar.
    #[serde(default)]
    pub session_cookie: Option<SecretString>,
    /// Bearer token sent as `Authorization` on both endpoints.
    #[serde(default)]
    pub bearer_token: Option<SecretString>,
}

fn default_user_agent() -> String {
    format!("aacl/{}", env!("CARGO_PKG_VERSION"))
}

fn deserialize_secs<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
            user_agent: default_user_agent(),
            session_cookie: None,
            bearer_token: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(SecretString::new(cookie.into()));
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(SecretString::new(token.into()));
        self
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::Configuration(format!("invalid YAML: {}", e)))
    }

    /// Load configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Apply `AACL_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                Error::Configuration(format!(
                    "{} must be an integer, got '{}'",
                    ENV_TIMEOUT_SECS, raw
                ))
            })?;
            self.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(agent) = lookup(ENV_USER_AGENT) {
            self.user_agent = agent;
        }
        if let Some(cookie) = lookup(ENV_SESSION_COOKIE) {
            self.session_cookie = Some(SecretString::new(cookie));
        }
        if let Some(token) = lookup(ENV_BEARER_TOKEN) {
            self.bearer_token = Some(SecretString::new(token));
        }
        Ok(())
    }

    /// Check the configuration and return the parsed base URL.
    pub fn validate(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            Error::Configuration(format!("invalid base_url '{}': {}", self.base_url, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::Configuration(format!(
                "base_url scheme must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if url.cannot_be_a_base() {
            return Err(Error::Configuration(format!(
                "base_url '{}' cannot carry a path",
                self.base_url
            )));
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(Error::Configuration("timeout must be positive".into()));
        }
        if let Some(cookie) = &self.session_cookie {
            let cookie = cookie.expose_secret();
            match cookie.split_once('=') {
                Some((name, _)) if !name.trim().is_empty() => {}
                _ => {
                    return Err(Error::Configuration(
                        "session_cookie must have the form name=value".into(),
                    ))
                }
            }
        }

        Ok(url)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
