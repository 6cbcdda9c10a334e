//! Transport to the issuing/validating server.
//!
//! Two endpoints make up the whole wire contract:
//!
//! - `POST /aacl/issue/{intent}` returns a [`Grammar`].
//! - `POST /aacl/execute` takes an [`ExecuteRequest`] and returns a JSON
//!   result whose shape belongs to the server.
//!
//! Both calls carry the session credentials. [`HttpTransport`] keeps a
//! cookie jar, so a session cookie seeded from configuration or set by the
//! server rides along on every request.

use crate::binder::Payload;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::grammar::{Grammar, GrammarId};
use crate::{EXECUTE_PATH, ISSUE_PATH};
use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Body of an execution request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub grammar_id: GrammarId,
    pub payload: Payload,
}

/// The two server round-trips a session depends on.
///
/// Implementations report issuer failures as [`Error::GrammarFetch`] and
/// execution failures as [`Error::Transmission`]. Neither call retries.
#[async_trait]
pub trait GrammarTransport: Send + Sync {
    /// Ask the issuer for a fresh grammar for `intent`.
    async fn fetch_grammar(&self, intent: &str) -> Result<Grammar>;

    /// Submit a bound payload, returning the server's JSON result verbatim.
    async fn execute(&self, request: &ExecuteRequest) -> Result<Value>;
}

/// reqwest-backed transport.
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    bearer_token: Option<SecretString>,
}

impl HttpTransport {
    /// Build a transport from validated configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = config.validate()?;

        let jar = Jar::default();
        if let Some(cookie) = &config.session_cookie {
            jar.add_cookie_str(cookie.expose_secret(), &base_url);
        }

        let mut builder = Client::builder()
            .cookie_provider(Arc::new(jar))
            .user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            Error::Configuration(format!("failed to create HTTP client: {}", e))
        })?;

        let bearer_token = config
            .bearer_token
            .as_ref()
            .map(|token| SecretString::new(token.expose_secret().clone()));

        Ok(Self {
            client,
            base_url,
            bearer_token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/aacl/issue/{intent}`, with `intent` encoded as one segment.
    pub fn issue_url(&self, intent: &str) -> Result<Url> {
        let mut segments: Vec<&str> = ISSUE_PATH.split('/').collect();
        segments.push(intent);
        self.endpoint(&segments)
    }

    /// `{base}/aacl/execute`.
    pub fn execute_url(&self) -> Result<Url> {
        let segments: Vec<&str> = EXECUTE_PATH.split('/').collect();
        self.endpoint(&segments)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                Error::Configuration(format!("base_url '{}' cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn post(&self, url: Url) -> reqwest::RequestBuilder {
        let request = self.client.post(url);
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }
}

#[async_trait]
impl GrammarTransport for HttpTransport {
    async fn fetch_grammar(&self, intent: &str) -> Result<Grammar> {
        let fetch_error = |reason: String, status: Option<u16>| Error::GrammarFetch {
            intent: intent.to_string(),
            reason,
            status,
        };

        let url = self.issue_url(intent)?;
        let response = self
            .post(url)
            .send()
            .await
            .map_err(|e| fetch_error(format!("network error: {}", e), None))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(fetch_error(
                format!("issuer returned {}: {}", status, body),
                Some(status.as_u16()),
            ));
        }

        let grammar: Grammar = response.json().await.map_err(|e| {
            fetch_error(format!("malformed grammar: {}", e), Some(status.as_u16()))
        })?;

        debug!(
            intent = %intent,
            grammar_id = %grammar.grammar_id,
            required_keys = grammar.required_keys.len(),
            "Grammar received from issuer"
        );
        Ok(grammar)
    }

    async fn execute(&self, request: &ExecuteRequest) -> Result<Value> {
        let url = self.execute_url()?;
        let response = self
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Transmission(format!("network error: {}", e)))?;

        let status = response.status();
        let result: Value = response.json().await.map_err(|e| {
            Error::Transmission(format!("malformed response (status {}): {}", status, e))
        })?;

        if !status.is_success() {
            warn!(
                grammar_id = %request.grammar_id,
                status = %status,
                "Execution endpoint answered with a non-success status"
            );
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(&ClientConfig::new(base)).unwrap()
    }

    #[test]
    fn test_endpoint_urls() {
        let t = transport("http://localhost:8000");
        assert_eq!(
            t.issue_url("TRANSFER_MONEY").unwrap().as_str(),
            "http://localhost:8000/aacl/issue/TRANSFER_MONEY"
        );
        assert_eq!(
            t.execute_url().unwrap().as_str(),
            "http://localhost:8000/aacl/execute"
        );
    }

    #[test]
    fn test_endpoint_urls_keep_base_path() {
        let t = transport("https://vault.example.com/app/");
        assert_eq!(
            t.issue_url("transfer").unwrap().as_str(),
            "https://vault.example.com/app/aacl/issue/transfer"
        );

        let t = transport("https://vault.example.com/app");
        assert_eq!(
            t.execute_url().unwrap().as_str(),
            "https://vault.example.com/app/aacl/execute"
        );
    }

    #[test]
    fn test_intent_is_a_single_encoded_segment() {
        let t = transport("http://localhost:8000");
        let url = t.issue_url("../execute?x=1").unwrap();
        assert_eq!(url.path_segments().unwrap().count(), 3);
        assert!(url.query().is_none());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = HttpTransport::new(&ClientConfig::new("localhost")).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_execute_request_wire_shape() {
        let payload: Payload =
            serde_json::from_value(json!({"entropy": "e", "intent": "t", "state": "s"})).unwrap();
        let request = ExecuteRequest {
            grammar_id: GrammarId::new("g1"),
            payload,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"grammar_id": "g1", "payload": {"entropy": "e", "intent": "t", "state": "s"}})
        );
    }
}
