//! HTTP client for the domain reputation API.
//!
//! The service is queried with `GET {base_url}{domain}` and a token
//! `Authorization` header. A 200 answer carries a JSON object with the
//! domain's `reputation` and `categories`; an object carrying an `error`
//! field is the service's way of reporting a failure as data.

use super::ReputationLookup;
use crate::error::StressError;
use crate::types::{StressConfig, Verdict};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Reputation API client.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct ReputationClient {
    /// HTTP client for making reputation requests
    http_client: reqwest::Client,
    /// Base URL the domain is appended to
    base_url: String,
    /// Value of the `Authorization: Token ...` header
    auth_token: String,
    /// Timeout for each request
    timeout: Duration,
}

impl ReputationClient {
    /// Create a new client with custom settings.
    pub fn new<U: Into<String>, T: Into<String>>(
        base_url: U,
        auth_token: T,
        timeout: Duration,
    ) -> Result<Self, StressError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                StressError::network_with_source(
                    "Failed to create reputation HTTP client",
                    e.to_string(),
                )
            })?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            auth_token: auth_token.into(),
            timeout,
        })
    }

    /// Create a client from a run configuration.
    pub fn from_config(config: &StressConfig) -> Result<Self, StressError> {
        Self::new(
            config.api_url.clone(),
            config.auth_token.clone(),
            config.request_timeout,
        )
    }

    /// URL queried for `domain`.
    pub fn url_for(&self, domain: &str) -> String {
        format!("{}{}", self.base_url, domain)
    }

    async fn fetch(&self, domain: &str) -> Result<Verdict, StressError> {
        let url = self.url_for(domain);
        debug!(%url, "requesting reputation");

        let response = self
            .http_client
            .get(&url)
            .header(AUTHORIZATION, format!("Token {}", self.auth_token))
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StressError::Http {
                domain: domain.to_string(),
                status: status.as_u16(),
            });
        }

        let json = response
            .json::<Value>()
            .await
            .map_err(|e| StressError::parse(format!("Invalid JSON for '{}': {}", domain, e)))?;

        verdict_from_json(domain, json)
    }

    fn map_transport_error(&self, err: reqwest::Error) -> StressError {
        if err.is_timeout() {
            StressError::timeout("reputation request", self.timeout)
        } else {
            err.into()
        }
    }
}

#[async_trait]
impl ReputationLookup for ReputationClient {
    async fn lookup(&self, domain: &str) -> Result<Verdict, StressError> {
        self.fetch(domain).await
    }
}

/// Turn a decoded response body into a verdict.
///
/// An object with an `error` field is reported as [`StressError::Reported`];
/// anything that is not a JSON object is a parse error.
pub fn verdict_from_json(domain: &str, json: Value) -> Result<Verdict, StressError> {
    let Value::Object(mut body) = json else {
        return Err(StressError::parse(format!(
            "Expected a JSON object for '{}'",
            domain
        )));
    };

    if let Some(error) = body.remove("error") {
        let message = match error {
            Value::String(s) => s,
            other => other.to_string(),
        };
        return Err(StressError::reported(domain, message));
    }

    Ok(Verdict {
        reputation: body.remove("reputation").filter(|v| !v.is_null()),
        categories: body.remove("categories").filter(|v| !v.is_null()),
    })
}
