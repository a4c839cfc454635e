//! Verb-level SCIM client with retry and timeout handling.

use log::{debug, warn};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use super::{
    Headers, HttpMethod, RetryPolicy, SCIM_CONTENT_TYPE, ScimRequest, ScimResponse,
    ScimTransport,
};
use crate::config::{ClientConfig, Credentials};
use crate::error::ClientError;

/// SCIM client over a transport.
///
/// Every request carries `Accept` and `Content-Type: application/scim+json`
/// plus the configured `Authorization`. A 429 response is retried according to
/// the [`RetryPolicy`]; every attempt is bounded by the per-request timeout.
pub struct ScimClient<T> {
    transport: T,
    base_url: String,
    credentials: Credentials,
    retry: RetryPolicy,
    timeout: Duration,
}

impl<T: ScimTransport> ScimClient<T> {
    pub fn new(transport: T, config: &ClientConfig) -> Self {
        Self {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials: config.credentials.clone(),
            retry: config.retry,
            timeout: config.timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Headers sent with every request, credentials included
    pub fn default_headers(&self) -> Headers {
        let mut headers = Headers::new()
            .with("Accept", SCIM_CONTENT_TYPE)
            .with("Content-Type", SCIM_CONTENT_TYPE);
        if let Some(authorization) = self.credentials.authorization_header() {
            headers.insert("Authorization", authorization);
        }
        headers
    }

    pub async fn get(&self, path: &str) -> Result<ScimResponse, ClientError> {
        self.execute(HttpMethod::Get, path, None, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<ScimResponse, ClientError> {
        self.execute(HttpMethod::Post, path, Some(body), None).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<ScimResponse, ClientError> {
        self.execute(HttpMethod::Put, path, Some(body), None).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<ScimResponse, ClientError> {
        self.execute(HttpMethod::Patch, path, Some(body), None).await
    }

    pub async fn delete(&self, path: &str) -> Result<ScimResponse, ClientError> {
        self.execute(HttpMethod::Delete, path, None, None).await
    }

    /// Send a request, overriding default headers with `extra`.
    pub async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        extra: Option<&Headers>,
    ) -> Result<ScimResponse, ClientError> {
        let url = self.url(path);
        let headers = match extra {
            Some(extra) => self.default_headers().merged(extra),
            None => self.default_headers(),
        };
        let request = ScimRequest {
            method,
            url: url.clone(),
            headers,
            body: body.cloned(),
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!("{} {} (attempt {})", method, path, attempt);

            let response =
                match tokio::time::timeout(self.timeout, self.transport.send(request.clone()))
                    .await
                {
                    Ok(result) => result?,
                    Err(_) => {
                        warn!("{} {} timed out after {:?}", method, path, self.timeout);
                        return Err(ClientError::Timeout {
                            method: method.to_string(),
                            url,
                            timeout: self.timeout,
                        });
                    }
                };

            if response.status != 429 {
                debug!("{} {} -> {}", method, path, response.status);
                return Ok(response);
            }

            if attempt >= self.retry.max_attempts() {
                warn!(
                    "{} {} still rate limited after {} attempts, giving up",
                    method, path, attempt
                );
                return Err(ClientError::RateLimitExhausted {
                    method: method.to_string(),
                    url,
                    attempts: attempt,
                });
            }

            let delay = self.retry.delay_for(response.header("Retry-After"));
            warn!(
                "{} {} rate limited (429), retrying in {:.1}s",
                method,
                path,
                delay.as_secs_f64()
            );
            tokio::time::sleep(delay).await;
        }
    }
}

impl<T> fmt::Debug for ScimClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScimClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("timeout", &self.timeout)
            .finish()
    }
}
