//! reqwest-backed transport.

use log::debug;
use std::time::Duration;

use super::{Headers, HttpMethod, ScimRequest, ScimResponse, ScimTransport};
use crate::config::ClientConfig;
use crate::error::{ClientError, ScimError, ScimResult};

/// Production transport over a pooled reqwest client.
///
/// TLS verification, CA bundle and proxy are fixed when the transport is
/// built. Request bodies are serialized here and sent with whatever
/// `Content-Type` the request carries; the transport never overrides it.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> ScimResult<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("scim-conformance/", env!("CARGO_PKG_VERSION")));

        if !config.verify_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(path) = &config.ca_bundle {
            let pem = std::fs::read(path)?;
            let certificate = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                ScimError::configuration(format!(
                    "invalid CA bundle {}: {}",
                    path.display(),
                    e
                ))
            })?;
            builder = builder.add_root_certificate(certificate);
        }

        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| ScimError::configuration(format!("invalid proxy URL: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| ScimError::configuration(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }
}

fn to_reqwest(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

impl ScimTransport for HttpTransport {
    async fn send(&self, request: ScimRequest) -> Result<ScimResponse, ClientError> {
        let ScimRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let failure = |message: String| ClientError::Transport {
            method: method.to_string(),
            url: url.clone(),
            message,
        };

        let mut builder = self.client.request(to_reqwest(method), url.as_str());
        for (name, value) in headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = &body {
            let bytes = serde_json::to_vec(body).map_err(|e| failure(e.to_string()))?;
            builder = builder.body(bytes);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout {
                    method: method.to_string(),
                    url: url.clone(),
                    timeout: self.timeout,
                }
            } else {
                failure(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await.map_err(|e| failure(e.to_string()))?;

        debug!("{} {} -> {}", method, url, status);

        Ok(ScimResponse {
            status,
            headers,
            body,
        })
    }
}
