//! SCIM HTTP client.
//!
//! [`ScimTransport`] is the swappable seam: it sends one fully-formed request
//! and returns the raw response. [`ScimClient`] sits on top and adds what every
//! SCIM call needs: base URL joining, SCIM content negotiation headers,
//! authorization, the 429 retry policy and a per-request timeout.
//!
//! The production transport is [`HttpTransport`] (reqwest); tests substitute
//! scripted or in-memory implementations.

mod http;
mod retry;
mod scim_client;

pub use http::HttpTransport;
pub use retry::{DEFAULT_RETRY_AFTER, MAX_RATE_LIMIT_RETRIES, RetryPolicy};
pub use scim_client::ScimClient;

use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

use crate::error::ClientError;

pub const SCIM_CONTENT_TYPE: &str = "application/scim+json";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Path of one resource, `endpoint/id`, with the server-assigned id
/// percent-encoded as a single path segment.
pub fn item_path(endpoint: &str, id: &str) -> String {
    let Ok(mut url) = Url::parse("http://scim.invalid/") else {
        return format!("{}/{}", endpoint, id);
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push(id);
    }
    format!("{}{}", endpoint.trim_end_matches('/'), url.path())
}

/// Replacement text for credential-bearing header values
pub const REDACTED: &str = "***REDACTED***";

const SENSITIVE_HEADERS: [&str; 3] = ["authorization", "proxy-authorization", "cookie"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered header list with case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, replacing any existing value with the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Merge `other` over `self`
    pub fn merged(&self, other: &Headers) -> Headers {
        let mut merged = self.clone();
        for (name, value) in other.iter() {
            merged.insert(name, value);
        }
        merged
    }

    /// Copy suitable for logs and reports: credential values replaced
    pub fn redacted(&self) -> BTreeMap<String, String> {
        self.iter()
            .map(|(name, value)| {
                let value = if SENSITIVE_HEADERS
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(name))
                {
                    REDACTED
                } else {
                    value
                };
                (name.to_string(), value.to_string())
            })
            .collect()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// A fully-formed request, ready for a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ScimRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Value>,
}

/// Raw response from a transport. The body is kept as text so that empty and
/// non-JSON bodies can be reported on.
#[derive(Debug, Clone, PartialEq)]
pub struct ScimResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: String,
}

impl ScimResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: String::new(),
        }
    }

    /// Response with a JSON body and the given content type
    pub fn json_with_type(status: u16, body: &Value, content_type: &str) -> Self {
        Self {
            status,
            headers: Headers::new().with("Content-Type", content_type),
            body: body.to_string(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    pub fn has_body(&self) -> bool {
        !self.body.trim().is_empty()
    }

    /// Parsed body; `None` when empty or not JSON
    pub fn json(&self) -> Option<Value> {
        if !self.has_body() {
            return None;
        }
        serde_json::from_str(&self.body).ok()
    }

    /// The `id` of a returned resource
    pub fn resource_id(&self) -> Option<String> {
        self.json()?
            .get("id")?
            .as_str()
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }
}

/// Sends a single HTTP request. Implementations must not retry; retries and
/// timeouts belong to [`ScimClient`].
pub trait ScimTransport: Send + Sync {
    fn send(
        &self,
        request: ScimRequest,
    ) -> impl Future<Output = Result<ScimResponse, ClientError>> + Send;
}
