//! Configuration for the SCIM client and the conformance probe.
//!
//! [`ClientConfig`] holds transport settings, [`ProbeConfig`] the probe run
//! settings. Both are assembled and validated through [`ProbeConfigBuilder`].

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::client::RetryPolicy;
use crate::error::{ScimError, ScimResult};
use crate::schema::ResourceKind;

/// Prefix for the names of every resource the probe creates
pub const TEST_PREFIX: &str = "scim-sanity-test-";

/// Upper bound on agents created by the rapid lifecycle phase
pub const MAX_RAPID_AGENTS: usize = 10;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Delay before re-sending a POST that failed with 500
pub const DEFAULT_TRANSIENT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Credentials sent in the `Authorization` header.
///
/// `Debug` never prints secret values.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    #[default]
    None,
    Bearer(String),
    Basic { username: String, password: String },
}

impl Credentials {
    pub fn authorization_header(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Bearer(token) => Some(format!("Bearer {}", token)),
            Self::Basic { username, password } => Some(format!(
                "Basic {}",
                STANDARD.encode(format!("{}:{}", username, password))
            )),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bearer(_) => f.write_str("Bearer(***REDACTED***)"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***REDACTED***")
                .finish(),
        }
    }
}

/// How protocol deviations that real servers commonly exhibit are graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Deviations fail
    #[default]
    Strict,
    /// Tolerable deviations warn
    Compat,
}

impl ValidationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Compat => "compat",
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport settings for talking to a SCIM server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// SCIM base URL, e.g. `https://scim.example.com/scim/v2`
    pub base_url: String,
    pub credentials: Credentials,
    pub verify_tls: bool,
    /// Extra PEM root certificates
    pub ca_bundle: Option<PathBuf>,
    pub proxy: Option<String>,
    /// Per-request timeout, applied to every transport call
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            credentials: Credentials::None,
            verify_tls: true,
            ca_bundle: None,
            proxy: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> ScimResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(ScimError::configuration("Base URL cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ScimError::configuration(
                "Base URL must start with http:// or https://",
            ));
        }

        if self.timeout.is_zero() {
            return Err(ScimError::configuration("Request timeout must be greater than zero"));
        }

        if let Some(proxy) = &self.proxy {
            if !proxy.contains("://") {
                return Err(ScimError::configuration(format!(
                    "Proxy '{}' must be a URL such as http://proxy:8080",
                    proxy
                )));
            }
        }

        Ok(())
    }

    /// Base URL with any embedded user-info removed, for reports
    pub fn display_target(&self) -> String {
        let Some((scheme, rest)) = self.base_url.split_once("://") else {
            return self.base_url.clone();
        };
        let (authority, path) = match rest.find('/') {
            Some(index) => rest.split_at(index),
            None => (rest, ""),
        };
        match authority.rsplit_once('@') {
            Some((_, host)) => format!("{}://{}{}", scheme, host, path),
            None => self.base_url.clone(),
        }
    }
}

/// Settings of one probe run.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub client: ClientConfig,
    pub mode: ValidationMode,
    /// Restrict lifecycle phases to one resource type
    pub resource_filter: Option<ResourceKind>,
    pub skip_cleanup: bool,
    /// The operator acknowledged that the probe creates and deletes data
    pub accept_side_effects: bool,
    pub rapid_agent_count: usize,
    /// Deadline for the whole run; cleanup still runs after it expires
    pub run_timeout: Option<Duration>,
    pub transient_retry_delay: Duration,
    pub name_prefix: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            mode: ValidationMode::Strict,
            resource_filter: None,
            skip_cleanup: false,
            accept_side_effects: false,
            rapid_agent_count: MAX_RAPID_AGENTS,
            run_timeout: None,
            transient_retry_delay: DEFAULT_TRANSIENT_RETRY_DELAY,
            name_prefix: TEST_PREFIX.to_string(),
        }
    }
}

impl ProbeConfig {
    pub fn builder(base_url: impl Into<String>) -> ProbeConfigBuilder {
        ProbeConfigBuilder::new(base_url)
    }

    /// Whether the lifecycle phase for `kind` is selected by the filter
    pub fn includes(&self, kind: ResourceKind) -> bool {
        self.resource_filter.is_none_or(|filter| filter == kind)
    }

    pub fn validate(&self) -> ScimResult<()> {
        self.client.validate()?;

        if self.rapid_agent_count > MAX_RAPID_AGENTS {
            return Err(ScimError::configuration(format!(
                "Rapid lifecycle count {} exceeds the maximum of {}",
                self.rapid_agent_count, MAX_RAPID_AGENTS
            )));
        }

        if self.name_prefix.trim().is_empty() {
            return Err(ScimError::configuration("Name prefix cannot be empty"));
        }

        if matches!(self.resource_filter, Some(ResourceKind::Unknown)) {
            return Err(ScimError::configuration(
                "Resource filter must name a concrete resource type",
            ));
        }

        Ok(())
    }
}

/// Builder for [`ProbeConfig`].
///
/// # Examples
///
/// ```rust
/// use scim_conformance::config::{ProbeConfig, ValidationMode};
/// use scim_conformance::schema::ResourceKind;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ProbeConfig::builder("https://scim.example.com/scim/v2")
///     .with_bearer_token("token")
///     .with_mode(ValidationMode::Compat)
///     .with_resource_filter(ResourceKind::User)
///     .accept_side_effects(true)
///     .build()?;
/// assert!(config.includes(ResourceKind::User));
/// assert!(!config.includes(ResourceKind::Group));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ProbeConfigBuilder {
    config: ProbeConfig,
    token: Option<String>,
    basic: Option<(String, String)>,
}

impl ProbeConfigBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut config = ProbeConfig::default();
        config.client.base_url = base_url.into();
        Self {
            config,
            token: None,
            basic: None,
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic = Some((username.into(), password.into()));
        self
    }

    pub fn with_tls_verification(mut self, verify: bool) -> Self {
        self.config.client.verify_tls = verify;
        self
    }

    pub fn with_ca_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.client.ca_bundle = Some(path.into());
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.client.proxy = Some(proxy.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.client.timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.config.client.retry = retry;
        self
    }

    pub fn with_mode(mut self, mode: ValidationMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn with_resource_filter(mut self, kind: ResourceKind) -> Self {
        self.config.resource_filter = Some(kind);
        self
    }

    pub fn skip_cleanup(mut self, skip: bool) -> Self {
        self.config.skip_cleanup = skip;
        self
    }

    pub fn accept_side_effects(mut self, accept: bool) -> Self {
        self.config.accept_side_effects = accept;
        self
    }

    pub fn with_rapid_agent_count(mut self, count: usize) -> Self {
        self.config.rapid_agent_count = count;
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.config.run_timeout = Some(timeout);
        self
    }

    pub fn with_transient_retry_delay(mut self, delay: Duration) -> Self {
        self.config.transient_retry_delay = delay;
        self
    }

    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.name_prefix = prefix.into();
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ScimError::Configuration`] for an empty or non-HTTP base URL,
    /// both bearer and basic credentials, a zero timeout, a malformed proxy
    /// or an out-of-range rapid lifecycle count.
    pub fn build(self) -> ScimResult<ProbeConfig> {
        let mut config = self.config;
        config.client.credentials = match (self.token, self.basic) {
            (Some(_), Some(_)) => {
                return Err(ScimError::configuration(
                    "Use either a bearer token or basic credentials, not both",
                ));
            }
            (Some(token), None) => Credentials::Bearer(token),
            (None, Some((username, password))) => Credentials::Basic { username, password },
            (None, None) => Credentials::None,
        };
        config.client.base_url = config.client.base_url.trim_end_matches('/').to_string();
        config.validate()?;
        Ok(config)
    }
}
