//! Server connection configuration
//!
//! An [`HttpConfiguration`] names the SystemLink server and the credentials
//! to use. It can be loaded from a YAML or JSON file, or from the
//! `SYSTEMLINK_HTTP_URI` / `SYSTEMLINK_API_KEY` environment variables.

use crate::auth::AuthConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig, RetryPolicy};
use crate::types::{BackoffType, OptionStringExt};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Environment variable holding the server URI
pub const ENV_HTTP_URI: &str = "SYSTEMLINK_HTTP_URI";

/// Environment variable holding the API key
pub const ENV_API_KEY: &str = "SYSTEMLINK_API_KEY";

/// Environment variable holding the default workspace
pub const ENV_WORKSPACE: &str = "SYSTEMLINK_WORKSPACE";

// ============================================================================
// HttpConfiguration
// ============================================================================

/// Connection settings for a SystemLink server
#[derive(Clone, Serialize, Deserialize)]
pub struct HttpConfiguration {
    /// Base URI of the server, e.g. `https://myserver.example.com`
    pub server_uri: String,

    /// API key sent in the `x-ntc-api-key` header
    #[serde(default)]
    pub api_key: Option<String>,

    /// OAuth access token, used when no API key is set
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Basic-auth username, used when no API key or token is set
    #[serde(default)]
    pub username: Option<String>,

    /// Basic-auth password
    #[serde(default)]
    pub password: Option<String>,

    /// Default workspace for created resources
    #[serde(default)]
    pub workspace: Option<String>,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retry settings for transient failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// Client-side rate limit, disabled when absent
    #[serde(default)]
    pub rate_limit: Option<RateLimiterConfig>,

    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_timeout_ms() -> u64 {
    60_000
}

/// Retry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retries per request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff strategy between attempts
    #[serde(default)]
    pub backoff: BackoffType,

    /// Initial backoff in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff: BackoffType::default(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl HttpConfiguration {
    /// Create a configuration for a server with an API key
    pub fn new(server_uri: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            server_uri: server_uri.into(),
            api_key: Some(api_key.into()),
            bearer_token: None,
            username: None,
            password: None,
            workspace: None,
            timeout_ms: default_timeout_ms(),
            retry: RetryConfig::default(),
            rate_limit: None,
            user_agent: None,
        }
    }

    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let server_uri = lookup(ENV_HTTP_URI)
            .none_if_empty()
            .ok_or_else(|| Error::missing_field(ENV_HTTP_URI))?;

        let mut config = Self::new(server_uri, String::new());
        config.api_key = lookup(ENV_API_KEY).none_if_empty();
        config.workspace = lookup(ENV_WORKSPACE).none_if_empty();
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML or JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let contents = std::fs::read_to_string(path)?;
        debug!("Loading server configuration from {}", path.display());
        Self::from_str(&contents)
    }

    /// Parse from a YAML or JSON string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        let uri = url::Url::parse(&self.server_uri)?;
        if !matches!(uri.scheme(), "http" | "https") {
            return Err(Error::InvalidConfigValue {
                field: "server_uri".to_string(),
                message: format!("unsupported scheme '{}'", uri.scheme()),
            });
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(Error::missing_field("username"));
        }
        Ok(())
    }

    /// Credentials to attach to every request
    pub fn auth(&self) -> AuthConfig {
        if let Some(key) = &self.api_key {
            return AuthConfig::api_key(key.clone());
        }
        if let Some(token) = &self.bearer_token {
            return AuthConfig::Bearer {
                token: token.clone(),
            };
        }
        match &self.username {
            Some(username) => AuthConfig::Basic {
                username: username.clone(),
                password: self.password.clone().unwrap_or_default(),
            },
            None => AuthConfig::None,
        }
    }

    /// HTTP transport settings
    pub fn http_client_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .base_url(self.server_uri.trim_end_matches('/'))
            .timeout(Duration::from_millis(self.timeout_ms))
            .retry(RetryPolicy {
                max_retries: self.retry.max_retries,
                backoff: self.retry.backoff,
                initial_delay: Duration::from_millis(self.retry.initial_backoff_ms),
                max_delay: Duration::from_millis(self.retry.max_backoff_ms),
            });

        builder = match &self.rate_limit {
            Some(limit) => builder.rate_limit(limit.clone()),
            None => builder.no_rate_limit(),
        };

        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.clone());
        }

        builder.build()
    }
}

// Credentials stay out of logs.
impl std::fmt::Debug for HttpConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConfiguration")
            .field("server_uri", &self.server_uri)
            .field("has_api_key", &self.api_key.is_some())
            .field("has_bearer_token", &self.bearer_token.is_some())
            .field("username", &self.username)
            .field("workspace", &self.workspace)
            .field("timeout_ms", &self.timeout_ms)
            .field("retry", &self.retry)
            .field("rate_limit", &self.rate_limit)
            .finish_non_exhaustive()
    }
}
