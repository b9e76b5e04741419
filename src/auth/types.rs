//! Auth configuration types

/// Header SystemLink reads the API key from
pub const API_KEY_HEADER: &str = "x-ntc-api-key";

/// Authentication configuration
#[derive(Clone, Default)]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// API key sent in a header
    ApiKey {
        /// Header name, `x-ntc-api-key` when unset
        header_name: Option<String>,
        /// The API key value
        value: String,
    },

    /// HTTP Basic authentication
    Basic {
        /// Username
        username: String,
        /// Password
        password: String,
    },

    /// Bearer token authentication
    Bearer {
        /// The bearer token
        token: String,
    },
}

impl AuthConfig {
    /// SystemLink API key authentication
    pub fn api_key(value: impl Into<String>) -> Self {
        Self::ApiKey {
            header_name: None,
            value: value.into(),
        }
    }

    /// Name of the scheme, safe to log
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ApiKey { .. } => "api_key",
            Self::Basic { .. } => "basic",
            Self::Bearer { .. } => "bearer",
        }
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("kind", &self.kind())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn test_auth_config_default() {
        let config = AuthConfig::default();
        assert!(matches!(config, AuthConfig::None));
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = AuthConfig::api_key("super-secret");
        let text = format!("{config:?}");
        assert!(text.contains("api_key"));
        assert!(!text.contains("super-secret"));
    }
}
