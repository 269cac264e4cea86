//! Client configuration

use std::time::Duration;

use crate::error::{Error, Result};

/// Default Mapbox API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.mapbox.com";

/// Environment variable holding the access token
pub const TOKEN_ENV: &str = "MAPBOX_TOKEN";

/// Environment variable overriding the API endpoint
pub const BASE_URL_ENV: &str = "MAPBOX_BASE_URL";

/// Settings used to build the shared HTTP base
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub access_token: String,
    pub base_url: String,
    pub user_agent: String,
    /// Request timeout; `None` keeps the transport default
    pub timeout: Option<Duration>,
    /// Log full request URLs (without the token) at debug level
    pub debug: bool,
}

impl ClientConfig {
    /// Create a configuration for the given token with default settings
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            ..Self::default()
        }
    }

    /// Build a configuration from `MAPBOX_TOKEN` and optionally `MAPBOX_BASE_URL`
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(TOKEN_ENV).unwrap_or_default();
        let mut config = Self::new(token);
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.is_empty() {
                config.base_url = url;
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Check the configuration can be used to issue requests
    pub fn validate(&self) -> Result<()> {
        if self.access_token.trim().is_empty() {
            return Err(Error::Configuration("Mapbox API token not found".into()));
        }
        if self.base_url.is_empty() {
            return Err(Error::Configuration("base URL must not be empty".into()));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: format!("mapbox-client/{}", env!("CARGO_PKG_VERSION")),
            timeout: None,
            debug: false,
        }
    }
}
