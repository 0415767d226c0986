use std::time::Duration;

use pitchfork_core::{AppError, Location};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://pitchfork.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_USER_AGENT: &str = concat!("pitchfork-cli/", env!("CARGO_PKG_VERSION"));

/// Where and how to reach the review site.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub base_url: Url,
    pub timeout: Duration,
    pub user_agent: String,
}

impl SiteConfig {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::ConfigError(format!("Invalid base URL '{base_url}': {e}")))?;

        match base_url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(AppError::ConfigError(format!(
                    "Base URL scheme '{scheme}' is not allowed (only http/https)"
                )));
            }
        }

        Ok(Self {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Resolve a location against the base URL.
    pub fn resolve(&self, location: &Location) -> Result<Url, AppError> {
        self.base_url
            .join(location.as_str())
            .map_err(|e| AppError::HttpError(format!("Invalid location '{location}': {e}")))
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
