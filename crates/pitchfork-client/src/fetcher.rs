use std::sync::Arc;

use pitchfork_core::error::AppError;
use pitchfork_core::models::{Location, RawContent};
use pitchfork_core::traits::Fetcher;
use reqwest::Client;

use crate::config::SiteConfig;

/// HTTP fetcher using reqwest.
///
/// Resolves each location against the configured base URL and downloads the
/// page with the configured User-Agent and timeout. One request per call, no
/// retries.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    config: Arc<SiteConfig>,
}

impl ReqwestFetcher {
    pub fn new(config: SiteConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    fn classify(&self, e: reqwest::Error, context: &str) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(self.config.timeout.as_secs())
        } else if e.is_connect() {
            AppError::NetworkError(format!("Connection failed: {e}"))
        } else {
            AppError::HttpError(format!("{context}: {e}"))
        }
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, location: &Location) -> Result<RawContent, AppError> {
        let url = self.config.resolve(location)?;
        tracing::debug!(%url, "Fetching");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify(e, "Request failed"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.classify(e, "Failed to read response body"))?;
        tracing::debug!(%url, bytes = body.len(), "Fetched");

        Ok(RawContent::new(url.to_string(), body))
    }
}
