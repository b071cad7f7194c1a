//! HTTP client for the questionnaire platform with connection pooling.

use anyhow::{Context, Result};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::ApiConfig;

/// JSON-over-HTTP client for the platform API.
pub struct PlatformClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl PlatformClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent("intake-cli/0.1")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(super) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!("GET {}", url);
        let response = self.http_client.get(&url).send().await?;
        Self::parse_response(response).await
    }

    pub(super) async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T> {
        let url = self.url(path);
        debug!("POST {}", url);
        let response = self.http_client.post(&url).json(body).send().await?;
        Self::parse_response(response).await
    }

    pub(super) async fn patch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T> {
        let url = self.url(path);
        debug!("PATCH {}", url);
        let response = self.http_client.patch(&url).json(body).send().await?;
        Self::parse_response(response).await
    }

    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        debug!("Response status: {}", status);

        if status.is_success() {
            let value: Value = response.json().await?;
            serde_json::from_value(value).context("Failed to parse API response")
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            anyhow::bail!("API request failed ({}): {}", status, error_text)
        }
    }
}
