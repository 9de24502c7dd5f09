//! API client for the controller status API

use anyhow::{Context, Result};
use dpa_lib::cycle::TargetSummary;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

/// API client for the controller
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn list_targets(&self) -> Result<Vec<TargetSummary>> {
        self.get("api/v1/targets").await
    }

    pub async fn get_target(&self, namespace: &str, name: &str) -> Result<TargetSummary> {
        self.get(&format!("api/v1/targets/{}/{}", namespace, name))
            .await
    }
}

/// Split `namespace/name`; a bare name lives in `default`
pub fn split_target_key(key: &str) -> Result<(String, String)> {
    let (namespace, name) = match key.split_once('/') {
        Some((namespace, name)) => (namespace, name),
        None => ("default", key),
    };
    if namespace.is_empty() || name.is_empty() || name.contains('/') {
        anyhow::bail!("Invalid target '{}', expected <namespace>/<name>", key);
    }
    Ok((namespace.to_string(), name.to_string()))
}
