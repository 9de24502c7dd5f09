//! HTTP forecasting oracle
//!
//! Request: `POST {"input": [f64; N]}`.
//! Response: `{"prediction": [[f64, ...], ...]}`, only `prediction[0][0]` is used.

use super::Oracle;
use crate::error::CycleError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Debug, Serialize)]
struct OracleRequest<'a> {
    input: &'a [f64],
}

#[derive(Debug, Deserialize)]
struct OracleResponse {
    prediction: Vec<Vec<f64>>,
}

/// Oracle served over HTTP
pub struct HttpOracle {
    client: Client,
    endpoint: Url,
}

impl HttpOracle {
    /// Create a new oracle client for the given prediction endpoint
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let endpoint = Url::parse(endpoint).context("Invalid oracle endpoint URL")?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    async fn predict(&self, input: &[f64]) -> Result<f64, CycleError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&OracleRequest { input })
            .send()
            .await
            .map_err(|e| CycleError::OracleUnavailable {
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CycleError::OracleUnavailable {
                reason: format!("oracle error ({}): {}", status, body),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CycleError::OracleUnavailable {
                reason: e.to_string(),
            })?;

        let parsed: OracleResponse =
            serde_json::from_slice(&body).map_err(|e| CycleError::OracleProtocolError {
                reason: format!("failed to parse response: {}", e),
            })?;

        let value = parsed
            .prediction
            .first()
            .and_then(|row| row.first())
            .copied()
            .ok_or_else(|| CycleError::OracleProtocolError {
                reason: "empty prediction array".to_string(),
            })?;

        if !value.is_finite() {
            return Err(CycleError::OracleProtocolError {
                reason: format!("non-finite prediction: {}", value),
            });
        }

        Ok(value)
    }

    fn describe(&self) -> String {
        format!("http:{}", self.endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_predict_reads_first_value() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/predict")
            .match_body(Matcher::Json(json!({ "input": [0.0, 0.5, 1.0] })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"prediction": [[0.42, 0.9]]}"#)
            .create_async()
            .await;

        let oracle = HttpOracle::new(&format!("{}/predict", server.url())).unwrap();
        let value = oracle.predict(&[0.0, 0.5, 1.0]).await.unwrap();

        assert_eq!(value, 0.42);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_prediction_is_protocol_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_status(200)
            .with_body(r#"{"prediction": [[]]}"#)
            .create_async()
            .await;

        let oracle = HttpOracle::new(&format!("{}/predict", server.url())).unwrap();
        let err = oracle.predict(&[0.0]).await.unwrap_err();
        assert!(matches!(err, CycleError::OracleProtocolError { .. }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_protocol_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let oracle = HttpOracle::new(&format!("{}/predict", server.url())).unwrap();
        let err = oracle.predict(&[0.0]).await.unwrap_err();
        assert_eq!(err.kind(), "oracle_protocol_error");
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_status(503)
            .with_body("model loading")
            .create_async()
            .await;

        let oracle = HttpOracle::new(&format!("{}/predict", server.url())).unwrap();
        let err = oracle.predict(&[0.0]).await.unwrap_err();
        assert!(matches!(err, CycleError::OracleUnavailable { .. }));
        assert!(err.to_string().contains("model loading"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        let oracle = HttpOracle::new("http://127.0.0.1:1/predict").unwrap();
        let err = oracle.predict(&[0.0]).await.unwrap_err();
        assert!(matches!(err, CycleError::OracleUnavailable { .. }));
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(HttpOracle::new("not a url").is_err());
    }
}
