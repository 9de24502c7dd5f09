//! Prometheus instant-query sample source
//!
//! Expects the standard query response shape
//! `{"data": {"result": [{"value": [<ts>, "<value>"]}]}}` and reads the
//! value of the first result row.

use super::SampleSource;
use crate::error::CycleError;
use crate::models::Target;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    data: QueryData,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<QueryResult>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    value: Vec<Value>,
}

/// Reads each target's rate from its instant-query URL
pub struct PrometheusSource {
    client: Client,
}

impl PrometheusSource {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    /// Query a URL and return the first result row's value
    pub async fn query(&self, url: &str) -> Result<f64, CycleError> {
        let unavailable = |reason: String| CycleError::SampleUnavailable { reason };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(unavailable(format!("query error ({}): {}", status, body)));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| unavailable(format!("failed to parse response: {}", e)))?;

        let row = parsed
            .data
            .result
            .into_iter()
            .next()
            .ok_or_else(|| CycleError::NoSampleData {
                query: url.to_string(),
            })?;

        parse_sample_value(&row.value).map_err(unavailable)
    }
}

#[async_trait]
impl SampleSource for PrometheusSource {
    async fn latest_rate(&self, target: &Target) -> Result<f64, CycleError> {
        self.query(&target.scrape_url).await
    }
}

/// Extract the value from a `[timestamp, "value"]` pair
fn parse_sample_value(pair: &[Value]) -> std::result::Result<f64, String> {
    let raw = pair
        .get(1)
        .ok_or_else(|| "result row has no (timestamp, value) pair".to_string())?;

    let value = match raw {
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("sample value is not a number: {:?}", s))?,
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("sample value is not a number: {}", n))?,
        other => return Err(format!("sample value is not a number: {}", other)),
    };

    if !value.is_finite() {
        return Err(format!("sample value is not finite: {}", value));
    }
    if value < 0.0 {
        return Err(format!("sample value is negative: {}", value));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn target_for(url: String) -> Target {
        Target {
            namespace: "default".to_string(),
            name: "web".to_string(),
            replicas: 1,
            scrape_url: url,
            limits: Default::default(),
            request_cost: None,
        }
    }

    #[tokio::test]
    async fn test_reads_first_result_value() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/query")
            .match_query(mockito::Matcher::UrlEncoded(
                "query".into(),
                "rate(http_requests_total[1m])".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "status": "success",
                    "data": {
                        "resultType": "vector",
                        "result": [
                            { "metric": {}, "value": [1717000000.123, "137.5"] },
                            { "metric": {}, "value": [1717000000.123, "2"] }
                        ]
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let source = PrometheusSource::new().unwrap();
        let target = target_for(format!(
            "{}/api/v1/query?query=rate(http_requests_total%5B1m%5D)",
            server.url()
        ));
        let rate = source.latest_rate(&target).await.unwrap();

        assert_eq!(rate, 137.5);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_result_is_no_sample_data() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/query")
            .with_status(200)
            .with_body(r#"{"status":"success","data":{"resultType":"vector","result":[]}}"#)
            .create_async()
            .await;

        let source = PrometheusSource::new().unwrap();
        let err = source
            .query(&format!("{}/api/v1/query", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, CycleError::NoSampleData { .. }));
    }

    #[tokio::test]
    async fn test_unparsable_value_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/query")
            .with_status(200)
            .with_body(r#"{"data":{"result":[{"value":[1717000000, "NaN-ish"]}]}}"#)
            .create_async()
            .await;

        let source = PrometheusSource::new().unwrap();
        let err = source
            .query(&format!("{}/api/v1/query", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, CycleError::SampleUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_negative_value_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/query")
            .with_status(200)
            .with_body(r#"{"data":{"result":[{"value":[1717000000, "-3.5"]}]}}"#)
            .create_async()
            .await;

        let source = PrometheusSource::new().unwrap();
        let err = source
            .query(&format!("{}/api/v1/query", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, CycleError::SampleUnavailable { .. }));
        assert!(err.to_string().contains("negative"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        let source = PrometheusSource::new().unwrap();
        let err = source.query("http://127.0.0.1:1/api/v1/query").await.unwrap_err();
        assert_eq!(err.kind(), "sample_unavailable");
    }

    #[test]
    fn test_parse_sample_value() {
        assert_eq!(parse_sample_value(&[json!(1), json!("4.25")]).unwrap(), 4.25);
        assert_eq!(parse_sample_value(&[json!(1), json!(8)]).unwrap(), 8.0);
        assert!(parse_sample_value(&[json!(1)]).is_err());
        assert!(parse_sample_value(&[json!(1), json!("NaN")]).is_err());
        assert!(parse_sample_value(&[json!(1), json!(null)]).is_err());
        assert!(parse_sample_value(&[json!(1), json!(-1)]).is_err());
        assert_eq!(parse_sample_value(&[json!(1), json!("0")]).unwrap(), 0.0);
    }
}
