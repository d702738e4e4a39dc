//! 理杏仁 (Lixinger) API adapter for valuation metrics.
//!
//! # API Documentation
//! https://www.lixinger.com/open/api
//!
//! One POST per run with every code and metric batched together:
//!
//! ```text
//! POST <api_url>
//! {"token": "...", "date": "2024-12-20", "stockCodes": ["HSI"], "metricsList": ["pe_ttm.y10.mcw.cvpos"]}
//! ```
//!
//! The response carries a `data` array of flattened rows, e.g.
//! `{"stockCode": "HSI", "pe_ttm.y10.mcw.cvpos": 0.15}`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::provider::{MetricsSource, ProviderError};
use super::{MetricRequest, RawDataset, CODE_KEY};

/// Fixed request timeout.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Lixinger response envelope. Only `data` decides success.
#[derive(Debug, Deserialize)]
struct LixinResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Vec<Value>>,
}

/// Lixinger metrics client.
pub struct LixinClient {
    /// Full endpoint URL
    api_url: String,
    /// HTTP client
    client: reqwest::Client,
}

impl LixinClient {
    /// Create a client for an endpoint with the fixed 30s timeout.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_timeout(api_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    /// Create with a custom timeout.
    pub fn with_timeout(api_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true) // Required by Lixin API
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            api_url: api_url.into(),
            client,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl MetricsSource for LixinClient {
    fn name(&self) -> &'static str {
        "lixinger"
    }

    async fn fetch(&self, request: &MetricRequest) -> Result<RawDataset, ProviderError> {
        info!(
            payload = %request.redacted(),
            "Lixinger request"
        );
        info!(date = %request.date(), codes = request.codes().len(), "Fetching valuation metrics");

        let response = self
            .client
            .post(&self.api_url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Lixinger request failed");
                ProviderError::from_transport(&e)
            })?;

        let status = response.status();
        info!(status = status.as_u16(), "Lixinger response status");

        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "Lixinger request rejected");
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;

        debug!(body = %body, "Lixinger raw response");

        let parsed: LixinResponse = serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, body = %body, "Failed to parse Lixinger response");
            ProviderError::Internal(format!("Failed to parse response: {}", e))
        })?;

        let rows = match parsed.data {
            Some(rows) if !rows.is_empty() => rows,
            _ => {
                warn!(
                    code = ?parsed.code,
                    message = parsed.message.as_deref().unwrap_or(""),
                    "Lixinger response has no 'data' rows"
                );
                return Err(ProviderError::DataNotAvailable(
                    parsed
                        .message
                        .unwrap_or_else(|| "empty or missing data field".to_string()),
                ));
            }
        };

        info!(rows = rows.len(), "Lixinger data received");
        for (i, row) in rows.iter().enumerate() {
            let code = row.get(CODE_KEY).and_then(Value::as_str).unwrap_or("Unknown");
            debug!(index = i + 1, code, row = %row, "Lixinger row");
        }

        Ok(RawDataset::new(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> MetricRequest {
        MetricRequest::new(
            "token-123",
            NaiveDate::from_ymd_opt(2024, 12, 20).unwrap(),
            vec!["HSI".into(), "HSCEI".into()],
            vec!["pe_ttm.y10.mcw.cvpos".into()],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success_sends_wire_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hk/index/fundamental"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "token": "token-123",
                "date": "2024-12-20",
                "stockCodes": ["HSI", "HSCEI"],
                "metricsList": ["pe_ttm.y10.mcw.cvpos"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 1,
                "message": "success",
                "data": [
                    { "stockCode": "HSI", "pe_ttm.y10.mcw.cvpos": 0.15 },
                    { "stockCode": "HSCEI", "pe_ttm.y10.mcw.cvpos": 0.42 }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = LixinClient::new(format!("{}/hk/index/fundamental", server.uri()));
        let dataset = client.fetch(&request()).await.unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.rows()[0]["stockCode"], "HSI");
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .mount(&server)
            .await;

        let client = LixinClient::new(server.uri());
        let err = client.fetch(&request()).await.unwrap_err();

        assert!(matches!(err, ProviderError::Http { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_fetch_empty_or_missing_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/empty"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 1, "data": [] })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/missing"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "code": 0, "message": "token invalid" })),
            )
            .mount(&server)
            .await;

        let client = LixinClient::new(format!("{}/empty", server.uri()));
        let err = client.fetch(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::DataNotAvailable(_)));

        let client = LixinClient::new(format!("{}/missing", server.uri()));
        let err = client.fetch(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::DataNotAvailable(ref m) if m == "token invalid"));
    }

    #[tokio::test]
    async fn test_fetch_unparsable_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = LixinClient::new(server.uri());
        let err = client.fetch(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Internal(ref msg) if msg.starts_with("Failed to parse response")));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        // Nothing listens on port 9 of localhost in the test environment
        let client = LixinClient::with_timeout("http://127.0.0.1:9/api", Duration::from_secs(2));
        let err = client.fetch(&request()).await.unwrap_err();
        assert!(err.is_network());
    }
}
