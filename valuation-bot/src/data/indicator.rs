//! Macro indicator series.
//!
//! Each configured indicator is a JSON endpoint returning its full history
//! in chronological order, either as a bare array of rows or as
//! `{"data": [...]}`. Only the latest row is reported, so the date asked for
//! never matters here: whatever the provider published last is used.

use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use valuation_common::config::{FieldKind, IndicatorConfig};

use super::provider::ProviderError;

/// Fixed request timeout.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Label used for the date column when no field mapping is configured.
const DATE_LABEL: &str = "日期";

/// One rendered column of an indicator row.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Date(String),
    Value(Value),
    /// Fraction in [0,1]
    Percentile(f64),
}

/// What was obtained for one indicator.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorOutcome {
    /// `(label, value)` pairs of the latest row, in display order
    Latest(Vec<(String, IndicatorValue)>),
    /// The series had no rows
    Empty,
    /// None of the mapped columns were in the latest row
    MissingFields,
    /// Request or parse failure
    Failed(String),
}

/// One indicator section of the report.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorEntry {
    pub key: String,
    pub name: String,
    pub emoji: String,
    pub outcome: IndicatorOutcome,
}

/// Latest values of every configured indicator, in configuration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndicatorSnapshot {
    entries: Vec<IndicatorEntry>,
}

impl IndicatorSnapshot {
    pub fn new(entries: Vec<IndicatorEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[IndicatorEntry] {
        &self.entries
    }

    /// At least one indicator produced a latest row.
    pub fn has_data(&self) -> bool {
        self.entries
            .iter()
            .any(|e| matches!(e.outcome, IndicatorOutcome::Latest(_)))
    }
}

/// Client for indicator series endpoints.
pub struct IndicatorClient {
    client: reqwest::Client,
}

impl IndicatorClient {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client }
    }

    /// Fetch the latest row of each indicator, one request after another.
    ///
    /// Individual failures are kept in the snapshot. The call fails only
    /// when no indicator produced a latest row.
    pub async fn fetch_all(
        &self,
        indicators: &[IndicatorConfig],
    ) -> Result<IndicatorSnapshot, ProviderError> {
        info!(count = indicators.len(), "Fetching macro indicators");

        let mut entries = Vec::with_capacity(indicators.len());
        for indicator in indicators {
            let outcome = match self.fetch_latest_row(&indicator.url).await {
                Ok(Some(row)) => extract_fields(indicator, &row),
                Ok(None) => {
                    warn!(indicator = %indicator.key, "Indicator series is empty");
                    IndicatorOutcome::Empty
                }
                Err(e) => {
                    error!(indicator = %indicator.key, error = %e, "Failed to fetch indicator");
                    IndicatorOutcome::Failed(e.to_string())
                }
            };

            if matches!(outcome, IndicatorOutcome::Latest(_)) {
                info!(indicator = %indicator.key, "Indicator fetched");
            }

            entries.push(IndicatorEntry {
                key: indicator.key.clone(),
                name: indicator.name.clone(),
                emoji: indicator.emoji.clone(),
                outcome,
            });
        }

        let snapshot = IndicatorSnapshot::new(entries);
        if !snapshot.has_data() {
            return Err(ProviderError::DataNotAvailable(
                "no indicator returned a latest row".into(),
            ));
        }
        Ok(snapshot)
    }

    /// GET a series and return its last row.
    async fn fetch_latest_row(&self, url: &str) -> Result<Option<Map<String, Value>>, ProviderError> {
        debug!(url = %url, "Calling indicator endpoint");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Internal(format!("Failed to parse response: {}", e)))?;

        let rows = match body {
            Value::Array(rows) => rows,
            Value::Object(mut obj) => match obj.remove("data") {
                Some(Value::Array(rows)) => rows,
                _ => return Err(ProviderError::Internal("response has no 'data' array".into())),
            },
            _ => return Err(ProviderError::Internal("unexpected response shape".into())),
        };

        match rows.into_iter().last() {
            None => Ok(None),
            Some(Value::Object(row)) => Ok(Some(row)),
            Some(other) => Err(ProviderError::Internal(format!(
                "latest row is not an object: {}",
                other
            ))),
        }
    }
}

impl Default for IndicatorClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Select and label the configured columns of a row.
fn extract_fields(indicator: &IndicatorConfig, row: &Map<String, Value>) -> IndicatorOutcome {
    if indicator.fields.is_empty() {
        let values = row
            .iter()
            .map(|(key, value)| {
                if *key == indicator.date_field {
                    (DATE_LABEL.to_string(), IndicatorValue::Date(plain_text(value)))
                } else {
                    (key.clone(), IndicatorValue::Value(value.clone()))
                }
            })
            .collect();
        return IndicatorOutcome::Latest(values);
    }

    let values: Vec<(String, IndicatorValue)> = indicator
        .fields
        .iter()
        .filter_map(|field| {
            let value = row.get(&field.source)?;
            let rendered = match field.kind {
                FieldKind::Date => IndicatorValue::Date(plain_text(value)),
                FieldKind::Percentile => value
                    .as_f64()
                    .map(IndicatorValue::Percentile)
                    .unwrap_or_else(|| IndicatorValue::Value(value.clone())),
                FieldKind::Value => IndicatorValue::Value(value.clone()),
            };
            Some((field.label.clone(), rendered))
        })
        .collect();

    if values.is_empty() {
        warn!(indicator = %indicator.key, "None of the configured fields are present");
        return IndicatorOutcome::MissingFields;
    }
    IndicatorOutcome::Latest(values)
}

/// Strings without JSON quotes, everything else as JSON text.
pub(crate) fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
