//! Market data module.
//!
//! Fetches valuation metrics and macro indicator series, and turns the
//! provider's flattened rows into typed records.
//!
//! # Data Sources
//! - **Lixinger** (理杏仁): batched PE / percentile metrics for indices and stocks
//! - **Indicator series**: JSON endpoints whose latest row is reported as-is

mod indicator;
mod lixin;
mod provider;

pub use indicator::{
    IndicatorClient, IndicatorEntry, IndicatorOutcome, IndicatorSnapshot, IndicatorValue,
};
pub(crate) use indicator::plain_text;
pub use lixin::LixinClient;
pub use provider::{MetricsSource, ProviderError};

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Row key holding the code in provider responses.
pub const CODE_KEY: &str = "stockCode";

// ============================================================================
// Metric Request
// ============================================================================

/// One batched metrics request.
///
/// Serializes to the provider wire format:
/// `{"token", "date", "stockCodes", "metricsList"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRequest {
    token: String,
    date: NaiveDate,
    #[serde(rename = "stockCodes")]
    codes: Vec<String>,
    #[serde(rename = "metricsList")]
    metrics: Vec<String>,
}

impl MetricRequest {
    /// Build a request. At least one code is required.
    pub fn new(
        token: impl Into<String>,
        date: NaiveDate,
        codes: Vec<String>,
        metrics: Vec<String>,
    ) -> Result<Self, ProviderError> {
        if codes.is_empty() {
            return Err(ProviderError::InvalidRequest("no codes requested".into()));
        }
        Ok(Self {
            token: token.into(),
            date,
            codes,
            metrics,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    /// Wire payload with the token masked, for logging.
    pub fn redacted(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Some(token) = value.get_mut("token") {
            *token = Value::String(mask_token(&self.token));
        }
        value
    }
}

fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    if token.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}

// ============================================================================
// Raw Dataset
// ============================================================================

/// The provider's `data` array, one JSON object per code.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RawDataset {
    rows: Vec<Value>,
}

impl RawDataset {
    pub fn new(rows: Vec<Value>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Value] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Extract typed records, one per row, in row order.
    pub fn records(
        &self,
        metric_names: &[&str],
        names: &BTreeMap<String, String>,
        placeholder_prefix: &str,
    ) -> Vec<Result<MetricRecord, MalformedRecord>> {
        self.rows
            .iter()
            .map(|row| MetricRecord::from_row(row, metric_names, names, placeholder_prefix))
            .collect()
    }
}

// ============================================================================
// Metric Record
// ============================================================================

/// A row that is not a JSON object.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("record is not an object: {0}")]
pub struct MalformedRecord(pub String);

/// Typed view of one provider row.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub code: String,
    pub display_name: String,
    metrics: Vec<(String, Option<f64>)>,
}

impl MetricRecord {
    /// Build a record from a flattened provider row.
    ///
    /// Every requested metric is present in the record; a key that is
    /// missing, `null`, or not a number becomes `None`.
    pub fn from_row(
        row: &Value,
        metric_names: &[&str],
        names: &BTreeMap<String, String>,
        placeholder_prefix: &str,
    ) -> Result<Self, MalformedRecord> {
        let object = row
            .as_object()
            .ok_or_else(|| MalformedRecord(row.to_string()))?;

        let code = match object.get(CODE_KEY) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };

        let display_name = names
            .get(&code)
            .cloned()
            .unwrap_or_else(|| format!("{placeholder_prefix}{code}"));

        let metrics = metric_names
            .iter()
            .map(|name| (name.to_string(), object.get(*name).and_then(Value::as_f64)))
            .collect();

        Ok(Self {
            code,
            display_name,
            metrics,
        })
    }

    /// Value of a requested metric.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| *v)
    }

    pub fn metrics(&self) -> &[(String, Option<f64>)] {
        &self.metrics
    }
}
