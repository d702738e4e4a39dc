//! Valuation report formatter for the index and stock variants.
//!
//! Every provider row yields exactly one body line, in row order:
//! a tiered line, a failure line when the required metric is missing, or a
//! parse-failure line when the row is not an object.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::{date_line, valuation_legend, Report};
use crate::data::{MetricRecord, RawDataset};
use crate::profile::{
    LineTemplate, ReportProfile, INDEX_PE_PERCENTILE_10Y, STOCK_PE_PERCENTILE_10Y,
    STOCK_PE_PERCENTILE_3Y, STOCK_PE_PERCENTILE_5Y, STOCK_PE_TTM,
};
use crate::valuation::{
    Classification, PercentileClassifier, PercentileHorizons, OUT_OF_RANGE_MARKER,
};

/// Line emitted for a row that could not be read.
pub const PARSE_FAILURE_LINE: &str = "❌ 数据解析失败";

/// Status shown for a record without its required metric.
const FETCH_FAILURE_STATUS: &str = "状态: ❌ 数据获取失败";

/// Formats a provider dataset into report text for one profile.
pub struct ValuationFormatter<'a> {
    profile: &'a ReportProfile,
    names: &'a BTreeMap<String, String>,
    classifier: PercentileClassifier,
}

impl<'a> ValuationFormatter<'a> {
    pub fn new(profile: &'a ReportProfile, names: &'a BTreeMap<String, String>) -> Self {
        Self {
            profile,
            names,
            classifier: PercentileClassifier::new(profile.bands),
        }
    }

    /// Message text for a dataset. An absent or empty dataset gives the
    /// profile's failure sentence.
    pub fn format(&self, dataset: Option<&RawDataset>, date: NaiveDate) -> String {
        let message = match dataset {
            Some(dataset) if !dataset.is_empty() => self.build(dataset, date).render(),
            _ => {
                warn!(report = %self.profile.kind, "Valuation data is empty");
                self.profile.failure_sentence.to_string()
            }
        };
        debug!(message = %message, "Final message");
        message
    }

    /// Assemble the report for a non-empty dataset.
    pub fn build(&self, dataset: &RawDataset, date: NaiveDate) -> Report {
        debug!(names = ?self.names, "Name map in use");

        let mut processed = 0usize;
        let body_lines: Vec<String> = dataset
            .records(self.profile.metrics, self.names, self.profile.placeholder_prefix)
            .into_iter()
            .map(|record| match record {
                Ok(record) => {
                    debug!(code = %record.code, name = %record.display_name, "Processing record");
                    let (line, complete) = self.record_line(&record);
                    if complete {
                        processed += 1;
                    } else {
                        warn!(code = %record.code, "Required metric missing");
                    }
                    line
                }
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable record");
                    PARSE_FAILURE_LINE.to_string()
                }
            })
            .collect();

        info!(processed, total = body_lines.len(), "Records formatted");

        Report::new(
            self.profile.heading,
            date_line(date),
            body_lines,
            valuation_legend(&self.profile.bands, self.profile.join),
            self.profile.join,
        )
    }

    /// Line for one record, and whether its required metric was present.
    fn record_line(&self, record: &MetricRecord) -> (String, bool) {
        let (line, complete) = match self.profile.template {
            LineTemplate::Index => self.index_line(record),
            LineTemplate::Stock => self.stock_line(record),
        };
        (self.profile.join.content_line(line), complete)
    }

    fn index_line(&self, record: &MetricRecord) -> (String, bool) {
        let name = &record.display_name;
        match record.metric(INDEX_PE_PERCENTILE_10Y) {
            Some(fraction) => {
                let line = format!(
                    "📈 **{}** | 估值: **{:.1}%** | {}",
                    name,
                    fraction * 100.0,
                    self.tier_text(fraction, &record.code)
                );
                (line, true)
            }
            None => (format!("📈 **{}** | {}", name, FETCH_FAILURE_STATUS), false),
        }
    }

    fn stock_line(&self, record: &MetricRecord) -> (String, bool) {
        let label = format!("📈 **{}({})**", record.display_name, record.code);
        let Some(pe) = record.metric(STOCK_PE_TTM) else {
            return (format!("{} | {}", label, FETCH_FAILURE_STATUS), false);
        };

        let horizons = PercentileHorizons {
            y3: record.metric(STOCK_PE_PERCENTILE_3Y),
            y5: record.metric(STOCK_PE_PERCENTILE_5Y),
            y10: record.metric(STOCK_PE_PERCENTILE_10Y),
        };

        let mut parts = vec![label, format!("PE: **{:.2}**", pe)];

        let percentiles: Vec<String> = horizons
            .present()
            .into_iter()
            .map(|(horizon, value)| format!("{}: {:.1}%", horizon.label(), value * 100.0))
            .collect();
        if !percentiles.is_empty() {
            parts.push(format!("百分位: {}", percentiles.join(" | ")));
        }

        if let Some((horizon, value)) = horizons.preferred() {
            debug!(code = %record.code, horizon = horizon.label(), value, "Tier horizon");
            parts.push(self.tier_text(value, &record.code));
        }

        (parts.join(" | "), true)
    }

    fn tier_text(&self, fraction: f64, code: &str) -> String {
        match self.classifier.classify(fraction) {
            Classification::Tier(tier) => tier.to_string(),
            Classification::OutOfRange(value) => {
                warn!(code, value, "Percentile outside [0, 1]");
                OUT_OF_RANGE_MARKER.to_string()
            }
        }
    }
}
