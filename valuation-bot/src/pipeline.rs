//! Report pipeline.
//!
//! One run: pick the date, fetch, format, deliver. The pipeline is the only
//! recovery boundary; a failed fetch, a failed delivery, or a panic anywhere
//! inside the run all end as `false`.

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use futures::FutureExt;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};

use valuation_common::config::{IndicatorConfig, IndicatorSection, ValuationSection};
use valuation_common::logging::generate_trace_id;

use crate::data::{
    IndicatorClient, IndicatorSnapshot, MetricRequest, MetricsSource, ProviderError, RawDataset,
};
use crate::notification::Notifier;
use crate::profile::{DatePolicy, ReportKind, ReportProfile};
use crate::report::{IndicatorFormatter, ValuationFormatter};

// ============================================================================
// Report Stage
// ============================================================================

/// The variant-specific half of a run: where data comes from and how it
/// reads.
#[async_trait]
pub trait ReportStage: Send + Sync {
    type Data: Send + Sync;

    fn kind(&self) -> ReportKind;

    fn date_policy(&self) -> DatePolicy;

    async fn fetch(&self, date: NaiveDate) -> Result<Self::Data, ProviderError>;

    /// Never fails; absent data gives the variant's failure sentence.
    fn format(&self, data: Option<&Self::Data>, date: NaiveDate) -> String;
}

/// Index or stock valuation report backed by a metrics source.
pub struct ValuationReport {
    profile: ReportProfile,
    source: Arc<dyn MetricsSource>,
    token: String,
    codes: Vec<String>,
    names: BTreeMap<String, String>,
}

impl ValuationReport {
    pub fn new(profile: ReportProfile, source: Arc<dyn MetricsSource>, section: &ValuationSection) -> Self {
        Self {
            profile,
            source,
            token: section.lixinger.token.clone(),
            codes: section.stock_codes.clone(),
            names: section.names.clone(),
        }
    }

    pub fn profile(&self) -> &ReportProfile {
        &self.profile
    }
}

#[async_trait]
impl ReportStage for ValuationReport {
    type Data = RawDataset;

    fn kind(&self) -> ReportKind {
        self.profile.kind
    }

    fn date_policy(&self) -> DatePolicy {
        self.profile.date_policy
    }

    async fn fetch(&self, date: NaiveDate) -> Result<RawDataset, ProviderError> {
        let request = MetricRequest::new(
            self.token.clone(),
            date,
            self.codes.clone(),
            self.profile.metric_names(),
        )?;
        info!(source = self.source.name(), "Requesting valuation metrics");
        self.source.fetch(&request).await
    }

    fn format(&self, data: Option<&RawDataset>, date: NaiveDate) -> String {
        ValuationFormatter::new(&self.profile, &self.names).format(data, date)
    }
}

/// Macro indicator report.
pub struct IndicatorReport {
    client: IndicatorClient,
    indicators: Vec<IndicatorConfig>,
    notes: Vec<String>,
}

impl IndicatorReport {
    pub fn new(client: IndicatorClient, section: &IndicatorSection) -> Self {
        Self {
            client,
            indicators: section.indicators.clone(),
            notes: section.notes.clone(),
        }
    }
}

#[async_trait]
impl ReportStage for IndicatorReport {
    type Data = IndicatorSnapshot;

    fn kind(&self) -> ReportKind {
        ReportKind::Indicator
    }

    fn date_policy(&self) -> DatePolicy {
        DatePolicy::Latest
    }

    async fn fetch(&self, _date: NaiveDate) -> Result<IndicatorSnapshot, ProviderError> {
        self.client.fetch_all(&self.indicators).await
    }

    fn format(&self, data: Option<&IndicatorSnapshot>, date: NaiveDate) -> String {
        IndicatorFormatter::new(&self.notes).format(data, date)
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Runs a report stage end to end and delivers the result.
pub struct ReportPipeline<S: ReportStage> {
    stage: S,
    notifier: Arc<dyn Notifier>,
}

impl<S: ReportStage> ReportPipeline<S> {
    pub fn new(stage: S, notifier: Arc<dyn Notifier>) -> Self {
        Self { stage, notifier }
    }

    pub fn stage(&self) -> &S {
        &self.stage
    }

    /// Run once. `true` only when the report was delivered.
    pub async fn run(&self, date: Option<NaiveDate>) -> bool {
        self.run_on(date, Local::now().date_naive()).await
    }

    /// Run with an explicit notion of today.
    pub async fn run_on(&self, date: Option<NaiveDate>, today: NaiveDate) -> bool {
        let kind = self.stage.kind();
        let span = info_span!("report_run", report = %kind, run_id = %generate_trace_id());

        let outcome = AssertUnwindSafe(self.execute(date, today))
            .catch_unwind()
            .instrument(span)
            .await;

        match outcome {
            Ok(delivered) => delivered,
            Err(panic) => {
                error!(report = %kind, panic = %panic_message(panic.as_ref()), "Report run panicked");
                false
            }
        }
    }

    async fn execute(&self, date: Option<NaiveDate>, today: NaiveDate) -> bool {
        let date = self.stage.date_policy().effective_date(date, today);
        info!(%date, "Starting report run");

        let data = match self.stage.fetch(date).await {
            Ok(data) => data,
            Err(e) => {
                error!(error = %e, "Failed to fetch report data, nothing sent");
                return false;
            }
        };

        let text = self.stage.format(Some(&data), date);

        if self.notifier.send(&text).await {
            info!("Report delivered");
            true
        } else {
            error!("Report delivery failed");
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
