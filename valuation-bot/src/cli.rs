//! Entry point shared by the report binaries.
//!
//! Each binary runs one report once and exits. The process exit code never
//! reflects the outcome; it is visible in the logs and in the delivered
//! message.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use valuation_common::config::AppConfig;
use valuation_common::Error as ConfigError;
use valuation_common::logging::init_logging;

use crate::data::{IndicatorClient, LixinClient};
use crate::notification::DingTalkNotifier;
use crate::pipeline::{IndicatorReport, ReportPipeline, ValuationReport};
use crate::profile::{ReportKind, ReportProfile};

/// Load configuration, set up logging, and run one report.
pub async fn run(kind: ReportKind) {
    let started = Instant::now();

    let config = AppConfig::load(None);
    let observability = config
        .as_ref()
        .map(|c| c.observability.clone())
        .unwrap_or_default();
    init_logging(&observability.log_level, &observability.log_format);

    info!(report = %kind, "Valuation Bot v{}", env!("CARGO_PKG_VERSION"));

    let date = match parse_date_arg(std::env::args().skip(1)) {
        Ok(date) => date,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Run skipped");
            return;
        }
    };

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "{}", config_error_message(&e));
            return;
        }
    };

    match run_report(kind, &config, date).await {
        Ok(true) => info!(
            report = %kind,
            duration_ms = started.elapsed().as_millis() as u64,
            "Report run succeeded"
        ),
        Ok(false) => error!(report = %kind, "Report run failed"),
        Err(e) => error!(report = %kind, error = %format!("{e:#}"), "Report run aborted"),
    }
}

/// Log message for a configuration file that could not be loaded.
fn config_error_message(e: &ConfigError) -> &'static str {
    if e.is_not_found() {
        "Configuration file not found, create config.json first"
    } else if e.is_malformed() {
        "Configuration file is not valid JSON"
    } else {
        "Failed to load configuration"
    }
}

/// Optional `YYYY-MM-DD` positional argument.
pub fn parse_date_arg<I>(args: I) -> Result<Option<NaiveDate>>
where
    I: IntoIterator<Item = String>,
{
    let Some(arg) = args.into_iter().next() else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(arg.trim(), "%Y-%m-%d")
        .map(Some)
        .with_context(|| format!("invalid date argument '{arg}', expected YYYY-MM-DD"))
}

/// Build the pipeline for `kind` from configuration and run it.
///
/// Errors only for configuration problems; a run that fetched or delivered
/// nothing is `Ok(false)`.
pub async fn run_report(kind: ReportKind, config: &AppConfig, date: Option<NaiveDate>) -> Result<bool> {
    match ReportProfile::for_kind(kind) {
        Some(profile) => {
            let section = config
                .valuation_section(kind.section())
                .with_context(|| format!("invalid '{}' configuration", kind.section()))?;

            let source = Arc::new(LixinClient::new(section.lixinger.api_url.clone()));
            let notifier = Arc::new(DingTalkNotifier::new(
                section.dingtalk.webhook_url.clone(),
                profile.title(),
            ));

            let pipeline = ReportPipeline::new(ValuationReport::new(profile, source, &section), notifier);
            Ok(pipeline.run(date).await)
        }
        None => {
            let section = config
                .indicator_section()
                .with_context(|| format!("invalid '{}' configuration", kind.section()))?;

            let notifier = Arc::new(DingTalkNotifier::new(
                section.dingtalk.webhook_url.clone(),
                kind.title(),
            ));

            let pipeline = ReportPipeline::new(IndicatorReport::new(IndicatorClient::new(), &section), notifier);
            Ok(pipeline.run(date).await)
        }
    }
}
