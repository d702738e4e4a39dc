//! Valuation Bot Library
//!
//! Daily valuation broadcasts for DingTalk: where Hong Kong indices and
//! individual stocks sit within their historical PE range, and the latest
//! readings of a few macro indicators.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       ReportPipeline::run                           │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐   ┌─────────┐  │
//! │  │ Lixinger /  │──▶│ Percentile  │──▶│  Report     │──▶│ DingTalk│  │
//! │  │ Indicators  │   │ Classifier  │   │  Formatter  │   │ Robot   │  │
//! │  └─────────────┘   └─────────────┘   └─────────────┘   └─────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Reports
//!
//! - **hk-index-report**: 10y PE percentile of each configured HK index
//! - **stock-report**: PE plus 3y/5y/10y PE percentiles of each stock
//! - **indicator-report**: latest row of each configured macro series
//!
//! Each binary runs one report once; scheduling is left to cron or similar.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod cli;
pub mod data;
pub mod notification;
pub mod pipeline;
pub mod profile;
pub mod report;
pub mod valuation;

pub use notification::{DingTalkNotifier, DispatchError, Notifier};
pub use pipeline::{IndicatorReport, ReportPipeline, ReportStage, ValuationReport};
pub use profile::{DatePolicy, ReportKind, ReportProfile};
