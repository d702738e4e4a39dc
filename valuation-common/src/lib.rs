//! Valuation Common - configuration, errors, and logging shared by the valuation bots.
//!
//! This crate provides:
//! - Configuration types and loading (one JSON file, one section per report)
//! - The configuration error type
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    AppConfig, DingTalkConfig, FieldKind, IndicatorConfig, IndicatorField, IndicatorSection,
    LixingerConfig, ObservabilityConfig, ValuationSection,
};
pub use error::{Error, Result};

