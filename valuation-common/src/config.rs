//! Configuration for the valuation bots.
//!
//! All three reports share one JSON file with a section per report:
//!
//! - `hk_config`: Hong Kong index valuation (Lixinger + DingTalk)
//! - `stock_config`: individual stock valuation (Lixinger + DingTalk)
//! - `cn_config`: macro indicator report (indicator series + DingTalk)
//! - `observability`: optional log level/format
//!
//! # File Resolution
//!
//! 1. Explicit path passed by the caller
//! 2. `VALUATION_CONFIG` environment variable
//! 3. `./config.json`
//! 4. `~/.valuation-bot/config.json`
//!
//! # Environment Overrides
//!
//! - `VALUATION_LOG_LEVEL` → observability.log_level
//! - `LIXINGER_TOKEN` → lixinger.token of any valuation section whose token is empty

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result, ResultExt};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "VALUATION_CONFIG";

/// File name looked up in the working directory and the config directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Section key of the Hong Kong index report.
pub const HK_SECTION: &str = "hk_config";

/// Section key of the stock report.
pub const STOCK_SECTION: &str = "stock_config";

/// Section key of the macro indicator report.
pub const INDICATOR_SECTION: &str = "cn_config";

/// Get the per-user configuration directory.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".valuation-bot"),
        |dirs| dirs.home_dir().join(".valuation-bot"),
    )
}

/// Resolve which configuration file to read.
///
/// Falls through to the user config directory only when `./config.json`
/// does not exist; the returned path may still not exist.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    resolve_config_path_with(
        explicit,
        std::env::var(CONFIG_PATH_ENV).ok(),
        Path::new(CONFIG_FILE_NAME),
    )
}

fn resolve_config_path_with(explicit: Option<&Path>, from_env: Option<String>, local: &Path) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Some(path) = from_env.filter(|p| !p.trim().is_empty()) {
        return PathBuf::from(path);
    }

    if local.exists() {
        return local.to_path_buf();
    }

    config_dir().join(CONFIG_FILE_NAME)
}

/// Key of the code → name map inside a valuation section.
fn names_key(section: &str) -> Option<&'static str> {
    match section {
        HK_SECTION => Some("index_names"),
        STOCK_SECTION => Some("stock_names"),
        _ => None,
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Lixinger (理杏仁) open API credentials and endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LixingerConfig {
    /// API token
    #[serde(default)]
    pub token: String,

    /// Full endpoint URL, e.g. `https://open.lixinger.com/api/hk/index/fundamental`
    pub api_url: String,
}

/// DingTalk custom robot webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DingTalkConfig {
    /// Webhook URL including `access_token`
    pub webhook_url: String,
}

/// Section shared by the index and stock reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationSection {
    pub lixinger: LixingerConfig,

    pub dingtalk: DingTalkConfig,

    /// Codes requested from the provider, in report order
    pub stock_codes: Vec<String>,

    /// Code → display name, read from `index_names` or `stock_names`
    /// depending on the section.
    #[serde(skip)]
    pub names: BTreeMap<String, String>,
}

impl ValuationSection {
    fn validate(&self, section: &str) -> Result<()> {
        if self.stock_codes.is_empty() {
            return Err(Error::Invalid("stock_codes is empty".into()).with_context(section));
        }
        if self.stock_codes.iter().any(|c| c.trim().is_empty()) {
            return Err(Error::Invalid("stock_codes contains a blank code".into()).with_context(section));
        }
        if self.lixinger.token.trim().is_empty() {
            return Err(Error::MissingKey(format!("{section}.lixinger.token")));
        }
        if self.lixinger.api_url.trim().is_empty() {
            return Err(Error::MissingKey(format!("{section}.lixinger.api_url")));
        }
        if self.dingtalk.webhook_url.trim().is_empty() {
            return Err(Error::MissingKey(format!("{section}.dingtalk.webhook_url")));
        }
        Ok(())
    }
}

/// How one column of an indicator row is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Observation date
    Date,
    /// Shown as provided
    #[default]
    Value,
    /// Fraction in [0,1], shown as a percentage
    Percentile,
}

/// Column selection and renaming for an indicator row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorField {
    /// Column name in the provider row
    pub source: String,
    /// Label shown in the report
    pub label: String,
    #[serde(default)]
    pub kind: FieldKind,
}

/// One macro indicator series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorConfig {
    /// Stable key used in logs
    pub key: String,
    /// Section heading, e.g. "巴菲特指标"
    pub name: String,
    #[serde(default = "default_indicator_emoji")]
    pub emoji: String,
    /// Series endpoint (GET); rows in chronological order
    pub url: String,
    /// Column holding the observation date when `fields` is empty
    #[serde(default = "default_date_field")]
    pub date_field: String,
    /// Columns to show. Empty means every column of the latest row.
    #[serde(default)]
    pub fields: Vec<IndicatorField>,
}

/// Section of the macro indicator report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSection {
    pub dingtalk: DingTalkConfig,

    #[serde(default)]
    pub indicators: Vec<IndicatorConfig>,

    /// Explanation lines under "数据说明"
    #[serde(default = "default_indicator_notes")]
    pub notes: Vec<String>,
}

impl IndicatorSection {
    fn validate(&self) -> Result<()> {
        if self.dingtalk.webhook_url.trim().is_empty() {
            return Err(Error::MissingKey(format!(
                "{INDICATOR_SECTION}.dingtalk.webhook_url"
            )));
        }
        if self.indicators.is_empty() {
            return Err(Error::Invalid("no indicators configured".into()).with_context(INDICATOR_SECTION));
        }
        for indicator in &self.indicators {
            if indicator.url.trim().is_empty() {
                return Err(Error::MissingKey(format!(
                    "{INDICATOR_SECTION}.indicators[{}].url",
                    indicator.key
                )));
            }
        }
        Ok(())
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_indicator_emoji() -> String {
    "📈".to_string()
}

fn default_date_field() -> String {
    "date".to_string()
}

fn default_indicator_notes() -> Vec<String> {
    vec![
        "📊 股债利差：股票收益率与债券收益率的差值".to_string(),
        "💰 巴菲特指标：股市总市值与GDP的比值".to_string(),
        "📈 市盈率分位数：当前估值在历史数据中的相对位置".to_string(),
    ]
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration document.
///
/// Report sections stay raw JSON until a report asks for one, so a broken
/// section only fails the report that uses it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub hk_config: Option<Value>,

    #[serde(default)]
    pub stock_config: Option<Value>,

    #[serde(default)]
    pub cn_config: Option<Value>,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// `LIXINGER_TOKEN`, used by sections with an empty token
    #[serde(skip)]
    lixinger_token: Option<String>,
}

impl AppConfig {
    /// Resolve the config path, load it, and apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = resolve_config_path(explicit);
        let mut config = Self::load_from(&path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .context(format!("Failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .context(format!("Failed to parse config from {}", path.display()))?;

        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("VALUATION_LOG_LEVEL") {
            self.observability.log_level = level;
        }

        if let Some(token) = lookup("LIXINGER_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.lixinger_token = Some(token);
        }
    }

    /// Parse and validate an index/stock section by key (`hk_config` or `stock_config`).
    pub fn valuation_section(&self, key: &str) -> Result<ValuationSection> {
        let raw = match key {
            HK_SECTION => self.hk_config.as_ref(),
            STOCK_SECTION => self.stock_config.as_ref(),
            _ => None,
        }
        .ok_or_else(|| Error::MissingKey(key.to_string()))?;

        let mut section: ValuationSection = serde_json::from_value(raw.clone()).context(key)?;

        if let Some(names_key) = names_key(key) {
            if let Some(names) = raw.get(names_key).filter(|v| !v.is_null()) {
                section.names = serde_json::from_value(names.clone())
                    .context(format!("{key}.{names_key}"))?;
            }
        }

        if section.lixinger.token.trim().is_empty() {
            if let Some(token) = &self.lixinger_token {
                section.lixinger.token = token.clone();
            }
        }

        section.validate(key)?;
        Ok(section)
    }

    /// Parse and validate the macro indicator section.
    pub fn indicator_section(&self) -> Result<IndicatorSection> {
        let raw = self
            .cn_config
            .as_ref()
            .ok_or_else(|| Error::MissingKey(INDICATOR_SECTION.to_string()))?;

        let section: IndicatorSection =
            serde_json::from_value(raw.clone()).context(INDICATOR_SECTION)?;

        section.validate()?;
        Ok(section)
    }
}
