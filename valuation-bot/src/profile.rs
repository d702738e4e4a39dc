//! Report variants.
//!
//! Everything that differs between the Hong Kong index and the stock
//! reports lives in a [`ReportProfile`]; the pipeline and formatter are
//! shared.

use chrono::{Duration, NaiveDate};
use std::fmt;

use valuation_common::config::{HK_SECTION, INDICATOR_SECTION, STOCK_SECTION};

use crate::report::JoinPolicy;
use crate::valuation::TierBands;

/// Lixinger metric holding the 10y market-cap-weighted PE percentile of an index.
pub const INDEX_PE_PERCENTILE_10Y: &str = "pe_ttm.y10.mcw.cvpos";
pub const STOCK_PE_TTM: &str = "pe_ttm";
pub const STOCK_PE_PERCENTILE_3Y: &str = "pe_ttm.y3.cvpos";
pub const STOCK_PE_PERCENTILE_5Y: &str = "pe_ttm.y5.cvpos";
pub const STOCK_PE_PERCENTILE_10Y: &str = "pe_ttm.y10.cvpos";

/// Which report a run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    HkIndex,
    Stock,
    Indicator,
}

impl ReportKind {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::HkIndex => "hk_index",
            Self::Stock => "stock",
            Self::Indicator => "indicator",
        }
    }

    /// Configuration section holding this report's settings.
    pub fn section(&self) -> &'static str {
        match self {
            Self::HkIndex => HK_SECTION,
            Self::Stock => STOCK_SECTION,
            Self::Indicator => INDICATOR_SECTION,
        }
    }

    /// DingTalk message title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::HkIndex => "港股指数估值播报",
            Self::Stock => "股票估值播报",
            Self::Indicator => "股票指标数据播报",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the date asked of the provider is chosen when none is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePolicy {
    /// `days` before today; recent days may not be published yet
    Lagged { days: i64 },
    /// Today; the provider answers with whatever it has last
    Latest,
}

impl DatePolicy {
    pub const DEFAULT_LAG_DAYS: i64 = 7;

    /// An explicit date always wins.
    pub fn effective_date(&self, explicit: Option<NaiveDate>, today: NaiveDate) -> NaiveDate {
        if let Some(date) = explicit {
            return date;
        }
        match self {
            Self::Lagged { days } => today
                .checked_sub_signed(Duration::days(*days))
                .unwrap_or(today),
            Self::Latest => today,
        }
    }
}

impl Default for DatePolicy {
    fn default() -> Self {
        Self::Lagged {
            days: Self::DEFAULT_LAG_DAYS,
        }
    }
}

/// Shape of a per-record line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTemplate {
    /// Name, 10y percentile, tier
    Index,
    /// Name and code, PE, 3y/5y/10y percentiles, tier
    Stock,
}

/// Parameters of a valuation report variant.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportProfile {
    pub kind: ReportKind,
    /// First line of the report
    pub heading: &'static str,
    /// Whole message when no data came back
    pub failure_sentence: &'static str,
    /// Display name prefix for codes missing from the name map
    pub placeholder_prefix: &'static str,
    /// Metrics requested from the provider
    pub metrics: &'static [&'static str],
    pub template: LineTemplate,
    pub join: JoinPolicy,
    pub date_policy: DatePolicy,
    pub bands: TierBands,
}

impl ReportProfile {
    /// Hong Kong index report.
    pub fn hk_index() -> Self {
        Self {
            kind: ReportKind::HkIndex,
            heading: "🇭🇰 **港股指数估值播报**",
            failure_sentence: "📊 港股指数估值数据获取失败",
            placeholder_prefix: "指数",
            metrics: &[INDEX_PE_PERCENTILE_10Y],
            template: LineTemplate::Index,
            join: JoinPolicy::ParagraphBreak,
            date_policy: DatePolicy::default(),
            bands: TierBands::STANDARD,
        }
    }

    /// Stock report.
    pub fn stock() -> Self {
        Self {
            kind: ReportKind::Stock,
            heading: "📊 **股票估值播报**",
            failure_sentence: "📊 股票估值数据获取失败",
            placeholder_prefix: "股票",
            metrics: &[
                STOCK_PE_TTM,
                STOCK_PE_PERCENTILE_3Y,
                STOCK_PE_PERCENTILE_5Y,
                STOCK_PE_PERCENTILE_10Y,
            ],
            template: LineTemplate::Stock,
            join: JoinPolicy::HardLineBreak,
            date_policy: DatePolicy::default(),
            bands: TierBands::STANDARD,
        }
    }

    /// Profile for a valuation report kind. The indicator report has none.
    pub fn for_kind(kind: ReportKind) -> Option<Self> {
        match kind {
            ReportKind::HkIndex => Some(Self::hk_index()),
            ReportKind::Stock => Some(Self::stock()),
            ReportKind::Indicator => None,
        }
    }

    pub fn title(&self) -> &'static str {
        self.kind.title()
    }

    pub fn metric_names(&self) -> Vec<String> {
        self.metrics.iter().map(|m| m.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_lagged_date_policy() {
        let today = date(2024, 12, 27);
        let policy = DatePolicy::default();

        assert_eq!(policy.effective_date(None, today), date(2024, 12, 20));
        assert_eq!(
            policy.effective_date(Some(date(2024, 1, 2)), today),
            date(2024, 1, 2)
        );

        // Crosses a year boundary
        assert_eq!(policy.effective_date(None, date(2025, 1, 3)), date(2024, 12, 27));
    }

    #[test]
    fn test_latest_date_policy() {
        let today = date(2024, 12, 27);
        assert_eq!(DatePolicy::Latest.effective_date(None, today), today);
    }

    #[test]
    fn test_profiles() {
        let hk = ReportProfile::hk_index();
        assert_eq!(hk.title(), "港股指数估值播报");
        assert_eq!(hk.metric_names(), vec!["pe_ttm.y10.mcw.cvpos"]);
        assert_eq!(hk.join, JoinPolicy::ParagraphBreak);
        assert_eq!(hk.kind.section(), "hk_config");

        let stock = ReportProfile::stock();
        assert_eq!(stock.metrics.len(), 4);
        assert_eq!(stock.join, JoinPolicy::HardLineBreak);
        assert_eq!(stock.kind.section(), "stock_config");

        assert!(ReportProfile::for_kind(ReportKind::Indicator).is_none());
        assert_eq!(ReportKind::Indicator.section(), "cn_config");
    }
}
