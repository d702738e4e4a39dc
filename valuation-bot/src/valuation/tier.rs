//! Valuation tiers and percentile bands.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Valuation Tier
// ============================================================================

/// Five-level valuation tier derived from a historical percentile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValuationTier {
    /// 低估
    Undervalued,
    /// 偏低
    SlightlyLow,
    /// 适中
    Neutral,
    /// 偏高
    SlightlyHigh,
    /// 高估
    Overvalued,
}

impl ValuationTier {
    /// All tiers, cheapest first.
    pub const ALL: [Self; 5] = [
        Self::Undervalued,
        Self::SlightlyLow,
        Self::Neutral,
        Self::SlightlyHigh,
        Self::Overvalued,
    ];

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Undervalued => "🟢",
            Self::SlightlyLow => "🟡",
            Self::Neutral => "🟠",
            Self::SlightlyHigh | Self::Overvalued => "🔴",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Undervalued => "低估",
            Self::SlightlyLow => "偏低",
            Self::Neutral => "适中",
            Self::SlightlyHigh => "偏高",
            Self::Overvalued => "高估",
        }
    }

    /// Zone name used in the report legend.
    pub fn zone(&self) -> &'static str {
        match self {
            Self::Undervalued => "低估区域",
            Self::SlightlyLow => "偏低区域",
            Self::Neutral => "适中区域",
            Self::SlightlyHigh => "偏高区域",
            Self::Overvalued => "高估区域",
        }
    }
}

impl fmt::Display for ValuationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.emoji(), self.label())
    }
}

// ============================================================================
// Tier Bands
// ============================================================================

/// Rejected band boundaries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("tier bands must be strictly increasing within (0, 100): {0:?}")]
pub struct InvalidTierBands(pub [u8; 4]);

/// Upper bounds (in percent) of the four lower tiers.
///
/// Each band includes its upper bound: with the standard bands, 20.0 is
/// still `Undervalued` and 20.01 is `SlightlyLow`. Everything above the last
/// bound is `Overvalued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierBands {
    upper: [u8; 4],
}

impl TierBands {
    /// 20 / 40 / 60 / 80
    pub const STANDARD: Self = Self {
        upper: [20, 40, 60, 80],
    };

    pub fn new(upper: [u8; 4]) -> Result<Self, InvalidTierBands> {
        let increasing = upper.windows(2).all(|w| w[0] < w[1]);
        if !increasing || upper[0] == 0 || upper[3] >= 100 {
            return Err(InvalidTierBands(upper));
        }
        Ok(Self { upper })
    }

    /// Tier for a percentage in [0, 100].
    pub fn tier_for_percent(&self, percent: f64) -> ValuationTier {
        self.upper
            .iter()
            .zip(ValuationTier::ALL)
            .find(|(bound, _)| percent <= f64::from(**bound))
            .map(|(_, tier)| tier)
            .unwrap_or(ValuationTier::Overvalued)
    }

    /// `(lower, upper, tier)` for every band, in order.
    pub fn ranges(&self) -> [(u8, u8, ValuationTier); 5] {
        let [a, b, c, d] = self.upper;
        [
            (0, a, ValuationTier::Undervalued),
            (a, b, ValuationTier::SlightlyLow),
            (b, c, ValuationTier::Neutral),
            (c, d, ValuationTier::SlightlyHigh),
            (d, 100, ValuationTier::Overvalued),
        ]
    }
}

impl Default for TierBands {
    fn default() -> Self {
        Self::STANDARD
    }
}

// ============================================================================
// Percentile Horizons
// ============================================================================

/// Lookback window of a historical percentile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Horizon {
    ThreeYear,
    FiveYear,
    TenYear,
}

impl Horizon {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ThreeYear => "3年",
            Self::FiveYear => "5年",
            Self::TenYear => "10年",
        }
    }
}

/// PE percentiles of one stock over the three lookback windows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PercentileHorizons {
    pub y3: Option<f64>,
    pub y5: Option<f64>,
    pub y10: Option<f64>,
}

impl PercentileHorizons {
    /// Present values in display order (3y, 5y, 10y).
    pub fn present(&self) -> Vec<(Horizon, f64)> {
        [
            (Horizon::ThreeYear, self.y3),
            (Horizon::FiveYear, self.y5),
            (Horizon::TenYear, self.y10),
        ]
        .into_iter()
        .filter_map(|(h, v)| v.map(|v| (h, v)))
        .collect()
    }

    /// The value the tier is based on: 10y, else 5y, else 3y.
    ///
    /// A present value always wins, including 0.0.
    pub fn preferred(&self) -> Option<(Horizon, f64)> {
        self.y10
            .map(|v| (Horizon::TenYear, v))
            .or_else(|| self.y5.map(|v| (Horizon::FiveYear, v)))
            .or_else(|| self.y3.map(|v| (Horizon::ThreeYear, v)))
    }
}
