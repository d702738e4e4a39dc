//! Percentile classifier.
//!
//! Maps a historical percentile (a fraction in [0,1] as returned by the
//! provider's `cvpos` metrics) to a [`ValuationTier`].

use super::tier::{Horizon, PercentileHorizons, TierBands, ValuationTier};

/// Outcome of classifying one percentile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification {
    Tier(ValuationTier),
    /// Outside [0,1] or not finite. Shown to the reader, never tiered.
    OutOfRange(f64),
}

impl Classification {
    pub fn tier(&self) -> Option<ValuationTier> {
        match self {
            Self::Tier(tier) => Some(*tier),
            Self::OutOfRange(_) => None,
        }
    }
}

/// Marker shown in place of a tier when the percentile is out of range.
pub const OUT_OF_RANGE_MARKER: &str = "⚠️ 百分位异常";

/// Percentile classifier over a set of tier bands.
#[derive(Debug, Clone, Copy, Default)]
pub struct PercentileClassifier {
    bands: TierBands,
}

impl PercentileClassifier {
    pub fn new(bands: TierBands) -> Self {
        Self { bands }
    }

    pub fn bands(&self) -> &TierBands {
        &self.bands
    }

    /// Classify a fraction in [0,1].
    pub fn classify(&self, fraction: f64) -> Classification {
        if !(0.0..=1.0).contains(&fraction) {
            return Classification::OutOfRange(fraction);
        }
        Classification::Tier(self.bands.tier_for_percent(fraction * 100.0))
    }

    /// Classify a percentage in [0,100].
    pub fn classify_percent(&self, percent: f64) -> Classification {
        if !(0.0..=100.0).contains(&percent) {
            return Classification::OutOfRange(percent / 100.0);
        }
        Classification::Tier(self.bands.tier_for_percent(percent))
    }

    /// Classify the preferred horizon (10y, then 5y, then 3y).
    ///
    /// Returns `None` when no horizon is present.
    pub fn classify_horizons(
        &self,
        horizons: &PercentileHorizons,
    ) -> Option<(Horizon, Classification)> {
        horizons
            .preferred()
            .map(|(horizon, value)| (horizon, self.classify(value)))
    }
}

/// Classify a fraction with the standard 20/40/60/80 bands.
pub fn classify(fraction: f64) -> Classification {
    PercentileClassifier::default().classify(fraction)
}
