//! Valuation tiers.
//!
//! A historical percentile (`cvpos`) says where today's PE sits within its
//! own history. This module turns it into one of five tiers:
//!
//! | Percentile | Tier |
//! |------------|------|
//! | 0-20%      | 🟢 低估 |
//! | 20-40%     | 🟡 偏低 |
//! | 40-60%     | 🟠 适中 |
//! | 60-80%     | 🔴 偏高 |
//! | 80-100%    | 🔴 高估 |
//!
//! # Usage
//!
//! ```ignore
//! use valuation_bot::valuation::{classify, ValuationTier};
//!
//! assert_eq!(classify(0.15).tier(), Some(ValuationTier::Undervalued));
//! ```

pub mod classifier;
pub mod tier;

pub use classifier::{classify, Classification, PercentileClassifier, OUT_OF_RANGE_MARKER};
pub use tier::{Horizon, InvalidTierBands, PercentileHorizons, TierBands, ValuationTier};
