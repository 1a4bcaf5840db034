use rust_decimal::Decimal;

use super::error::{EngineError, Result};
use super::types::{AllocationEntry, AssetEntry};

/// Anything that contributes a weighted growth rate to a portfolio.
pub trait Weighted {
    fn weight(&self) -> Decimal;
    fn annual_rate(&self) -> Decimal;
}

impl Weighted for AssetEntry {
    fn weight(&self) -> Decimal {
        self.amount
    }

    fn annual_rate(&self) -> Decimal {
        self.annual_rate
    }
}

impl Weighted for AllocationEntry {
    fn weight(&self) -> Decimal {
        self.percentage
    }

    fn annual_rate(&self) -> Decimal {
        self.annual_rate
    }
}

/// Weighted-average growth rate: `sum(w * r) / sum(w)`.
///
/// Amounts and percentages blend the same way; only the meaning of the weight
/// differs. Entries with zero weight do not affect the result.
pub fn blend<W: Weighted>(entries: &[W]) -> Result<Decimal> {
    let mut total_weight = Decimal::ZERO;
    let mut weighted_sum = Decimal::ZERO;
    let mut min_rate: Option<Decimal> = None;
    let mut max_rate: Option<Decimal> = None;

    for entry in entries {
        let weight = entry.weight();
        if weight.is_zero() {
            continue;
        }
        let rate = entry.annual_rate();
        total_weight += weight;
        weighted_sum += weight * rate;
        min_rate = Some(min_rate.map_or(rate, |m| m.min(rate)));
        max_rate = Some(max_rate.map_or(rate, |m| m.max(rate)));
    }

    let (Some(lo), Some(hi)) = (min_rate, max_rate) else {
        return Err(EngineError::ZeroWeight);
    };
    if total_weight <= Decimal::ZERO {
        return Err(EngineError::ZeroWeight);
    }

    // The quotient is rounded to 28 digits; keep it inside the rate hull.
    Ok((weighted_sum / total_weight).clamp(lo, hi))
}
