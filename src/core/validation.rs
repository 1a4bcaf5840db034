use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::error::{EngineError, Result};
use super::types::{AllocationEntry, AssetEntry};

const FULL_ALLOCATION: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Allowed distance, in percentage points, between the allocation total and 100.
    pub epsilon: Decimal,
    /// Accept negative growth rates, e.g. to stress-test a downturn.
    pub allow_negative_rates: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            epsilon: dec!(0.01),
            allow_negative_rates: false,
        }
    }
}

pub fn validate(entries: &[AllocationEntry]) -> Result<()> {
    validate_with(entries, &ValidationConfig::default())
}

pub fn validate_with(entries: &[AllocationEntry], config: &ValidationConfig) -> Result<()> {
    if entries.is_empty() {
        return Err(EngineError::EmptyPortfolio);
    }

    for entry in entries {
        if entry.percentage < Decimal::ZERO {
            return Err(EngineError::NegativeValue {
                field: "percentage",
                entry: entry.label.clone(),
            });
        }
        check_rate(&entry.label, entry.annual_rate, config)?;
    }

    let total: Decimal = entries.iter().map(|e| e.percentage).sum();
    if (total - FULL_ALLOCATION).abs() > config.epsilon {
        return Err(EngineError::AllocationSum { total });
    }
    Ok(())
}

/// Accumulation entries carry amounts, so there is no sum rule.
pub fn validate_assets(entries: &[AssetEntry], config: &ValidationConfig) -> Result<()> {
    if entries.is_empty() {
        return Err(EngineError::EmptyPortfolio);
    }

    for entry in entries {
        check_amount(&entry.label, entry.amount)?;
        check_rate(&entry.label, entry.annual_rate, config)?;
    }
    Ok(())
}

pub(crate) fn check_amount(label: &str, amount: Decimal) -> Result<()> {
    if amount < Decimal::ZERO {
        return Err(EngineError::NegativeValue {
            field: "amount",
            entry: label.to_string(),
        });
    }
    Ok(())
}

/// A rate of -1 or below wipes out (or inverts) the balance every year and is
/// never accepted, even when negative rates are.
pub(crate) fn check_growth_rate(label: &str, rate: Decimal) -> Result<()> {
    if rate <= Decimal::NEGATIVE_ONE {
        return Err(EngineError::InvalidGrowthRate {
            entry: label.to_string(),
            rate,
        });
    }
    Ok(())
}

fn check_rate(label: &str, rate: Decimal, config: &ValidationConfig) -> Result<()> {
    if rate < Decimal::ZERO && !config.allow_negative_rates {
        return Err(EngineError::NegativeValue {
            field: "annual_rate",
            entry: label.to_string(),
        });
    }
    check_growth_rate(label, rate)
}
