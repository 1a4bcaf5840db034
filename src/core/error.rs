use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Failures raised by the projection engine. Every variant describes bad input;
/// the engine never substitutes a default for it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("allocation percentages total {total}, expected 100")]
    AllocationSum { total: Decimal },

    #[error("blended rate needs a positive total weight")]
    ZeroWeight,

    #[error("{field} of '{entry}' must not be negative")]
    NegativeValue { field: &'static str, entry: String },

    #[error("horizon of {years} years is invalid, expected >= 0")]
    InvalidHorizon { years: i64 },

    #[error("starting balance {balance} must not be negative")]
    NegativeBalanceInput { balance: Decimal },

    #[error("portfolio has no entries")]
    EmptyPortfolio,

    #[error("withdrawal rate {rate} must be between 0 and 1 (exclusive)")]
    InvalidWithdrawalRate { rate: Decimal },

    #[error("growth rate {rate} of '{entry}' must be greater than -1")]
    InvalidGrowthRate { entry: String, rate: Decimal },

    #[error("balance overflowed in year {year}")]
    Overflow { year: u32 },
}
