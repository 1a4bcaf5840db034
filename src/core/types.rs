use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A holding during the accumulation phase. `amount` is a currency value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetEntry {
    pub label: String,
    pub amount: Decimal,
    pub annual_rate: Decimal,
}

impl AssetEntry {
    pub fn new(label: impl Into<String>, amount: Decimal, annual_rate: Decimal) -> Self {
        Self {
            label: label.into(),
            amount,
            annual_rate,
        }
    }
}

/// A slice of the retirement portfolio. `percentage` is in [0, 100].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationEntry {
    pub label: String,
    pub percentage: Decimal,
    pub annual_rate: Decimal,
}

impl AllocationEntry {
    pub fn new(label: impl Into<String>, percentage: Decimal, annual_rate: Decimal) -> Self {
        Self {
            label: label.into(),
            percentage,
            annual_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionSchedule {
    pub annual_amount: Decimal,
}

/// Fixed draw: `annual_rate` of the balance at the start of retirement, every year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalPolicy {
    pub annual_rate: Decimal,
}

impl WithdrawalPolicy {
    pub fn annual_amount(&self, starting_balance: Decimal) -> Decimal {
        self.annual_rate * starting_balance
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionPoint {
    pub year: u32,
    pub balance: Decimal,
}

pub type ProjectionResult = Vec<ProjectionPoint>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SustainabilityVerdict {
    pub depleted: bool,
    pub depletion_year: Option<u32>,
    pub ending_balance: Decimal,
}

/// Balances of every accumulation entry for one year, in entry order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccumulationYear {
    pub year: u32,
    pub entry_balances: Vec<Decimal>,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccumulationTrace {
    pub labels: Vec<String>,
    pub years: Vec<AccumulationYear>,
}

impl AccumulationTrace {
    pub fn totals(&self) -> ProjectionResult {
        self.years
            .iter()
            .map(|y| ProjectionPoint {
                year: y.year,
                balance: y.total,
            })
            .collect()
    }

    pub fn final_total(&self) -> Decimal {
        self.years.last().map(|y| y.total).unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOutcome {
    pub withdrawal_rate: Decimal,
    pub annual_withdrawal: Decimal,
    pub projection: ProjectionResult,
    pub verdict: SustainabilityVerdict,
}
