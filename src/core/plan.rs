use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::debug;

use super::blend::blend;
use super::engine::{compare, project_trace};
use super::error::{EngineError, Result};
use super::types::{
    AccumulationTrace, AllocationEntry, AssetEntry, ContributionSchedule, ScenarioOutcome,
};
use super::validation::{ValidationConfig, validate_assets, validate_with};

const MILESTONE_YEARS: [u32; 2] = [5, 10];
const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Everything needed to run both phases of a plan.
#[derive(Debug, Clone)]
pub struct PlanInputs {
    pub accumulation: Vec<AssetEntry>,
    pub contribution: ContributionSchedule,
    pub years_to_retirement: u32,
    pub retirement: Vec<AllocationEntry>,
    pub retirement_years: u32,
    pub withdrawal_rates: Vec<Decimal>,
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub year: u32,
    pub total: Decimal,
    pub growth: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    #[serde(flatten)]
    pub outcome: ScenarioOutcome,
    pub monthly_withdrawal: Decimal,
    pub sustainable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport {
    pub starting_total: Decimal,
    pub annual_contribution: Decimal,
    /// `None` when every starting amount is zero.
    pub accumulation_rate: Option<Decimal>,
    pub accumulation: AccumulationTrace,
    pub milestones: Vec<Milestone>,
    pub retirement_balance: Decimal,
    pub retirement_rate: Decimal,
    pub scenarios: Vec<ScenarioReport>,
}

/// Validates both portfolios, projects accumulation, then compares withdrawal
/// rates starting from the projected retirement balance.
pub fn run_plan(inputs: &PlanInputs) -> Result<PlanReport> {
    validate_assets(&inputs.accumulation, &inputs.validation)?;
    validate_with(&inputs.retirement, &inputs.validation)?;

    let accumulation_rate = match blend(&inputs.accumulation) {
        Ok(rate) => Some(rate),
        Err(EngineError::ZeroWeight) => None,
        Err(e) => return Err(e),
    };

    let trace = project_trace(
        &inputs.accumulation,
        &inputs.contribution,
        i64::from(inputs.years_to_retirement),
    )?;
    let starting_total = trace.years.first().map_or(Decimal::ZERO, |y| y.total);
    let retirement_balance = trace.final_total();
    let milestones = milestones(&trace, inputs.years_to_retirement, starting_total);

    let retirement_rate = blend(&inputs.retirement)?;
    let outcomes = compare(
        retirement_balance,
        retirement_rate,
        &inputs.withdrawal_rates,
        i64::from(inputs.retirement_years),
    )?;

    debug!(
        retirement_balance = %retirement_balance,
        retirement_rate = %retirement_rate,
        scenarios = outcomes.len(),
        "plan projected"
    );

    let scenarios = outcomes
        .into_iter()
        .map(|outcome| ScenarioReport {
            monthly_withdrawal: outcome.annual_withdrawal / MONTHS_PER_YEAR,
            sustainable: !outcome.verdict.depleted,
            outcome,
        })
        .collect();

    Ok(PlanReport {
        starting_total,
        annual_contribution: inputs.contribution.annual_amount,
        accumulation_rate,
        accumulation: trace,
        milestones,
        retirement_balance,
        retirement_rate,
        scenarios,
    })
}

fn milestones(trace: &AccumulationTrace, retirement_year: u32, start: Decimal) -> Vec<Milestone> {
    let mut years: Vec<u32> = MILESTONE_YEARS
        .into_iter()
        .filter(|y| *y <= retirement_year)
        .collect();
    if !years.contains(&retirement_year) {
        years.push(retirement_year);
    }

    years
        .into_iter()
        .filter_map(|year| trace.years.get(year as usize))
        .map(|y| Milestone {
            year: y.year,
            total: y.total,
            growth: y.total - start,
        })
        .collect()
}
