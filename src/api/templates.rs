use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::core::{AllocationEntry, AssetEntry, ContributionSchedule};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccumulationTemplate {
    pub name: &'static str,
    pub entries: Vec<AssetEntry>,
    pub contribution: ContributionSchedule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementTemplate {
    pub name: &'static str,
    pub entries: Vec<AllocationEntry>,
}

pub const ACCUMULATION_TEMPLATE_NAMES: [&str; 3] = ["Conservative", "Balanced", "Aggressive"];
pub const RETIREMENT_TEMPLATE_NAMES: [&str; 3] = ["Conservative", "Moderate", "Balanced"];

// (label, starting amount, yearly contribution, growth rate)
type AssetRow = (&'static str, Decimal, Decimal, Decimal);

fn accumulation_rows(name: &str) -> Option<(&'static str, [AssetRow; 3])> {
    let rows = match name.to_ascii_lowercase().as_str() {
        "conservative" => (
            "Conservative",
            [
                ("Government Bonds", dec!(30000), dec!(5000), dec!(0.03)),
                ("Corporate Bonds", dec!(20000), dec!(3000), dec!(0.04)),
                ("Dividend Stocks", dec!(15000), dec!(2000), dec!(0.06)),
            ],
        ),
        "balanced" => (
            "Balanced",
            [
                ("Index Funds", dec!(40000), dec!(8000), dec!(0.07)),
                ("Bonds", dec!(25000), dec!(4000), dec!(0.04)),
                ("International Stocks", dec!(15000), dec!(3000), dec!(0.08)),
            ],
        ),
        "aggressive" => (
            "Aggressive",
            [
                ("Growth Stocks", dec!(35000), dec!(7000), dec!(0.10)),
                ("Tech Stocks", dec!(25000), dec!(5000), dec!(0.12)),
                ("Emerging Markets", dec!(15000), dec!(3000), dec!(0.09)),
            ],
        ),
        _ => return None,
    };
    Some(rows)
}

/// Looks up an accumulation preset by name, ignoring case. The preset's yearly
/// contribution is the sum of its per-asset contributions.
pub fn accumulation_template(name: &str) -> Option<AccumulationTemplate> {
    let (name, rows) = accumulation_rows(name)?;
    Some(AccumulationTemplate {
        name,
        entries: rows
            .iter()
            .map(|(label, amount, _, rate)| AssetEntry::new(*label, *amount, *rate))
            .collect(),
        contribution: ContributionSchedule {
            annual_amount: rows.iter().map(|(_, _, annual, _)| *annual).sum(),
        },
    })
}

pub fn retirement_template(name: &str) -> Option<RetirementTemplate> {
    let (name, rows): (&'static str, [(&'static str, Decimal, Decimal); 3]) =
        match name.to_ascii_lowercase().as_str() {
            "conservative" => (
                "Conservative",
                [
                    ("Treasury Bonds", dec!(70), dec!(0.03)),
                    ("High-Yield Savings", dec!(20), dec!(0.02)),
                    ("Dividend Stocks", dec!(10), dec!(0.05)),
                ],
            ),
            "moderate" => (
                "Moderate",
                [
                    ("Government Bonds", dec!(50), dec!(0.03)),
                    ("Corporate Bonds", dec!(30), dec!(0.04)),
                    ("Dividend Stocks", dec!(20), dec!(0.06)),
                ],
            ),
            "balanced" => (
                "Balanced",
                [
                    ("Bonds", dec!(40), dec!(0.035)),
                    ("Dividend Stocks", dec!(40), dec!(0.06)),
                    ("Growth Stocks", dec!(20), dec!(0.08)),
                ],
            ),
            _ => return None,
        };

    Some(RetirementTemplate {
        name,
        entries: rows
            .iter()
            .map(|(label, pct, rate)| AllocationEntry::new(*label, *pct, *rate))
            .collect(),
    })
}

pub fn accumulation_templates() -> Vec<AccumulationTemplate> {
    ACCUMULATION_TEMPLATE_NAMES
        .iter()
        .filter_map(|name| accumulation_template(name))
        .collect()
}

pub fn retirement_templates() -> Vec<RetirementTemplate> {
    RETIREMENT_TEMPLATE_NAMES
        .iter()
        .filter_map(|name| retirement_template(name))
        .collect()
}
