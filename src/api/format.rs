use clap::ValueEnum;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Display currency. Only changes how numbers are rendered.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    #[serde(alias = "gbp")]
    Gbp,
    #[serde(alias = "usd")]
    Usd,
    #[serde(alias = "eur")]
    Eur,
}

impl Currency {
    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Gbp => "£",
            Currency::Usd => "$",
            Currency::Eur => "€",
        }
    }
}

/// Whole units with comma-grouped thousands, e.g. `£1,234,567`.
pub fn format_amount(currency: Currency, amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{}{grouped}", currency.symbol())
}

/// A fraction as a percent with one decimal: `0.045` -> `4.5%`.
pub fn format_rate(rate: Decimal) -> String {
    let pct = (rate * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    format!("{pct:.1}%")
}
