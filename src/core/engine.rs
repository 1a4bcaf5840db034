use rust_decimal::Decimal;
use tracing::debug;

use super::error::{EngineError, Result};
use super::types::{
    AccumulationTrace, AccumulationYear, AssetEntry, ContributionSchedule, ProjectionPoint,
    ProjectionResult, ScenarioOutcome, SustainabilityVerdict, WithdrawalPolicy,
};
use super::validation::{check_amount, check_growth_rate};

/// Year-by-year total of an accumulating portfolio, year 0 first.
pub fn project(
    entries: &[AssetEntry],
    contribution: &ContributionSchedule,
    years: i64,
) -> Result<ProjectionResult> {
    Ok(project_trace(entries, contribution, years)?.totals())
}

/// Like [`project`], keeping every entry's balance for every year.
///
/// Each entry compounds at its own rate. The yearly contribution is then split
/// in proportion to the entries' post-growth balances, so a fast-growing entry
/// attracts a growing share of new money.
pub fn project_trace(
    entries: &[AssetEntry],
    contribution: &ContributionSchedule,
    years: i64,
) -> Result<AccumulationTrace> {
    let horizon = horizon(years)?;
    if entries.is_empty() {
        return Err(EngineError::EmptyPortfolio);
    }
    for entry in entries {
        check_amount(&entry.label, entry.amount)?;
        check_growth_rate(&entry.label, entry.annual_rate)?;
    }
    if contribution.annual_amount < Decimal::ZERO {
        return Err(EngineError::NegativeValue {
            field: "annual_contribution",
            entry: "contribution schedule".to_string(),
        });
    }

    let mut balances: Vec<Decimal> = entries.iter().map(|e| e.amount).collect();
    let mut trace = Vec::with_capacity(horizon as usize + 1);
    trace.push(snapshot(0, &balances)?);

    for year in 1..=horizon {
        for (balance, entry) in balances.iter_mut().zip(entries) {
            *balance = grow(*balance, entry.annual_rate, year)?;
        }
        distribute_contribution(&mut balances, contribution.annual_amount, year)?;
        trace.push(snapshot(year, &balances)?);
    }

    Ok(AccumulationTrace {
        labels: entries.iter().map(|e| e.label.clone()).collect(),
        years: trace,
    })
}

/// Fixed-draw decumulation from `starting_balance`.
///
/// The withdrawal is `withdrawal.annual_rate * starting_balance`, fixed for the
/// whole horizon. Each year grows first, then withdraws. A balance that reaches
/// zero (exactly or by overdrawing) is depleted and stays at zero.
pub fn simulate(
    starting_balance: Decimal,
    blended_rate: Decimal,
    withdrawal: &WithdrawalPolicy,
    years: i64,
) -> Result<(ProjectionResult, SustainabilityVerdict)> {
    let horizon = horizon(years)?;
    if starting_balance < Decimal::ZERO {
        return Err(EngineError::NegativeBalanceInput {
            balance: starting_balance,
        });
    }
    check_withdrawal_rate(withdrawal.annual_rate)?;
    check_growth_rate("blended portfolio", blended_rate)?;

    let annual_withdrawal = withdrawal.annual_amount(starting_balance);
    let mut balance = starting_balance;
    let mut depletion_year = None;
    let mut projection = Vec::with_capacity(horizon as usize + 1);
    projection.push(ProjectionPoint { year: 0, balance });

    for year in 1..=horizon {
        if depletion_year.is_none() {
            balance = grow(balance, blended_rate, year)? - annual_withdrawal;
            if balance <= Decimal::ZERO {
                balance = Decimal::ZERO;
                depletion_year = Some(year);
            }
        }
        projection.push(ProjectionPoint { year, balance });
    }

    let verdict = SustainabilityVerdict {
        depleted: depletion_year.is_some(),
        depletion_year,
        ending_balance: balance,
    };
    Ok((projection, verdict))
}

/// Runs [`simulate`] once per distinct withdrawal rate, in the order given.
///
/// Every scenario starts from the same balance and growth rate. A repeated rate
/// keeps its first position. One failing scenario fails the comparison.
pub fn compare(
    starting_balance: Decimal,
    blended_rate: Decimal,
    rates: &[Decimal],
    years: i64,
) -> Result<Vec<ScenarioOutcome>> {
    let mut outcomes: Vec<ScenarioOutcome> = Vec::with_capacity(rates.len());
    for &rate in rates {
        if outcomes.iter().any(|o| o.withdrawal_rate == rate) {
            continue;
        }
        let policy = WithdrawalPolicy { annual_rate: rate };
        let (projection, verdict) = simulate(starting_balance, blended_rate, &policy, years)?;
        if let Some(year) = verdict.depletion_year {
            debug!(rate = %rate, year, "withdrawal scenario depletes");
        }
        outcomes.push(ScenarioOutcome {
            withdrawal_rate: rate,
            annual_withdrawal: policy.annual_amount(starting_balance),
            projection,
            verdict,
        });
    }
    Ok(outcomes)
}

fn horizon(years: i64) -> Result<u32> {
    u32::try_from(years).map_err(|_| EngineError::InvalidHorizon { years })
}

fn check_withdrawal_rate(rate: Decimal) -> Result<()> {
    if rate <= Decimal::ZERO || rate >= Decimal::ONE {
        return Err(EngineError::InvalidWithdrawalRate { rate });
    }
    Ok(())
}

fn grow(balance: Decimal, rate: Decimal, year: u32) -> Result<Decimal> {
    balance
        .checked_mul(Decimal::ONE + rate)
        .ok_or(EngineError::Overflow { year })
}

/// Adds `amount` across `balances` by share of their current total. The last
/// entry takes whatever the earlier shares leave, so nothing is lost to rounding.
/// Earlier shares are capped at what is still unallocated, so that remainder is
/// never negative.
fn distribute_contribution(balances: &mut [Decimal], amount: Decimal, year: u32) -> Result<()> {
    if amount.is_zero() || balances.is_empty() {
        return Ok(());
    }

    let total = sum(balances, year)?;
    let count = Decimal::from(balances.len());
    let last = balances.len() - 1;
    let mut allocated = Decimal::ZERO;

    for (idx, balance) in balances.iter_mut().enumerate() {
        let unallocated = amount - allocated;
        let share = if idx == last {
            unallocated
        } else if total.is_zero() {
            (amount / count).min(unallocated)
        } else {
            let exact = amount
                .checked_mul(*balance)
                .ok_or(EngineError::Overflow { year })?
                / total;
            exact.min(unallocated)
        };
        allocated += share;
        *balance = balance
            .checked_add(share)
            .ok_or(EngineError::Overflow { year })?;
    }
    Ok(())
}

fn sum(balances: &[Decimal], year: u32) -> Result<Decimal> {
    balances
        .iter()
        .try_fold(Decimal::ZERO, |acc, b| acc.checked_add(*b))
        .ok_or(EngineError::Overflow { year })
}

fn snapshot(year: u32, balances: &[Decimal]) -> Result<AccumulationYear> {
    Ok(AccumulationYear {
        year,
        entry_balances: balances.to_vec(),
        total: sum(balances, year)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};
    use rust_decimal_macros::dec;

    fn balances(result: &ProjectionResult) -> Vec<Decimal> {
        result.iter().map(|p| p.balance).collect()
    }

    fn assert_close(actual: Decimal, expected: Decimal) {
        assert!(
            (actual - expected).abs() <= dec!(0.000000001),
            "expected {expected}, got {actual}"
        );
    }

    fn no_contribution() -> ContributionSchedule {
        ContributionSchedule::default()
    }

    fn policy(rate: Decimal) -> WithdrawalPolicy {
        WithdrawalPolicy { annual_rate: rate }
    }

    #[test]
    fn single_entry_compounds_exactly() {
        let entries = vec![AssetEntry::new("ISA", dec!(1000), dec!(0.10))];
        let result = project(&entries, &no_contribution(), 3).unwrap();

        assert_eq!(
            balances(&result),
            vec![dec!(1000), dec!(1100), dec!(1210), dec!(1331)]
        );
        let years: Vec<u32> = result.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![0, 1, 2, 3]);
    }

    #[test]
    fn contribution_is_split_by_post_growth_share() {
        let entries = vec![
            AssetEntry::new("Stocks", dec!(1000), dec!(0.20)),
            AssetEntry::new("Bonds", dec!(1000), dec!(0)),
        ];
        let contribution = ContributionSchedule {
            annual_amount: dec!(2200),
        };
        let trace = project_trace(&entries, &contribution, 1).unwrap();

        // After growth: 1200 and 1000, so the 2200 splits 1200 / 1000.
        let year_one = &trace.years[1];
        assert_eq!(year_one.entry_balances, vec![dec!(2400), dec!(2000)]);
        assert_eq!(year_one.total, dec!(4400));
    }

    #[test]
    fn contribution_is_not_applied_in_year_zero() {
        let entries = vec![AssetEntry::new("ISA", dec!(5000), dec!(0.05))];
        let contribution = ContributionSchedule {
            annual_amount: dec!(1000),
        };
        let result = project(&entries, &contribution, 0).unwrap();
        assert_eq!(result, vec![ProjectionPoint {
            year: 0,
            balance: dec!(5000)
        }]);
    }

    #[test]
    fn contribution_into_empty_portfolio_is_split_equally() {
        let entries = vec![
            AssetEntry::new("A", dec!(0), dec!(0.10)),
            AssetEntry::new("B", dec!(0), dec!(0.05)),
        ];
        let contribution = ContributionSchedule {
            annual_amount: dec!(1000),
        };
        let trace = project_trace(&entries, &contribution, 2).unwrap();

        assert_eq!(trace.years[1].entry_balances, vec![dec!(500), dec!(500)]);
        // Year 2: 550 and 525 grow, then 1000 splits by 550:525.
        assert_close(trace.years[2].total, dec!(2075));
        assert_close(trace.years[2].entry_balances[0], dec!(1061.627906976744186046511628));
        assert_eq!(trace.labels, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn rounded_up_shares_never_push_the_last_entry_negative() {
        let entries = vec![
            AssetEntry::new("A", dec!(1), dec!(0)),
            AssetEntry::new("B", dec!(1), dec!(0)),
            AssetEntry::new("C", dec!(1), dec!(0)),
            AssetEntry::new("D", dec!(0), dec!(0)),
        ];
        let contribution = ContributionSchedule {
            annual_amount: dec!(2),
        };
        let trace = project_trace(&entries, &contribution, 1).unwrap();

        // 2/3 rounds up at the last digit; the capped third share absorbs it.
        let year_one = &trace.years[1];
        assert!(year_one.entry_balances.iter().all(|b| *b >= Decimal::ZERO));
        assert_eq!(year_one.entry_balances[3], Decimal::ZERO);
        assert_eq!(year_one.total, dec!(5));
    }

    #[test]
    fn projector_rejects_bad_inputs() {
        let entries = vec![AssetEntry::new("ISA", dec!(1000), dec!(0.07))];
        assert_eq!(
            project(&entries, &no_contribution(), -1),
            Err(EngineError::InvalidHorizon { years: -1 })
        );
        assert_eq!(
            project(&[], &no_contribution(), 5),
            Err(EngineError::EmptyPortfolio)
        );

        let negative = ContributionSchedule {
            annual_amount: dec!(-1),
        };
        assert!(matches!(
            project(&entries, &negative, 5),
            Err(EngineError::NegativeValue {
                field: "annual_contribution",
                ..
            })
        ));

        let overdrawn = vec![AssetEntry::new("Loan", dec!(-5), dec!(0.07))];
        assert!(matches!(
            project(&overdrawn, &no_contribution(), 5),
            Err(EngineError::NegativeValue { field: "amount", .. })
        ));
    }

    #[test]
    fn runaway_growth_reports_overflow() {
        let entries = vec![AssetEntry::new("Moonshot", dec!(1_000_000_000), dec!(100))];
        assert!(matches!(
            project(&entries, &no_contribution(), 60),
            Err(EngineError::Overflow { .. })
        ));
    }

    #[test]
    fn depletion_is_detected_at_exact_exhaustion() {
        let (projection, verdict) =
            simulate(dec!(100000), dec!(0), &policy(dec!(0.10)), 12).unwrap();

        assert_eq!(projection.len(), 13);
        assert_eq!(projection[9].balance, dec!(10000));
        assert_eq!(projection[10].balance, Decimal::ZERO);
        assert_eq!(projection[11].balance, Decimal::ZERO);
        assert_eq!(projection[12].balance, Decimal::ZERO);
        assert_eq!(
            verdict,
            SustainabilityVerdict {
                depleted: true,
                depletion_year: Some(10),
                ending_balance: Decimal::ZERO,
            }
        );
    }

    #[test]
    fn overdrawn_balance_clamps_to_zero() {
        let (projection, verdict) =
            simulate(dec!(100000), dec!(0), &policy(dec!(0.30)), 5).unwrap();
        assert_eq!(
            balances(&projection),
            vec![
                dec!(100000),
                dec!(70000),
                dec!(40000),
                dec!(10000),
                dec!(0),
                dec!(0)
            ]
        );
        assert_eq!(verdict.depletion_year, Some(4));
        assert!(projection.iter().all(|p| p.balance >= Decimal::ZERO));
    }

    #[test]
    fn zero_starting_balance_is_depleted_in_year_one() {
        let (projection, verdict) =
            simulate(dec!(0), dec!(0.05), &policy(dec!(0.04)), 3).unwrap();
        assert_eq!(balances(&projection), vec![dec!(0); 4]);
        assert_eq!(
            verdict,
            SustainabilityVerdict {
                depleted: true,
                depletion_year: Some(1),
                ending_balance: Decimal::ZERO,
            }
        );
    }

    #[test]
    fn growth_is_applied_before_withdrawal() {
        let (projection, verdict) =
            simulate(dec!(100000), dec!(0.05), &policy(dec!(0.04)), 2).unwrap();
        // 100000 * 1.05 - 4000 = 101000; 101000 * 1.05 - 4000 = 102050
        assert_eq!(
            balances(&projection),
            vec![dec!(100000), dec!(101000), dec!(102050)]
        );
        assert!(!verdict.depleted);
        assert_eq!(verdict.depletion_year, None);
        assert_eq!(verdict.ending_balance, dec!(102050));
    }

    #[test]
    fn zero_horizon_returns_the_starting_point() {
        let (projection, verdict) =
            simulate(dec!(250000), dec!(0.04), &policy(dec!(0.04)), 0).unwrap();
        assert_eq!(projection, vec![ProjectionPoint {
            year: 0,
            balance: dec!(250000)
        }]);
        assert!(!verdict.depleted);
        assert_eq!(verdict.ending_balance, dec!(250000));

        let entries = vec![
            AssetEntry::new("A", dec!(1500), dec!(0.04)),
            AssetEntry::new("B", dec!(2500), dec!(0.09)),
        ];
        let result = project(&entries, &no_contribution(), 0).unwrap();
        assert_eq!(balances(&result), vec![dec!(4000)]);
    }

    #[test]
    fn simulator_rejects_bad_inputs() {
        assert_eq!(
            simulate(dec!(1000), dec!(0.05), &policy(dec!(0.04)), -3),
            Err(EngineError::InvalidHorizon { years: -3 })
        );
        assert_eq!(
            simulate(dec!(-1), dec!(0.05), &policy(dec!(0.04)), 3),
            Err(EngineError::NegativeBalanceInput { balance: dec!(-1) })
        );
        for rate in [dec!(0), dec!(1), dec!(-0.02), dec!(1.5)] {
            assert_eq!(
                simulate(dec!(1000), dec!(0.05), &policy(rate), 3),
                Err(EngineError::InvalidWithdrawalRate { rate })
            );
        }
        assert!(matches!(
            simulate(dec!(1000), dec!(-1), &policy(dec!(0.04)), 3),
            Err(EngineError::InvalidGrowthRate { .. })
        ));
    }

    #[test]
    fn comparator_orders_scenarios_as_given_and_drops_repeats() {
        let rates = [dec!(0.05), dec!(0.03), dec!(0.05), dec!(0.04)];
        let outcomes = compare(dec!(500000), dec!(0.05), &rates, 30).unwrap();

        let order: Vec<Decimal> = outcomes.iter().map(|o| o.withdrawal_rate).collect();
        assert_eq!(order, vec![dec!(0.05), dec!(0.03), dec!(0.04)]);
        assert_eq!(outcomes[0].annual_withdrawal, dec!(25000));
        assert_eq!(outcomes[1].annual_withdrawal, dec!(15000));
    }

    #[test]
    fn comparator_matches_independent_simulations() {
        let rates = [dec!(0.03), dec!(0.04), dec!(0.05)];
        let outcomes = compare(dec!(500000), dec!(0.05), &rates, 30).unwrap();
        for outcome in &outcomes {
            let (projection, verdict) =
                simulate(dec!(500000), dec!(0.05), &policy(outcome.withdrawal_rate), 30).unwrap();
            assert_eq!(outcome.projection, projection);
            assert_eq!(outcome.verdict, verdict);
        }
    }

    #[test]
    fn lower_withdrawal_rates_end_higher() {
        let rates = [dec!(0.03), dec!(0.04), dec!(0.05)];
        let outcomes = compare(dec!(500000), dec!(0.05), &rates, 30).unwrap();
        let endings: Vec<Decimal> = outcomes.iter().map(|o| o.verdict.ending_balance).collect();

        assert!(endings[0] >= endings[1]);
        assert!(endings[1] >= endings[2]);
        // At 5% growth a 5% draw exactly holds the balance flat.
        assert_eq!(endings[2], dec!(500000));
        assert!(outcomes.iter().all(|o| !o.verdict.depleted));
    }

    #[test]
    fn comparator_fails_whole_run_on_one_bad_rate() {
        let rates = [dec!(0.03), dec!(1.2)];
        assert_eq!(
            compare(dec!(500000), dec!(0.05), &rates, 30),
            Err(EngineError::InvalidWithdrawalRate { rate: dec!(1.2) })
        );
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_contributions_are_added_exactly(
            raw in proptest::collection::vec((0u32..500_000, 0u32..1_500), 1..6),
            contribution in 0u32..50_000,
            years in 0i64..25
        ) {
            let entries: Vec<AssetEntry> = raw
                .iter()
                .enumerate()
                .map(|(i, (amount, rate_bp))| {
                    AssetEntry::new(format!("asset {i}"), Decimal::from(*amount), Decimal::new(*rate_bp as i64, 4))
                })
                .collect();
            let schedule = ContributionSchedule { annual_amount: Decimal::from(contribution) };
            let trace = project_trace(&entries, &schedule, years).unwrap();
            prop_assert_eq!(trace.years.len() as i64, years + 1);

            for window in trace.years.windows(2) {
                let (prev, next) = (&window[0], &window[1]);
                let grown: Decimal = prev
                    .entry_balances
                    .iter()
                    .zip(&entries)
                    .map(|(b, e)| *b * (Decimal::ONE + e.annual_rate))
                    .sum();
                let diff = (next.total - (grown + schedule.annual_amount)).abs();
                prop_assert!(diff <= dec!(0.000000001), "off by {diff}");
                prop_assert!(next.entry_balances.iter().all(|b| *b >= Decimal::ZERO));
            }
        }

        #[test]
        fn prop_lower_rate_never_depletes_first_or_ends_lower(
            start in 0u32..2_000_000,
            growth_bp in 0u32..1_200,
            low_bp in 1u32..2_000,
            gap_bp in 1u32..2_000,
            years in 0i64..50
        ) {
            let high_bp = low_bp + gap_bp;
            let start = Decimal::from(start);
            let growth = Decimal::new(growth_bp as i64, 4);
            let low = Decimal::new(low_bp as i64, 4);
            let high = Decimal::new(high_bp as i64, 4);

            let outcomes = compare(start, growth, &[high, low], years).unwrap();
            let (high_run, low_run) = (&outcomes[0], &outcomes[1]);

            for (l, h) in low_run.projection.iter().zip(&high_run.projection) {
                prop_assert_eq!(l.year, h.year);
                prop_assert!(l.balance >= h.balance);
            }
            match (low_run.verdict.depletion_year, high_run.verdict.depletion_year) {
                (Some(l), Some(h)) => prop_assert!(l >= h),
                (Some(_), None) => prop_assert!(false, "lower rate depleted alone"),
                _ => {}
            }
        }

        #[test]
        fn prop_runs_are_deterministic(
            start in 0u32..2_000_000,
            growth_bp in 0u32..1_200,
            rate_bp in 1u32..3_000,
            years in 0i64..40
        ) {
            let start = Decimal::from(start);
            let growth = Decimal::new(growth_bp as i64, 4);
            let withdrawal = policy(Decimal::new(rate_bp as i64, 4));
            prop_assert_eq!(
                simulate(start, growth, &withdrawal, years),
                simulate(start, growth, &withdrawal, years)
            );

            let entries = vec![
                AssetEntry::new("A", start, growth),
                AssetEntry::new("B", Decimal::from(rate_bp), Decimal::new(rate_bp as i64, 5)),
            ];
            let schedule = ContributionSchedule { annual_amount: dec!(1234.5) };
            prop_assert_eq!(
                project(&entries, &schedule, years),
                project(&entries, &schedule, years)
            );
        }
    }
}
