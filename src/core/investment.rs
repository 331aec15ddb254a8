use tracing::debug;

use super::types::{CompoundingFrequency, InvestmentProjection, InvestmentYearRecord};

/// `annual_rate` is a fraction. A year's contributions land as one lump before
/// that year's interest.
pub fn project(
    start: f64,
    monthly_contribution: f64,
    years: u32,
    annual_rate: f64,
    frequency: CompoundingFrequency,
) -> InvestmentProjection {
    let growth = frequency.annual_growth_factor(annual_rate);
    let contribution = monthly_contribution * 12.0;

    let mut balance = start;
    let mut total_invested = start;
    let mut records = Vec::with_capacity(years as usize + 1);
    records.push(InvestmentYearRecord {
        year: 0,
        contribution: 0.0,
        earnings: 0.0,
        balance,
    });

    for year in 1..=years {
        total_invested += contribution;
        balance += contribution;
        let earnings = balance * growth;
        balance += earnings;
        records.push(InvestmentYearRecord {
            year,
            contribution,
            earnings,
            balance,
        });
    }
    debug!(years, ending_balance = balance, total_invested, "projected investment");

    InvestmentProjection {
        records,
        total_invested,
        total_earnings: balance - total_invested,
        ending_balance: balance,
    }
}
