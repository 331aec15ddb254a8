use tracing::debug;

use super::types::{
    CompoundingFrequency, GoalDuration, GrowthPoint, MAX_TRAJECTORY_MONTHS, PlanField,
    ResolvedPlan, SavingsPlan, SavingsSolution,
};

pub const DERIVATION_PRIORITY: [PlanField; 4] = [
    PlanField::Duration,
    PlanField::Monthly,
    PlanField::Start,
    PlanField::Target,
];

pub fn select_derived_field(plan: &SavingsPlan) -> Option<PlanField> {
    DERIVATION_PRIORITY
        .into_iter()
        .find(|field| field.is_unset(plan))
}

/// `annual_rate` is a fraction (0.03 for 3%). Interest for a month accrues on the
/// opening balance before that month's contribution is added.
pub fn solve(
    plan: &SavingsPlan,
    annual_rate: f64,
    frequency: CompoundingFrequency,
) -> SavingsSolution {
    let r = frequency.effective_monthly_rate(annual_rate);
    let derived = select_derived_field(plan);

    let mut resolved = ResolvedPlan {
        start: plan.start,
        monthly: plan.monthly,
        duration: GoalDuration::Months(u64::from(plan.duration_months)),
        target: plan.target,
    };
    let d = plan.duration_months;
    match derived {
        Some(PlanField::Duration) => {
            resolved.duration = calculate_duration(plan.start, plan.monthly, plan.target, r);
        }
        Some(PlanField::Monthly) => {
            resolved.monthly = calculate_monthly(plan.start, plan.target, d, r);
        }
        Some(PlanField::Start) => {
            resolved.start = calculate_start(plan.target, plan.monthly, d, r);
        }
        Some(PlanField::Target) => {
            resolved.target = calculate_target(plan.start, plan.monthly, d, r);
        }
        None => {}
    }
    debug!(?derived, monthly_rate = r, duration = ?resolved.duration, "resolved savings plan");

    let (trajectory, trajectory_truncated) = simulate_balances(&resolved, r);
    SavingsSolution {
        plan: resolved,
        derived,
        monthly_rate: r,
        trajectory,
        trajectory_truncated,
    }
}

// Balances within this fraction of the target count as having reached it.
const REACHED_TOLERANCE: f64 = 1e-11;

pub fn calculate_duration(start: f64, monthly: f64, target: f64, r: f64) -> GoalDuration {
    if monthly == 0.0 && start >= target {
        return GoalDuration::Months(0);
    }

    let estimate = if r == 0.0 {
        if monthly <= 0.0 {
            debug!(start, target, "no contribution and no growth; target unreachable");
            return GoalDuration::Unreachable;
        }
        (target - start) / monthly
    } else {
        let ratio = (monthly + r * target) / (monthly + r * start);
        if !ratio.is_finite() || ratio <= 0.0 {
            debug!(start, monthly, target, r, "target unreachable at this rate");
            return GoalDuration::Unreachable;
        }
        ratio.ln() / r.ln_1p()
    };

    let Some(mut months) = whole_months(estimate.ceil()) else {
        debug!(estimate, "duration does not fit in a month count");
        return GoalDuration::Unreachable;
    };
    // Rounding in the log or division can push a boundary month either way.
    if months > 0 && has_reached(start, monthly, months - 1, r, target) {
        months -= 1;
    } else if !has_reached(start, monthly, months, r, target) {
        months += 1;
    }
    GoalDuration::Months(months)
}

fn whole_months(months: f64) -> Option<u64> {
    if !months.is_finite() || months >= u64::MAX as f64 {
        return None;
    }
    Some(months.max(0.0) as u64)
}

fn has_reached(start: f64, monthly: f64, months: u64, r: f64, target: f64) -> bool {
    let tolerance = REACHED_TOLERANCE * target.abs().max(1.0);
    balance_after(start, monthly, months as f64, r) >= target - tolerance
}

pub fn calculate_monthly(start: f64, target: f64, duration: u32, r: f64) -> f64 {
    if duration == 0 {
        return 0.0;
    }
    let d = f64::from(duration);
    if r == 0.0 {
        return ((target - start) / d).max(0.0);
    }
    let gain = compound_gain(r, d);
    let annuity = gain / r;
    if annuity == 0.0 {
        return 0.0;
    }
    (target - start * (1.0 + gain)) / annuity
}

pub fn calculate_start(target: f64, monthly: f64, duration: u32, r: f64) -> f64 {
    if duration == 0 {
        return 0.0;
    }
    if r == 0.0 {
        return target - monthly * f64::from(duration);
    }
    let gain = compound_gain(r, f64::from(duration));
    (target - monthly * gain / r) / (1.0 + gain)
}

pub fn calculate_target(start: f64, monthly: f64, duration: u32, r: f64) -> f64 {
    balance_after(start, monthly, f64::from(duration), r)
}

fn balance_after(start: f64, monthly: f64, months: f64, r: f64) -> f64 {
    if months == 0.0 {
        return start;
    }
    if r == 0.0 {
        return start + monthly * months;
    }
    let gain = compound_gain(r, months);
    start * (1.0 + gain) + monthly * gain / r
}

// (1 + r)^months - 1 without cancellation for small rates.
fn compound_gain(r: f64, months: f64) -> f64 {
    (months * r.ln_1p()).exp_m1()
}

fn simulate_balances(plan: &ResolvedPlan, r: f64) -> (Vec<GrowthPoint>, bool) {
    let months = plan.duration.months().unwrap_or(0);
    let simulated = u32::try_from(months)
        .map_or(MAX_TRAJECTORY_MONTHS, |months| months.min(MAX_TRAJECTORY_MONTHS));

    let mut points = Vec::with_capacity(simulated as usize + 1);
    let mut balance = plan.start;
    points.push(GrowthPoint { month: 0, balance });
    for month in 1..=simulated {
        balance = balance * (1.0 + r) + plan.monthly;
        points.push(GrowthPoint { month, balance });
    }
    (points, u64::from(simulated) < months)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const REL_TOL: f64 = 1e-6;

    fn assert_rel(actual: f64, expected: f64) {
        let tol = REL_TOL * expected.abs().max(1.0);
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn plan(start: f64, monthly: f64, duration_months: u32, target: f64) -> SavingsPlan {
        SavingsPlan {
            start,
            monthly,
            duration_months,
            target,
        }
    }

    fn monthly_rate(annual: f64) -> f64 {
        CompoundingFrequency::Monthly.effective_monthly_rate(annual)
    }

    #[test]
    fn effective_monthly_rate_matches_frequency() {
        assert_rel(monthly_rate(0.12), 0.01);
        assert_rel(
            CompoundingFrequency::Annual.effective_monthly_rate(0.12),
            1.12f64.powf(1.0 / 12.0) - 1.0,
        );
        assert_rel(
            CompoundingFrequency::Quarterly.effective_monthly_rate(0.08),
            1.02f64.powf(1.0 / 3.0) - 1.0,
        );
        assert_eq!(CompoundingFrequency::Quarterly.effective_monthly_rate(0.0), 0.0);
    }

    #[test]
    fn priority_prefers_duration_then_monthly_then_start_then_target() {
        assert_eq!(
            select_derived_field(&plan(0.0, 0.0, 0, 0.0)),
            Some(PlanField::Duration)
        );
        assert_eq!(
            select_derived_field(&plan(0.0, 0.0, 12, 0.0)),
            Some(PlanField::Monthly)
        );
        assert_eq!(
            select_derived_field(&plan(0.0, 100.0, 12, 0.0)),
            Some(PlanField::Start)
        );
        assert_eq!(
            select_derived_field(&plan(10.0, 100.0, 12, 0.0)),
            Some(PlanField::Target)
        );
        assert_eq!(select_derived_field(&plan(10.0, 100.0, 12, 5000.0)), None);
    }

    #[test]
    fn fully_specified_plan_is_echoed() {
        let solution = solve(
            &plan(1000.0, 100.0, 24, 99_999.0),
            0.05,
            CompoundingFrequency::Monthly,
        );

        assert_eq!(solution.derived, None);
        assert_eq!(solution.plan.start, 1000.0);
        assert_eq!(solution.plan.monthly, 100.0);
        assert_eq!(solution.plan.duration, GoalDuration::Months(24));
        assert_eq!(solution.plan.target, 99_999.0);
        assert_eq!(solution.trajectory.len(), 25);
    }

    #[test]
    fn derives_duration_for_reference_plan() {
        let solution = solve(
            &plan(5000.0, 500.0, 0, 20_000.0),
            0.03,
            CompoundingFrequency::Monthly,
        );
        assert_eq!(solution.derived, Some(PlanField::Duration));

        let months = solution.plan.duration.months().expect("finite duration");
        assert!(months > 0);
        assert_eq!(solution.trajectory.len(), months as usize + 1);

        let last = solution.trajectory[months as usize].balance;
        let before = solution.trajectory[months as usize - 1].balance;
        assert!(last >= 20_000.0, "balance {last} must reach target");
        assert!(before < 20_000.0, "balance {before} must fall short a month earlier");
    }

    #[test]
    fn zero_rate_duration_is_simple_division() {
        assert_eq!(
            calculate_duration(1000.0, 300.0, 4000.0, 0.0),
            GoalDuration::Months(10)
        );
        assert_eq!(
            calculate_duration(1000.0, 250.0, 2000.0, 0.0),
            GoalDuration::Months(4)
        );
    }

    #[test]
    fn no_contribution_and_no_rate_is_unreachable() {
        let solution = solve(&plan(0.0, 0.0, 0, 1000.0), 0.0, CompoundingFrequency::Monthly);

        assert_eq!(solution.plan.duration, GoalDuration::Unreachable);
        assert!(solution.plan.duration.is_unreachable());
        assert_eq!(solution.plan.duration.years(), None);
        assert_eq!(solution.trajectory, vec![GrowthPoint { month: 0, balance: 0.0 }]);
        assert!(!solution.trajectory_truncated);
    }

    #[test]
    fn zero_balance_without_contribution_is_unreachable_even_with_interest() {
        assert_eq!(
            calculate_duration(0.0, 0.0, 1000.0, monthly_rate(0.05)),
            GoalDuration::Unreachable
        );
    }

    #[test]
    fn interest_alone_reaches_target_from_a_positive_start() {
        let r = monthly_rate(0.12);
        let months = calculate_duration(1000.0, 0.0, 2000.0, r)
            .months()
            .expect("finite duration");
        assert_eq!(months, 70);
    }

    #[test]
    fn target_already_met_takes_zero_months() {
        assert_eq!(
            calculate_duration(5000.0, 0.0, 2000.0, 0.01),
            GoalDuration::Months(0)
        );
        assert_eq!(
            calculate_duration(5000.0, 100.0, 2000.0, 0.01),
            GoalDuration::Months(0)
        );
        assert_eq!(
            calculate_duration(5000.0, 100.0, 2000.0, 0.0),
            GoalDuration::Months(0)
        );
    }

    #[test]
    fn zero_rate_monthly_is_remaining_over_duration() {
        assert_rel(calculate_monthly(1000.0, 7000.0, 12, 0.0), 500.0);
        assert_eq!(calculate_monthly(9000.0, 7000.0, 12, 0.0), 0.0);
    }

    #[test]
    fn zero_duration_is_idempotent_for_any_rate() {
        for r in [0.0, monthly_rate(0.03), monthly_rate(0.2)] {
            assert_eq!(calculate_target(1234.0, 50.0, 0, r), 1234.0);
            assert_eq!(calculate_monthly(1234.0, 9999.0, 0, r), 0.0);
            assert_eq!(calculate_start(9999.0, 50.0, 0, r), 0.0);
        }
    }

    #[test]
    fn derived_start_reaches_given_target() {
        let solution = solve(
            &plan(0.0, 200.0, 36, 10_000.0),
            0.04,
            CompoundingFrequency::Quarterly,
        );
        assert_eq!(solution.derived, Some(PlanField::Start));
        let last = solution.trajectory.last().expect("trajectory has points");
        assert_eq!(last.month, 36);
        assert_rel(last.balance, 10_000.0);
    }

    #[test]
    fn derived_target_matches_trajectory_end() {
        let solution = solve(
            &plan(2500.0, 150.0, 48, 0.0),
            0.06,
            CompoundingFrequency::Annual,
        );
        assert_eq!(solution.derived, Some(PlanField::Target));
        let last = solution.trajectory.last().expect("trajectory has points");
        assert_rel(last.balance, solution.plan.target);
    }

    #[test]
    fn long_derived_durations_truncate_the_trajectory() {
        let solution = solve(&plan(0.0, 1.0, 0, 5000.0), 0.0, CompoundingFrequency::Monthly);

        assert_eq!(solution.plan.duration, GoalDuration::Months(5000));
        assert!(solution.trajectory_truncated);
        assert_eq!(
            solution.trajectory.len(),
            MAX_TRAJECTORY_MONTHS as usize + 1
        );
    }

    #[test]
    fn target_on_a_month_boundary_is_reached_that_month() {
        let solution = solve(
            &plan(1234.56, 78.9, 0, 1313.46),
            0.0,
            CompoundingFrequency::Monthly,
        );

        assert_eq!(solution.plan.duration, GoalDuration::Months(1));
        assert_eq!(solution.trajectory.len(), 2);
        assert_rel(solution.trajectory[1].balance, 1313.46);

        let r = monthly_rate(0.05);
        for months in [1, 12, 37, 240] {
            let target = calculate_target(1234.56, 78.9, months, r);
            assert_eq!(
                calculate_duration(1234.56, 78.9, target, r),
                GoalDuration::Months(u64::from(months))
            );
        }
    }

    #[test]
    fn tiny_contributions_give_long_but_finite_durations() {
        let duration = calculate_duration(0.0, 1e-9, 1000.0, 0.0);

        assert_eq!(duration, GoalDuration::Months(1_000_000_000_000));
        assert!(!duration.is_unreachable());

        let solution = solve(&plan(0.0, 1e-9, 0, 1000.0), 0.0, CompoundingFrequency::Monthly);
        assert!(solution.trajectory_truncated);
        assert_eq!(
            solution.trajectory.len(),
            MAX_TRAJECTORY_MONTHS as usize + 1
        );
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_inverse_formulas_are_consistent(
            start_cents in 0u64..10_000_000,
            monthly_cents in 0u64..500_000,
            duration in 1u32..600,
            rate_bp in 0u32..1500
        ) {
            let start = start_cents as f64 / 100.0;
            let monthly = monthly_cents as f64 / 100.0;
            let r = monthly_rate(f64::from(rate_bp) / 10_000.0);

            let target = calculate_target(start, monthly, duration, r);
            let tol = REL_TOL * target.abs().max(1.0);

            let monthly_back = calculate_monthly(start, target, duration, r);
            prop_assert!((monthly_back - monthly).abs() <= tol);

            let start_back = calculate_start(target, monthly, duration, r);
            prop_assert!((start_back - start).abs() <= tol);
        }

        #[test]
        fn prop_derived_duration_is_the_first_month_reaching_target(
            start_cents in 0u64..5_000_000,
            monthly_cents in 1_000u64..500_000,
            gap_hundredths in 1u64..100_000,
            rate_bp in 0u32..1500
        ) {
            let start = start_cents as f64 / 100.0;
            let monthly = monthly_cents as f64 / 100.0;
            let target = start + monthly * gap_hundredths as f64 / 100.0;

            let solution = solve(
                &plan(start, monthly, 0, target),
                f64::from(rate_bp) / 10_000.0,
                CompoundingFrequency::Monthly,
            );
            let months = solution.plan.duration.months();
            prop_assert!(months.is_some());
            let months = months.unwrap_or_default() as usize;
            prop_assert!(months > 0);
            prop_assert!(!solution.trajectory_truncated);
            prop_assert_eq!(solution.trajectory.len(), months + 1);

            let before = solution.trajectory[months - 1].balance;
            let reached = solution.trajectory[months].balance;
            prop_assert!(before < target, "month {} already at {} of {}", months - 1, before, target);
            prop_assert!(reached >= target - 1e-10 * target, "month {} only at {} of {}", months, reached, target);
        }

        #[test]
        fn prop_duration_of_a_computed_target_is_the_original_duration(
            start_cents in 0u64..10_000_000,
            monthly_cents in 1u64..500_000,
            duration in 1u32..600,
            rate_bp in 0u32..1500
        ) {
            let start = start_cents as f64 / 100.0;
            let monthly = monthly_cents as f64 / 100.0;
            let r = monthly_rate(f64::from(rate_bp) / 10_000.0);

            let target = calculate_target(start, monthly, duration, r);
            prop_assert_eq!(
                calculate_duration(start, monthly, target, r),
                GoalDuration::Months(u64::from(duration))
            );
        }

        #[test]
        fn prop_trajectory_has_one_point_per_month(
            start_cents in 1u64..5_000_000,
            monthly_cents in 1u64..500_000,
            duration in 1u32..=MAX_TRAJECTORY_MONTHS,
            rate_bp in 0u32..1500
        ) {
            let start = start_cents as f64 / 100.0;
            let monthly = monthly_cents as f64 / 100.0;
            let solution = solve(
                &plan(start, monthly, duration, 0.0),
                f64::from(rate_bp) / 10_000.0,
                CompoundingFrequency::Monthly,
            );

            prop_assert_eq!(solution.trajectory.len(), duration as usize + 1);
            prop_assert_eq!(solution.trajectory[0].balance, solution.plan.start);
            let last = solution.trajectory[duration as usize].balance;
            prop_assert!((last - solution.plan.target).abs() <= REL_TOL * solution.plan.target.max(1.0));
        }
    }
}
