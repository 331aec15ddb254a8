mod budget;
mod investment;
mod savings;
mod types;

pub use budget::allocate;
pub use investment::project;
pub use savings::{
    DERIVATION_PRIORITY, calculate_duration, calculate_monthly, calculate_start,
    calculate_target, select_derived_field, solve,
};
pub use types::{
    Allocation, BudgetCategory, BudgetDiagnostic, BudgetInput, BudgetLine, CategorySplit,
    CompoundingFrequency, GoalDuration, GrowthPoint, InvestmentProjection, InvestmentYearRecord,
    MAX_PROJECTION_YEARS, MAX_TRAJECTORY_MONTHS, PlanField, ResolvedPlan, SavingsPlan,
    SavingsSolution,
};
