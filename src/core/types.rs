use serde::Serialize;

pub const MAX_TRAJECTORY_MONTHS: u32 = 1200;

pub const MAX_PROJECTION_YEARS: u32 = 100;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CompoundingFrequency {
    Annual,
    Quarterly,
    Monthly,
}

impl CompoundingFrequency {
    pub fn periods_per_year(self) -> u32 {
        match self {
            CompoundingFrequency::Annual => 1,
            CompoundingFrequency::Quarterly => 4,
            CompoundingFrequency::Monthly => 12,
        }
    }

    pub fn effective_monthly_rate(self, annual_rate: f64) -> f64 {
        if annual_rate <= 0.0 {
            return 0.0;
        }
        let n = f64::from(self.periods_per_year());
        (1.0 + annual_rate / n).powf(n / 12.0) - 1.0
    }

    pub fn annual_growth_factor(self, annual_rate: f64) -> f64 {
        let n = self.periods_per_year();
        (1.0 + annual_rate / f64::from(n)).powi(n as i32) - 1.0
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BudgetCategory {
    Needs,
    Wants,
    Savings,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CategorySplit {
    pub needs: f64,
    pub wants: f64,
    pub savings: f64,
}

impl CategorySplit {
    pub fn recommended(income: f64) -> Self {
        let cents = |share: f64| (income * share * 100.0).round() / 100.0;
        CategorySplit {
            needs: cents(0.5),
            wants: cents(0.3),
            savings: cents(0.2),
        }
    }

    pub fn total(self) -> f64 {
        self.needs + self.wants + self.savings
    }

    pub fn entries(self) -> [(BudgetCategory, f64); 3] {
        [
            (BudgetCategory::Needs, self.needs),
            (BudgetCategory::Wants, self.wants),
            (BudgetCategory::Savings, self.savings),
        ]
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum BudgetInput {
    Percentages(CategorySplit),
    Amounts(CategorySplit),
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetLine {
    pub category: BudgetCategory,
    pub amount: f64,
    pub percent: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BudgetDiagnostic {
    Balanced,
    #[serde(rename_all = "camelCase")]
    PercentMismatch { total_percent: f64 },
    #[serde(rename_all = "camelCase")]
    OverAllocated { allocated: f64, excess: f64 },
    #[serde(rename_all = "camelCase")]
    UnderAllocated { allocated: f64, remainder: f64 },
    FullyAllocated,
}

impl BudgetDiagnostic {
    pub fn is_warning(self) -> bool {
        !matches!(
            self,
            BudgetDiagnostic::Balanced | BudgetDiagnostic::FullyAllocated
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub income: f64,
    pub breakdown: [BudgetLine; 3],
    pub diagnostic: BudgetDiagnostic,
}

impl Allocation {
    pub fn total_allocated(&self) -> f64 {
        self.breakdown.iter().map(|line| line.amount).sum()
    }

    pub fn total_percent(&self) -> f64 {
        self.breakdown.iter().map(|line| line.percent).sum()
    }

    pub fn line(&self, category: BudgetCategory) -> &BudgetLine {
        match category {
            BudgetCategory::Needs => &self.breakdown[0],
            BudgetCategory::Wants => &self.breakdown[1],
            BudgetCategory::Savings => &self.breakdown[2],
        }
    }
}

// A zero field means "unknown".
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SavingsPlan {
    pub start: f64,
    pub monthly: f64,
    pub duration_months: u32,
    pub target: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PlanField {
    Duration,
    Monthly,
    Start,
    Target,
}

impl PlanField {
    pub fn is_unset(self, plan: &SavingsPlan) -> bool {
        match self {
            PlanField::Duration => plan.duration_months == 0,
            PlanField::Monthly => plan.monthly == 0.0,
            PlanField::Start => plan.start == 0.0,
            PlanField::Target => plan.target == 0.0,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GoalDuration {
    Months(u64),
    Unreachable,
}

impl GoalDuration {
    pub fn months(self) -> Option<u64> {
        match self {
            GoalDuration::Months(months) => Some(months),
            GoalDuration::Unreachable => None,
        }
    }

    pub fn years(self) -> Option<f64> {
        self.months().map(|months| months as f64 / 12.0)
    }

    pub fn is_unreachable(self) -> bool {
        self == GoalDuration::Unreachable
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPlan {
    pub start: f64,
    pub monthly: f64,
    pub duration: GoalDuration,
    pub target: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthPoint {
    pub month: u32,
    pub balance: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsSolution {
    pub plan: ResolvedPlan,
    pub derived: Option<PlanField>,
    pub monthly_rate: f64,
    pub trajectory: Vec<GrowthPoint>,
    pub trajectory_truncated: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentYearRecord {
    pub year: u32,
    pub contribution: f64,
    pub earnings: f64,
    pub balance: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentProjection {
    pub records: Vec<InvestmentYearRecord>,
    pub total_invested: f64,
    pub total_earnings: f64,
    pub ending_balance: f64,
}
