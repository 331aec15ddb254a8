use super::types::{Allocation, BudgetDiagnostic, BudgetInput, BudgetLine, CategorySplit};

const PERCENT_TOLERANCE: f64 = 1e-9;

pub fn allocate(income: f64, input: &BudgetInput) -> Allocation {
    let (breakdown, diagnostic) = match *input {
        BudgetInput::Percentages(split) => {
            let lines = split.entries().map(|(category, percent)| BudgetLine {
                category,
                amount: income * percent / 100.0,
                percent,
            });
            (lines, percentage_diagnostic(split))
        }
        BudgetInput::Amounts(split) => {
            let lines = split.entries().map(|(category, amount)| BudgetLine {
                category,
                amount,
                percent: share_of_income(amount, income),
            });
            (lines, amount_diagnostic(split, income))
        }
    };

    Allocation {
        income,
        breakdown,
        diagnostic,
    }
}

fn share_of_income(amount: f64, income: f64) -> f64 {
    if income > 0.0 {
        amount / income * 100.0
    } else {
        0.0
    }
}

fn percentage_diagnostic(split: CategorySplit) -> BudgetDiagnostic {
    let total_percent = split.total();
    if (total_percent - 100.0).abs() <= PERCENT_TOLERANCE {
        BudgetDiagnostic::Balanced
    } else {
        BudgetDiagnostic::PercentMismatch { total_percent }
    }
}

fn amount_diagnostic(split: CategorySplit, income: f64) -> BudgetDiagnostic {
    let allocated = split.total();
    let tolerance = PERCENT_TOLERANCE * income.abs().max(1.0);
    if allocated > income + tolerance {
        BudgetDiagnostic::OverAllocated {
            allocated,
            excess: allocated - income,
        }
    } else if allocated < income - tolerance {
        BudgetDiagnostic::UnderAllocated {
            allocated,
            remainder: income - allocated,
        }
    } else {
        BudgetDiagnostic::FullyAllocated
    }
}
