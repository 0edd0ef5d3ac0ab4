use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use tracing::debug;

use super::{BudgetSource, ReportError};
use crate::models::{Period, Transaction};

/// Number of merchants ranked when the caller does not ask for a count.
pub(crate) const DEFAULT_TOP_MERCHANTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MonthlyTotal {
    pub(crate) month: Period,
    pub(crate) total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CategoryTotal {
    pub(crate) category: String,
    pub(crate) total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MerchantTotal {
    pub(crate) merchant: String,
    pub(crate) total: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BudgetStatus {
    Under,
    OnBudget,
    Over,
}

impl BudgetStatus {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Under => "under",
            Self::OnBudget => "on budget",
            Self::Over => "OVER",
        }
    }
}

/// One budgeted category for a period, compared with what was spent.
///
/// `variance` is `budget - actual`: positive means money left, negative
/// means overspent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BudgetComparison {
    pub(crate) category: String,
    pub(crate) budget: Decimal,
    pub(crate) actual: Decimal,
    pub(crate) variance: Decimal,
    pub(crate) status: BudgetStatus,
}

impl BudgetComparison {
    pub(crate) fn new(category: String, budget: Decimal, actual: Decimal) -> Self {
        let variance = budget - actual;
        let status = if variance.is_zero() {
            BudgetStatus::OnBudget
        } else if variance > Decimal::ZERO {
            BudgetStatus::Under
        } else {
            BudgetStatus::Over
        };
        Self {
            category,
            budget,
            actual,
            variance,
            status,
        }
    }

    /// Share of the budget already spent, in percent. `None` for a zero budget.
    pub(crate) fn percent_used(&self) -> Option<Decimal> {
        if self.budget.is_zero() {
            return None;
        }
        Some((self.actual / self.budget * Decimal::ONE_HUNDRED).round_dp(1))
    }
}

fn expenses(transactions: &[Transaction]) -> impl Iterator<Item = &Transaction> {
    transactions.iter().filter(|t| t.is_expense())
}

/// Sum amounts per key, keeping keys in the order they were first seen.
fn sum_by_key<K, I>(entries: I) -> Vec<(K, Decimal)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = (K, Decimal)>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut totals: Vec<(K, Decimal)> = Vec::new();
    for (key, amount) in entries {
        match index.get(&key) {
            Some(&i) => totals[i].1 += amount,
            None => {
                index.insert(key.clone(), totals.len());
                totals.push((key, amount));
            }
        }
    }
    totals
}

/// Largest first. The sort is stable, so ties stay in first-seen order.
fn sort_descending<K>(totals: &mut [(K, Decimal)]) {
    totals.sort_by(|a, b| b.1.cmp(&a.1));
}

/// Total expense per calendar month, oldest month first.
///
/// Months without any expense are omitted.
pub(crate) fn monthly_expense_trend(transactions: &[Transaction]) -> Vec<MonthlyTotal> {
    let mut by_month: BTreeMap<Period, Decimal> = BTreeMap::new();
    for txn in expenses(transactions) {
        *by_month.entry(Period::of(txn.date.date())).or_default() += txn.amount;
    }
    by_month
        .into_iter()
        .map(|(month, total)| MonthlyTotal { month, total })
        .collect()
}

/// Total expense per category, largest first.
///
/// `month` (1-12) keeps only transactions dated in that month of any year.
/// Use [`category_breakdown_for_period`] to pin the year as well.
pub(crate) fn category_breakdown(
    transactions: &[Transaction],
    month: Option<u32>,
) -> Result<Vec<CategoryTotal>, ReportError> {
    use chrono::Datelike;

    if let Some(m) = month {
        if !(1..=12).contains(&m) {
            return Err(ReportError::InvalidMonth(m));
        }
    }
    let filtered = expenses(transactions).filter(|t| month.is_none_or(|m| t.date.month() == m));
    Ok(breakdown(filtered))
}

/// Total expense per category within one exact (year, month), largest first.
pub(crate) fn category_breakdown_for_period(
    transactions: &[Transaction],
    period: Period,
) -> Vec<CategoryTotal> {
    breakdown(expenses(transactions).filter(|t| period.contains(t.date.date())))
}

fn breakdown<'a>(transactions: impl Iterator<Item = &'a Transaction>) -> Vec<CategoryTotal> {
    let mut totals = sum_by_key(transactions.map(|t| (t.category_name.as_str(), t.amount)));
    sort_descending(&mut totals);
    totals
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category: category.to_string(),
            total,
        })
        .collect()
}

/// The `n` merchants with the highest total expense, largest first.
///
/// Transactions without a merchant are not ranked.
pub(crate) fn top_merchants(transactions: &[Transaction], n: usize) -> Vec<MerchantTotal> {
    let mut totals = sum_by_key(
        expenses(transactions)
            .filter_map(|t| t.merchant_name.as_deref().map(|name| (name, t.amount))),
    );
    sort_descending(&mut totals);
    totals
        .into_iter()
        .take(n)
        .map(|(merchant, total)| MerchantTotal {
            merchant: merchant.to_string(),
            total,
        })
        .collect()
}

/// Compare a user's budgets for `period` with the expenses recorded in it.
///
/// Returns one row per budget, in the order the source returned them. A
/// budgeted category with no spending gets an actual of zero. No budgets
/// means an empty result.
pub(crate) fn budget_vs_actual(
    source: &impl BudgetSource,
    user_id: i64,
    period: Period,
    transactions: &[Transaction],
) -> Result<Vec<BudgetComparison>, ReportError> {
    let budgets = source.budgets_for_period(user_id, period)?;
    if budgets.is_empty() {
        debug!(user_id, %period, "no budgets for period");
        return Ok(Vec::new());
    }

    let actuals: HashMap<&str, Decimal> = sum_by_key(
        expenses(transactions)
            .filter(|t| period.contains(t.date.date()))
            .map(|t| (t.category_name.as_str(), t.amount)),
    )
    .into_iter()
    .collect();

    let rows: Vec<BudgetComparison> = budgets
        .into_iter()
        .map(|budget| {
            let actual = actuals
                .get(budget.category_name.as_str())
                .copied()
                .unwrap_or(Decimal::ZERO);
            BudgetComparison::new(budget.category_name, budget.amount, actual)
        })
        .collect();
    debug!(user_id, %period, rows = rows.len(), "compared budgets with actual spend");
    Ok(rows)
}
