//! Spending reports computed from a user's transactions and budgets.
//!
//! Every aggregator is a pure function over an in-memory snapshot; the only
//! collaborator is the [`BudgetSource`] consulted by [`budget_vs_actual`].

mod error;
mod reports;

use anyhow::Result;

use crate::models::{Budget, Period, Transaction};

pub(crate) use error::ReportError;
pub(crate) use reports::{
    budget_vs_actual, category_breakdown, category_breakdown_for_period, monthly_expense_trend,
    top_merchants, BudgetComparison, BudgetStatus, CategoryTotal, MerchantTotal, MonthlyTotal,
    DEFAULT_TOP_MERCHANTS,
};

/// Supplies every transaction belonging to a user.
pub(crate) trait TransactionSource {
    fn transactions_for_user(&self, user_id: i64) -> Result<Vec<Transaction>>;
}

/// Supplies a user's budgets for one period, at most one per category.
pub(crate) trait BudgetSource {
    fn budgets_for_period(&self, user_id: i64, period: Period) -> Result<Vec<Budget>>;
}


#[cfg(test)]
mod props;
