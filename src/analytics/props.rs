//! Property tests for the spending aggregators.

use anyhow::Result;
use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashSet;

use super::*;
use crate::models::{Budget, Period, Transaction, TransactionKind};

const CATEGORIES: &[&str] = &["Food", "Rent", "Fuel", "Fun", "Health"];
const MERCHANTS: &[&str] = &["Cafe", "Grocer", "Station", "Cinema"];

fn arb_transaction() -> impl Strategy<Value = Transaction> {
    (
        2023i32..=2025,
        1u32..=12,
        1u32..=28,
        1i64..=500_000,
        any::<bool>(),
        0..CATEGORIES.len(),
        proptest::option::of(0..MERCHANTS.len()),
    )
        .prop_map(|(year, month, day, cents, is_expense, cat, merchant)| {
            let date = NaiveDate::from_ymd_opt(year, month, day)
                .and_then(|d| d.and_hms_opt(8, 0, 0))
                .unwrap_or_default();
            let kind = if is_expense {
                TransactionKind::Expense
            } else {
                TransactionKind::Income
            };
            let mut txn = Transaction::new(1, 1, 1, Decimal::new(cents, 2), kind, date)
                .unwrap_or_else(|e| panic!("generated invalid transaction: {e}"));
            txn.category_name = CATEGORIES[cat].to_string();
            if let Some(m) = merchant {
                txn = txn.with_merchant(m as i64 + 1, MERCHANTS[m]);
            }
            txn
        })
}

fn expense_total(txns: &[Transaction]) -> Decimal {
    txns.iter().filter(|t| t.is_expense()).map(|t| t.amount).sum()
}

struct StaticBudgets(Vec<Budget>);

impl BudgetSource for StaticBudgets {
    fn budgets_for_period(&self, _user_id: i64, _period: Period) -> Result<Vec<Budget>> {
        Ok(self.0.clone())
    }
}

proptest! {
    /// Trend months are unique, ascending, and account for every expense.
    #[test]
    fn trend_months_sorted_and_complete(txns in prop::collection::vec(arb_transaction(), 0..60)) {
        let trend = monthly_expense_trend(&txns);

        for pair in trend.windows(2) {
            prop_assert!(pair[0].month < pair[1].month);
        }
        let total: Decimal = trend.iter().map(|m| m.total).sum();
        prop_assert_eq!(total, expense_total(&txns));
    }

    /// Breakdown is non-increasing and sums to the filtered expense total.
    #[test]
    fn breakdown_sorted_and_complete(
        txns in prop::collection::vec(arb_transaction(), 0..60),
        month in proptest::option::of(1u32..=12),
    ) {
        use chrono::Datelike;

        let rows = category_breakdown(&txns, month).unwrap_or_default();
        for pair in rows.windows(2) {
            prop_assert!(pair[0].total >= pair[1].total);
        }

        let filtered: Vec<Transaction> = txns
            .iter()
            .filter(|t| month.is_none_or(|m| t.date.month() == m))
            .cloned()
            .collect();
        let total: Decimal = rows.iter().map(|r| r.total).sum();
        prop_assert_eq!(total, expense_total(&filtered));

        let names: HashSet<&str> = rows.iter().map(|r| r.category.as_str()).collect();
        prop_assert_eq!(names.len(), rows.len());
    }

    /// At most n merchants, led by the largest total.
    #[test]
    fn top_merchants_bounded_and_led_by_max(
        txns in prop::collection::vec(arb_transaction(), 0..60),
        n in 0usize..8,
    ) {
        let top = top_merchants(&txns, n);
        prop_assert!(top.len() <= n);
        if let Some(first) = top.first() {
            prop_assert!(top.iter().all(|m| first.total >= m.total));
        }
        prop_assert_eq!(top_merchants(&txns, n), top);
    }

    /// Every budgeted category appears exactly once and unspent ones show zero.
    #[test]
    fn budget_rows_cover_each_budget_once(
        txns in prop::collection::vec(arb_transaction(), 0..60),
        budgeted in prop::collection::hash_set(0..CATEGORIES.len(), 0..=CATEGORIES.len()),
        month in 1u32..=12,
    ) {
        let period = Period::new(2024, month).unwrap_or_else(|e| panic!("{e}"));
        let budgets: Vec<Budget> = budgeted
            .iter()
            .map(|&i| {
                let mut b = Budget::new(1, i as i64 + 1, Decimal::new(10_000, 2), period)
                    .unwrap_or_else(|e| panic!("{e}"));
                b.category_name = CATEGORIES[i].to_string();
                b
            })
            .collect();

        let rows = budget_vs_actual(&StaticBudgets(budgets.clone()), 1, period, &txns)
            .unwrap_or_default();
        prop_assert_eq!(rows.len(), budgets.len());

        for budget in &budgets {
            let matching: Vec<&BudgetComparison> =
                rows.iter().filter(|r| r.category == budget.category_name).collect();
            prop_assert_eq!(matching.len(), 1);
            let spent = txns.iter().any(|t| {
                t.is_expense()
                    && t.category_name == budget.category_name
                    && period.contains(t.date.date())
            });
            if !spent {
                prop_assert_eq!(matching[0].actual, Decimal::ZERO);
            }
            prop_assert_eq!(matching[0].variance, matching[0].budget - matching[0].actual);
        }
    }
}
