use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::path::Path;
use tracing::info;

use super::cli::{flag, positionals};
use crate::analytics::{self, TransactionSource, DEFAULT_TOP_MERCHANTS};
use crate::charts::ChartRenderer;
use crate::db::Database;
use crate::models::Period;
use crate::session::Session;
use crate::util::{format_amount, format_percent, truncate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum CategoryFilter {
    All,
    /// Month number, any year.
    Month(u32),
    Period(Period),
}

/// Which table to build. Shared by `report` and `chart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ReportKind {
    Trend,
    Categories(CategoryFilter),
    Merchants(usize),
    Budget(Period),
}

impl ReportKind {
    pub(super) fn parse(args: &[String]) -> Result<Self> {
        let pos = positionals(args, &[]);
        match pos.as_slice() {
            ["trend"] => Ok(Self::Trend),
            ["categories"] => Ok(Self::Categories(CategoryFilter::All)),
            ["categories", filter] if filter.contains('-') => {
                Ok(Self::Categories(CategoryFilter::Period(filter.parse()?)))
            }
            ["categories", filter] => {
                let month = filter
                    .parse::<u32>()
                    .with_context(|| format!("Invalid month '{filter}' (expected 1-12 or YYYY-MM)"))?;
                Ok(Self::Categories(CategoryFilter::Month(month)))
            }
            ["merchants"] => {
                let top = match flag(args, "--top") {
                    Some(raw) => raw
                        .parse::<usize>()
                        .with_context(|| format!("Invalid --top value '{raw}'"))?,
                    None => DEFAULT_TOP_MERCHANTS,
                };
                Ok(Self::Merchants(top))
            }
            ["budget"] => Ok(Self::Budget(Period::current())),
            ["budget", period] => Ok(Self::Budget(period.parse()?)),
            _ => anyhow::bail!(
                "Usage: trend | categories [<M>|<YYYY-MM>] | merchants [--top N] | budget [<YYYY-MM>]"
            ),
        }
    }
}

/// Computed table, ready to print or plot.
pub(super) enum Table {
    Trend(Vec<analytics::MonthlyTotal>),
    Categories(Vec<analytics::CategoryTotal>),
    Merchants(Vec<analytics::MerchantTotal>),
    Budget(Period, Vec<analytics::BudgetComparison>),
}

pub(super) fn build(kind: ReportKind, db: &Database, session: &Session) -> Result<Table> {
    let txns = db.transactions_for_user(session.user_id)?;
    info!(user_id = session.user_id, ?kind, transactions = txns.len(), "building report");
    let table = match kind {
        ReportKind::Trend => Table::Trend(analytics::monthly_expense_trend(&txns)),
        ReportKind::Categories(CategoryFilter::All) => {
            Table::Categories(analytics::category_breakdown(&txns, None)?)
        }
        ReportKind::Categories(CategoryFilter::Month(m)) => {
            Table::Categories(analytics::category_breakdown(&txns, Some(m))?)
        }
        ReportKind::Categories(CategoryFilter::Period(p)) => {
            Table::Categories(analytics::category_breakdown_for_period(&txns, p))
        }
        ReportKind::Merchants(n) => Table::Merchants(analytics::top_merchants(&txns, n)),
        ReportKind::Budget(period) => Table::Budget(
            period,
            analytics::budget_vs_actual(db, session.user_id, period, &txns)?,
        ),
    };
    Ok(table)
}

pub(super) fn cli_report(args: &[String], db: &Database, session: &Session) -> Result<()> {
    let kind = ReportKind::parse(args)?;
    match build(kind, db, session)? {
        Table::Trend(rows) => print_trend(&rows),
        Table::Categories(rows) => print_categories(&rows, kind),
        Table::Merchants(rows) => print_merchants(&rows),
        Table::Budget(period, rows) => print_budget(&rows, period),
    }
    Ok(())
}

pub(super) fn cli_chart(
    args: &[String],
    db: &Database,
    session: &Session,
    chart_dir: &Path,
) -> Result<()> {
    let kind = ReportKind::parse(args)?;
    let renderer = ChartRenderer::new(chart_dir);
    let user_id = session.user_id;
    let outcome = match build(kind, db, session)? {
        Table::Trend(rows) => renderer.monthly_trend(&rows, user_id)?,
        Table::Categories(rows) => renderer.category_breakdown(&rows, user_id)?,
        Table::Merchants(rows) => renderer.top_merchants(&rows, user_id)?,
        Table::Budget(period, rows) => renderer.budget_vs_actual(&rows, user_id, period)?,
    };
    match outcome {
        crate::charts::ChartOutcome::Saved(path) => {
            println!("Chart saved to {}", path.display())
        }
        no_data => println!("{no_data}"),
    }
    Ok(())
}

fn print_trend(rows: &[analytics::MonthlyTotal]) {
    if rows.is_empty() {
        println!("No expenses recorded");
        return;
    }
    println!("Monthly Expense Trend");
    println!("{:<8} {:>14}", "Month", "Total Spent");
    println!("{}", "─".repeat(23));
    for row in rows {
        println!("{:<8} {:>14}", row.month, format_amount(row.total));
    }
}

fn print_categories(rows: &[analytics::CategoryTotal], kind: ReportKind) {
    let scope = match kind {
        ReportKind::Categories(CategoryFilter::Month(m)) => format!(" (month {m}, all years)"),
        ReportKind::Categories(CategoryFilter::Period(p)) => format!(" ({p})"),
        _ => String::new(),
    };
    if rows.is_empty() {
        println!("No expenses recorded{scope}");
        return;
    }
    let total: Decimal = rows.iter().map(|r| r.total).sum();
    println!("Expense Breakdown by Category{scope}");
    println!("{:<24} {:>14} {:>7}", "Category", "Total", "Share");
    println!("{}", "─".repeat(47));
    for row in rows {
        let share = (!total.is_zero()).then(|| (row.total / total * Decimal::ONE_HUNDRED).round_dp(1));
        println!(
            "{:<24} {:>14} {:>7}",
            truncate(&row.category, 24),
            format_amount(row.total),
            format_percent(share)
        );
    }
    println!("{:<24} {:>14}", "Total", format_amount(total));
}

fn print_merchants(rows: &[analytics::MerchantTotal]) {
    if rows.is_empty() {
        println!("No merchant spending recorded");
        return;
    }
    println!("Top Merchants by Spending");
    println!("{:<4} {:<24} {:>14}", "#", "Merchant", "Total");
    println!("{}", "─".repeat(44));
    for (i, row) in rows.iter().enumerate() {
        println!(
            "{:<4} {:<24} {:>14}",
            i + 1,
            truncate(&row.merchant, 24),
            format_amount(row.total)
        );
    }
}

fn print_budget(rows: &[analytics::BudgetComparison], period: Period) {
    if rows.is_empty() {
        println!("No budgets set for {period}");
        return;
    }
    println!("Budget vs Actual for {period}");
    println!(
        "{:<20} {:>12} {:>12} {:>12} {:>7}  Status",
        "Category", "Budget", "Actual", "Variance", "Used"
    );
    println!("{}", "─".repeat(78));
    for row in rows {
        println!(
            "{:<20} {:>12} {:>12} {:>12} {:>7}  {}",
            truncate(&row.category, 20),
            format_amount(row.budget),
            format_amount(row.actual),
            format_amount(row.variance),
            format_percent(row.percent_used()),
            row.status.as_str()
        );
    }
    let budget: Decimal = rows.iter().map(|r| r.budget).sum();
    let actual: Decimal = rows.iter().map(|r| r.actual).sum();
    println!(
        "{:<20} {:>12} {:>12} {:>12}",
        "Total",
        format_amount(budget),
        format_amount(actual),
        format_amount(budget - actual)
    );
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
