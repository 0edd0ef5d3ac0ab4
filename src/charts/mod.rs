//! Renders report tables as SVG chart files.

mod error;
mod svg;

use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analytics::{BudgetComparison, CategoryTotal, MerchantTotal, MonthlyTotal};
use crate::models::Period;

pub(crate) use error::ChartError;

const MAX_NAME_ATTEMPTS: usize = 100;

use svg::{BarChart, Series, PALETTE};

/// Result of a render request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChartOutcome {
    Saved(PathBuf),
    /// The table was empty; nothing was drawn.
    NoData,
}

impl std::fmt::Display for ChartOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Saved(path) => write!(f, "{}", path.display()),
            Self::NoData => write!(f, "No data available to plot."),
        }
    }
}

pub(crate) struct ChartRenderer {
    output_dir: PathBuf,
}

impl ChartRenderer {
    pub(crate) fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub(crate) fn monthly_trend(
        &self,
        rows: &[MonthlyTotal],
        user_id: i64,
    ) -> Result<ChartOutcome, ChartError> {
        if rows.is_empty() {
            return Ok(ChartOutcome::NoData);
        }
        let document = svg::bar_chart(&BarChart {
            title: "Monthly Expense Trend",
            x_label: "Month",
            y_label: "Total Spent",
            labels: rows.iter().map(|r| r.month.to_string()).collect(),
            series: vec![Series {
                name: "Total Spent",
                color: PALETTE[2],
                values: rows.iter().map(|r| to_f64(r.total)).collect(),
            }],
        });
        self.save(&chart_file_name(user_id, "monthly_trend", now()), &document)
    }

    pub(crate) fn category_breakdown(
        &self,
        rows: &[CategoryTotal],
        user_id: i64,
    ) -> Result<ChartOutcome, ChartError> {
        if rows.is_empty() {
            return Ok(ChartOutcome::NoData);
        }
        let labels: Vec<String> = rows.iter().map(|r| r.category.clone()).collect();
        let values: Vec<f64> = rows.iter().map(|r| to_f64(r.total)).collect();
        let document = svg::pie_chart("Expense Breakdown by Category", &labels, &values);
        self.save(
            &chart_file_name(user_id, "category_breakdown", now()),
            &document,
        )
    }

    pub(crate) fn top_merchants(
        &self,
        rows: &[MerchantTotal],
        user_id: i64,
    ) -> Result<ChartOutcome, ChartError> {
        if rows.is_empty() {
            return Ok(ChartOutcome::NoData);
        }
        let document = svg::bar_chart(&BarChart {
            title: "Top Merchants by Spending",
            x_label: "Merchant",
            y_label: "Total Spent",
            labels: rows.iter().map(|r| r.merchant.clone()).collect(),
            series: vec![Series {
                name: "Total Spent",
                color: PALETTE[1],
                values: rows.iter().map(|r| to_f64(r.total)).collect(),
            }],
        });
        self.save(&chart_file_name(user_id, "top_merchants", now()), &document)
    }

    pub(crate) fn budget_vs_actual(
        &self,
        rows: &[BudgetComparison],
        user_id: i64,
        period: Period,
    ) -> Result<ChartOutcome, ChartError> {
        if rows.is_empty() {
            return Ok(ChartOutcome::NoData);
        }
        let title = format!("Budget vs Actual Spending for {period}");
        let document = svg::bar_chart(&BarChart {
            title: &title,
            x_label: "Category",
            y_label: "Amount",
            labels: rows.iter().map(|r| r.category.clone()).collect(),
            series: vec![
                Series {
                    name: "Budget",
                    color: PALETTE[1],
                    values: rows.iter().map(|r| to_f64(r.budget)).collect(),
                },
                Series {
                    name: "Actual",
                    color: PALETTE[5],
                    values: rows.iter().map(|r| to_f64(r.actual)).collect(),
                },
            ],
        });
        let kind = format!(
            "budget_vs_actual_{:04}_{:02}",
            period.year(),
            period.month()
        );
        self.save(&chart_file_name(user_id, &kind, now()), &document)
    }

    fn save(&self, file_name: &str, document: &str) -> Result<ChartOutcome, ChartError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| ChartError::CreateDir {
            path: self.output_dir.clone(),
            source,
        })?;

        let (file, path) = self.create_unique(file_name)?;
        if let Err(source) = write_file(file, document.as_bytes()) {
            // Never leave a truncated chart behind
            if std::fs::remove_file(&path).is_ok() {
                debug!(path = %path.display(), "removed partial chart");
            }
            return Err(ChartError::Write { path, source });
        }

        info!(path = %path.display(), bytes = document.len(), "saved chart");
        Ok(ChartOutcome::Saved(path))
    }

    /// Existing charts are never overwritten; a taken name gets `_1`, `_2`, ...
    fn create_unique(&self, file_name: &str) -> Result<(File, PathBuf), ChartError> {
        let (stem, ext) = file_name.rsplit_once('.').unwrap_or((file_name, "svg"));
        let mut path = self.output_dir.join(file_name);
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((file, path)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "chart name taken");
                    path = self.output_dir.join(format!("{stem}_{attempt}.{ext}"));
                }
                Err(source) => return Err(ChartError::Write { path, source }),
            }
        }
        Err(ChartError::Write {
            path,
            source: io::Error::new(io::ErrorKind::AlreadyExists, "no free chart file name"),
        })
    }
}

/// The handle is closed on every return path when `file` drops.
fn write_file(file: File, bytes: &[u8]) -> io::Result<()> {
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes)?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

/// `user_{id}_{kind}_{YYYYmmddHHMMSSmmm}.svg`
pub(crate) fn chart_file_name(user_id: i64, kind: &str, at: NaiveDateTime) -> String {
    format!("user_{user_id}_{kind}_{}.svg", at.format("%Y%m%d%H%M%S%3f"))
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn to_f64(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests;
