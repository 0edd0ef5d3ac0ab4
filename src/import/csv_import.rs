use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use csv::Trim;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

use crate::models::{Transaction, TransactionKind, DATE_TIME_FORMAT};

/// One input row. Only `date` and `amount` are required; any extra columns
/// (such as `account` in an export) are ignored.
#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    #[serde(default)]
    kind: String,
    amount: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    merchant: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    date: String,
    kind: &'static str,
    amount: Decimal,
    category: &'a str,
    account: &'a str,
    merchant: &'a str,
    description: &'a str,
}

impl<'a> From<&'a Transaction> for ExportRow<'a> {
    fn from(txn: &'a Transaction) -> Self {
        Self {
            date: txn.date.format(DATE_TIME_FORMAT).to_string(),
            kind: txn.kind.as_str(),
            amount: txn.amount,
            category: &txn.category_name,
            account: &txn.account_name,
            merchant: txn.merchant_name.as_deref().unwrap_or(""),
            description: txn.description.as_deref().unwrap_or(""),
        }
    }
}

/// A parsed row, not yet tied to an account or to category/merchant ids.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ImportRecord {
    pub(crate) date: NaiveDateTime,
    pub(crate) kind: TransactionKind,
    pub(crate) amount: Decimal,
    pub(crate) category: Option<String>,
    pub(crate) merchant: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) import_hash: String,
}

pub(crate) struct CsvImporter;

impl CsvImporter {
    pub(crate) fn read_path(path: &Path) -> Result<Vec<ImportRecord>> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
        Self::read(file)
    }

    /// Parse CSV with a header row. A missing `kind` is taken from the sign
    /// of the amount (negative means expense). Rows with an empty date or a
    /// zero amount are skipped.
    pub(crate) fn read<R: Read>(reader: R) -> Result<Vec<ImportRecord>> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut records = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        for (i, result) in rdr.deserialize::<CsvRow>().enumerate() {
            // Header is line 1
            let line = i + 2;
            let row = result.with_context(|| format!("Row {line}: failed to read CSV record"))?;

            if row.date.is_empty() {
                continue;
            }
            let date = parse_date(&row.date)
                .with_context(|| format!("Row {line}: failed to parse date '{}'", row.date))?;
            let signed = parse_decimal(&row.amount)
                .with_context(|| format!("Row {line}: failed to parse amount"))?;
            if signed.is_zero() {
                debug!(line, "skipping zero-amount row");
                continue;
            }

            let kind = if row.kind.is_empty() {
                if signed < Decimal::ZERO {
                    TransactionKind::Expense
                } else {
                    TransactionKind::Income
                }
            } else {
                TransactionKind::parse(&row.kind).with_context(|| format!("Row {line}"))?
            };
            let amount = signed.abs();

            let key = [
                date.format(DATE_TIME_FORMAT).to_string(),
                kind.as_str().to_string(),
                amount.normalize().to_string(),
                row.category.clone(),
                row.merchant.clone(),
                row.description.clone(),
            ]
            .join("|");
            // Identical rows in one file are distinct transactions
            let occurrence = seen.entry(key.clone()).or_insert(0);
            let import_hash = compute_hash(&key, *occurrence);
            *occurrence += 1;

            records.push(ImportRecord {
                date,
                kind,
                amount,
                category: non_empty(row.category),
                merchant: non_empty(row.merchant),
                description: non_empty(row.description),
                import_hash,
            });
        }

        Ok(records)
    }
}

/// Write transactions as CSV with a header row. Returns the number written.
pub(crate) fn write_csv<W: Write>(writer: W, txns: &[Transaction]) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    for txn in txns {
        wtr.serialize(ExportRow::from(txn))?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(txns.len())
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

fn parse_date(s: &str) -> Result<NaiveDateTime> {
    for fmt in &[DATE_TIME_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    // `%Y` also accepts two digits, so each short-year form goes first
    for fmt in &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y", "%m-%d-%Y", "%d/%m/%y", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d.and_hms_opt(0, 0, 0).unwrap_or_default());
        }
    }
    anyhow::bail!("Could not parse date: {}", s)
}

pub(crate) fn parse_decimal(s: &str) -> Result<Decimal> {
    let cleaned = s
        .replace(['$', ','], "")
        .replace('(', "-")
        .replace(')', "")
        .trim()
        .to_string();
    if cleaned.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_str(&cleaned.replace('"', "")))
        .context(format!("Failed to parse '{}' as decimal", s))
}

/// FNV-1a over the row key and its occurrence number within the file.
/// Stable across Rust releases, unlike `DefaultHasher`.
fn compute_hash(key: &str, occurrence: usize) -> String {
    let input = format!("{key}|{occurrence}");
    format!("{:016x}", fnv1a(input.as_bytes()))
}

fn fnv1a(data: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &byte in data {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
#[path = "csv_import_tests.rs"]
mod tests;
