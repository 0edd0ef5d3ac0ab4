mod csv_import;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

use crate::db::Database;
use crate::models::{Account, Category, Transaction, TransactionKind};
use crate::session::Session;

pub(crate) use csv_import::{parse_decimal, write_csv, CsvImporter, ImportRecord};

/// Category for rows that name none, or name one of the other kind.
pub(crate) fn fallback_category(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Expense => "Uncategorized",
        TransactionKind::Income => "Uncategorized Income",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ImportSummary {
    pub(crate) parsed: usize,
    pub(crate) imported: usize,
    pub(crate) new_categories: usize,
}

impl ImportSummary {
    pub(crate) fn duplicates(&self) -> usize {
        self.parsed - self.imported
    }
}

/// Read a CSV file and post its rows to `account`.
pub(crate) fn import_file(
    db: &mut Database,
    session: &Session,
    account: &Account,
    path: &Path,
) -> Result<ImportSummary> {
    let records = CsvImporter::read_path(path)?;
    import_records(db, session, account, &records)
}

/// Resolve categories and merchants by name, creating any that are missing,
/// then insert the rows, skipping ones already imported.
pub(crate) fn import_records(
    db: &mut Database,
    session: &Session,
    account: &Account,
    records: &[ImportRecord],
) -> Result<ImportSummary> {
    let account_id = account
        .id
        .ok_or_else(|| anyhow::anyhow!("Account '{}' has no ID", account.name))?;
    let mut categories = db.get_categories(session.user_id)?;
    let mut new_categories = 0;
    let mut batch = Vec::with_capacity(records.len());

    for record in records {
        let fallback = fallback_category(record.kind);
        let mut name = record.category.as_deref().unwrap_or(fallback);
        if let Some(existing) = Category::find_by_name(&categories, name) {
            if existing.kind != record.kind {
                warn!(
                    category = %existing.name,
                    kind = %record.kind,
                    fallback,
                    "row kind does not match category; using fallback"
                );
                name = fallback;
            }
        }

        let found = Category::find_by_name(&categories, name).map(|c| (c.id, c.kind));
        let category_id = match found {
            Some((_, kind)) if kind != record.kind => anyhow::bail!(
                "Category '{name}' is {kind}, cannot hold {} rows",
                record.kind
            ),
            Some((id, _)) => id.ok_or_else(|| anyhow::anyhow!("Category '{name}' has no ID"))?,
            None => {
                let cat = Category::new(session.user_id, name.to_string(), record.kind);
                let id = db
                    .insert_category(&cat)
                    .with_context(|| format!("Failed to create category '{name}'"))?;
                categories.push(Category { id: Some(id), ..cat });
                new_categories += 1;
                id
            }
        };

        let mut txn = Transaction::new(
            session.user_id,
            account_id,
            category_id,
            record.amount,
            record.kind,
            record.date,
        )?;
        if let Some(merchant) = &record.merchant {
            let m = db.find_or_create_merchant(session.user_id, merchant)?;
            if let Some(id) = m.id {
                txn = txn.with_merchant(id, m.name);
            }
        }
        if let Some(desc) = &record.description {
            txn = txn.with_description(desc.clone());
        }
        batch.push((txn, record.import_hash.clone()));
    }

    let imported = db.insert_transactions_batch(&batch)?;
    let summary = ImportSummary {
        parsed: records.len(),
        imported,
        new_categories,
    };
    info!(
        user_id = session.user_id,
        account = %account.name,
        parsed = summary.parsed,
        imported = summary.imported,
        "imported transactions"
    );
    Ok(summary)
}

/// Write all of the session user's transactions to `path`, newest first.
pub(crate) fn export_file(db: &Database, session: &Session, path: &Path) -> Result<usize> {
    let txns = db.get_transactions(session.user_id, None)?;
    if txns.is_empty() {
        return Ok(0);
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let count = write_csv(file, &txns)?;
    info!(user_id = session.user_id, count, path = %path.display(), "exported transactions");
    Ok(count)
}

#[cfg(test)]
mod tests;
