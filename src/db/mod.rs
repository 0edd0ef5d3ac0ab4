mod schema;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::analytics::{BudgetSource, TransactionSource};
use crate::models::*;

const DEFAULT_EXPENSE_CATEGORIES: &[&str] = &[
    "Bills & Subscriptions",
    "Entertainment",
    "Food & Dining",
    "Groceries",
    "Health & Fitness",
    "Housing",
    "Shopping",
    "Transportation",
    "Travel",
    "Uncategorized",
    "Utilities",
];

const DEFAULT_INCOME_CATEGORIES: &[&str] = &["Freelance", "Gifts", "Interest", "Salary"];

const TRANSACTION_SELECT: &str = "SELECT t.id, t.user_id, t.account_id, t.category_id, t.merchant_id,
            t.amount, t.kind, t.transaction_date, t.description,
            c.name, a.name, m.name
     FROM transactions t
     JOIN categories c ON t.category_id = c.id
     JOIN accounts a ON t.account_id = a.id
     LEFT JOIN merchants m ON t.merchant_id = m.id";

pub(crate) struct Database {
    conn: Connection,
}

impl Database {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("Failed to set database pragmas")?;
        let mut db = Self { conn };
        db.migrate().context("Database migration failed")?;
        info!(path = %path.display(), "opened database");
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&mut self) -> Result<()> {
        let has_version_table: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !has_version_table {
            debug!(version = schema::CURRENT_VERSION, "creating schema");
            self.conn.execute_batch(schema::SCHEMA_V1)?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::CURRENT_VERSION],
            )?;
            return Ok(());
        }

        let current: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?
            .unwrap_or(0);

        for &(from_version, sql) in schema::MIGRATIONS {
            if current <= from_version {
                debug!(from_version, "applying migration");
                self.conn.execute_batch(sql)?;
            }
        }

        if current < schema::CURRENT_VERSION {
            self.conn.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::CURRENT_VERSION],
            )?;
        }

        Ok(())
    }

    // ── Users ─────────────────────────────────────────────────

    /// Insert a user and give them a starter set of categories.
    pub(crate) fn insert_user(&mut self, user: &User) -> Result<i64> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO users (username, role, created_at) VALUES (?1, ?2, ?3)",
            params![user.username, user.role.as_str(), user.created_at],
        )
        .with_context(|| format!("User '{}' already exists", user.username))?;
        let user_id = tx.last_insert_rowid();

        let defaults = DEFAULT_EXPENSE_CATEGORIES
            .iter()
            .map(|name| (name, TransactionKind::Expense))
            .chain(
                DEFAULT_INCOME_CATEGORIES
                    .iter()
                    .map(|name| (name, TransactionKind::Income)),
            );
        for (name, kind) in defaults {
            tx.execute(
                "INSERT OR IGNORE INTO categories (user_id, name, kind) VALUES (?1, ?2, ?3)",
                params![user_id, name, kind.as_str()],
            )?;
        }
        tx.commit()?;
        info!(user_id, username = %user.username, "created user");
        Ok(user_id)
    }

    pub(crate) fn get_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, username, role, created_at FROM users ORDER BY username")?;
        let rows = stmt.query_map([], user_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn get_user_by_name(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, username, role, created_at FROM users WHERE username = ?1",
                params![username],
                user_from_row,
            )
            .optional()?)
    }

    // ── Accounts ──────────────────────────────────────────────

    pub(crate) fn insert_account(&self, account: &Account) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO accounts (user_id, name, kind, balance, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    account.user_id,
                    account.name,
                    account.kind.as_str(),
                    account.balance.to_string(),
                    account.created_at,
                ],
            )
            .with_context(|| format!("Failed to create account '{}'", account.name))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub(crate) fn get_accounts(&self, user_id: i64) -> Result<Vec<Account>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, kind, balance, created_at FROM accounts
             WHERE user_id = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![user_id], account_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn get_account_by_id(&self, id: i64) -> Result<Option<Account>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, user_id, name, kind, balance, created_at FROM accounts WHERE id = ?1",
                params![id],
                account_from_row,
            )
            .optional()?)
    }

    // ── Categories ────────────────────────────────────────────

    pub(crate) fn insert_category(&self, cat: &Category) -> Result<i64> {
        let existing = self.get_categories(cat.user_id)?;
        if Category::find_by_name(&existing, &cat.name).is_some() {
            anyhow::bail!("Category '{}' already exists", cat.name);
        }
        self.conn.execute(
            "INSERT INTO categories (user_id, name, kind, parent_id) VALUES (?1, ?2, ?3, ?4)",
            params![cat.user_id, cat.name, cat.kind.as_str(), cat.parent_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub(crate) fn get_categories(&self, user_id: i64) -> Result<Vec<Category>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, kind, parent_id FROM categories
             WHERE user_id = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(Category {
                id: Some(row.get(0)?),
                user_id: row.get(1)?,
                name: row.get(2)?,
                kind: kind_column(row, 3)?,
                parent_id: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Returns false when no such category belongs to the user.
    pub(crate) fn delete_category(&self, id: i64, user_id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute(
                "DELETE FROM categories WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .context("Category is still referenced by transactions")?;
        Ok(deleted > 0)
    }

    // ── Merchants ─────────────────────────────────────────────

    pub(crate) fn find_or_create_merchant(&self, user_id: i64, name: &str) -> Result<Merchant> {
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("Merchant name cannot be empty");
        }
        self.conn.execute(
            "INSERT OR IGNORE INTO merchants (user_id, name) VALUES (?1, ?2)",
            params![user_id, name],
        )?;
        Ok(self.conn.query_row(
            "SELECT id, user_id, name FROM merchants WHERE user_id = ?1 AND name = ?2",
            params![user_id, name],
            |row| {
                Ok(Merchant {
                    id: Some(row.get(0)?),
                    user_id: row.get(1)?,
                    name: row.get(2)?,
                })
            },
        )?)
    }

    pub(crate) fn get_merchants(&self, user_id: i64) -> Result<Vec<Merchant>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, user_id, name FROM merchants WHERE user_id = ?1 ORDER BY name")?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(Merchant {
                id: Some(row.get(0)?),
                user_id: row.get(1)?,
                name: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    // ── Transactions ──────────────────────────────────────────

    /// Insert a transaction and apply it to its account balance atomically.
    pub(crate) fn insert_transaction(&mut self, txn: &Transaction) -> Result<i64> {
        let tx = self.conn.transaction()?;
        let id = insert_transaction_row(&tx, txn, "")?;
        tx.commit()?;
        debug!(id, kind = %txn.kind, amount = %txn.amount, "inserted transaction");
        Ok(id)
    }

    /// Insert imported transactions, skipping any whose hash is already
    /// recorded for the user. Returns the number inserted.
    pub(crate) fn insert_transactions_batch(
        &mut self,
        batch: &[(Transaction, String)],
    ) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut count = 0;
        for (txn, hash) in batch {
            if !hash.is_empty() {
                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM transactions WHERE user_id = ?1 AND import_hash = ?2)",
                    params![txn.user_id, hash],
                    |row| row.get(0),
                )?;
                if exists {
                    continue;
                }
            }
            insert_transaction_row(&tx, txn, hash)?;
            count += 1;
        }
        tx.commit()?;
        Ok(count)
    }

    /// Newest first.
    pub(crate) fn get_transactions(
        &self,
        user_id: i64,
        limit: Option<u32>,
    ) -> Result<Vec<Transaction>> {
        let mut sql = format!(
            "{TRANSACTION_SELECT} WHERE t.user_id = ?1 ORDER BY t.transaction_date DESC, t.id DESC"
        );
        if let Some(l) = limit {
            sql.push_str(&format!(" LIMIT {l}"));
        }
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id], transaction_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Delete a transaction and reverse its effect on the account balance.
    /// Returns false when no such transaction belongs to the user.
    pub(crate) fn delete_transaction(&mut self, id: i64, user_id: i64) -> Result<bool> {
        let tx = self.conn.transaction()?;
        let existing = tx
            .query_row(
                &format!("{TRANSACTION_SELECT} WHERE t.id = ?1 AND t.user_id = ?2"),
                params![id, user_id],
                transaction_from_row,
            )
            .optional()?;
        let Some(txn) = existing else {
            return Ok(false);
        };
        tx.execute("DELETE FROM transactions WHERE id = ?1", params![id])?;
        adjust_balance(&tx, txn.account_id, -txn.balance_effect())?;
        tx.commit()?;
        debug!(id, "deleted transaction");
        Ok(true)
    }

    // ── Budgets ───────────────────────────────────────────────

    /// One budget per (user, category, period); setting it again replaces
    /// the amount.
    pub(crate) fn upsert_budget(&self, budget: &Budget) -> Result<i64> {
        if budget.amount <= Decimal::ZERO {
            anyhow::bail!("Budget amount must be positive");
        }
        let id = self.conn.query_row(
            "INSERT INTO budgets (user_id, category_id, amount, year, month)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, category_id, year, month) DO UPDATE SET amount = excluded.amount
             RETURNING id",
            params![
                budget.user_id,
                budget.category_id,
                budget.amount.to_string(),
                budget.period.year(),
                budget.period.month(),
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Ordered by category name.
    pub(crate) fn get_budgets_for_period(&self, user_id: i64, period: Period) -> Result<Vec<Budget>> {
        let mut stmt = self.conn.prepare(
            "SELECT b.id, b.user_id, b.category_id, c.name, c.kind, b.amount, b.year, b.month
             FROM budgets b
             JOIN categories c ON b.category_id = c.id
             WHERE b.user_id = ?1 AND b.year = ?2 AND b.month = ?3
             ORDER BY c.name",
        )?;
        let rows = stmt.query_map(params![user_id, period.year(), period.month()], |row| {
            let year: i32 = row.get(6)?;
            let month: u32 = row.get(7)?;
            Ok(Budget {
                id: Some(row.get(0)?),
                user_id: row.get(1)?,
                category_id: row.get(2)?,
                category_name: row.get(3)?,
                category_kind: kind_column(row, 4)?,
                amount: decimal_column(row, 5)?,
                period: Period::new(year, month).map_err(|e| conversion_error(7, e))?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn delete_budget(&self, id: i64, user_id: i64) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM budgets WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(deleted > 0)
    }
}

impl TransactionSource for Database {
    fn transactions_for_user(&self, user_id: i64) -> Result<Vec<Transaction>> {
        self.get_transactions(user_id, None)
            .with_context(|| format!("Failed to load transactions for user {user_id}"))
    }
}

impl BudgetSource for Database {
    fn budgets_for_period(&self, user_id: i64, period: Period) -> Result<Vec<Budget>> {
        self.get_budgets_for_period(user_id, period)
            .with_context(|| format!("Failed to load budgets for {period}"))
    }
}

fn insert_transaction_row(
    tx: &rusqlite::Transaction<'_>,
    txn: &Transaction,
    import_hash: &str,
) -> Result<i64> {
    if txn.amount <= Decimal::ZERO {
        anyhow::bail!("Transaction amount must be positive, got {}", txn.amount);
    }
    tx.execute(
        "INSERT INTO transactions (user_id, account_id, category_id, merchant_id, amount, kind,
                                   transaction_date, description, import_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            txn.user_id,
            txn.account_id,
            txn.category_id,
            txn.merchant_id,
            txn.amount.to_string(),
            txn.kind.as_str(),
            txn.date.format(DATE_TIME_FORMAT).to_string(),
            txn.description,
            import_hash,
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    let id = tx.last_insert_rowid();
    adjust_balance(tx, txn.account_id, txn.balance_effect())?;
    Ok(id)
}

fn adjust_balance(tx: &rusqlite::Transaction<'_>, account_id: i64, delta: Decimal) -> Result<()> {
    let current = tx
        .query_row(
            "SELECT balance FROM accounts WHERE id = ?1",
            params![account_id],
            |row| decimal_column(row, 0),
        )
        .optional()?
        .ok_or_else(|| anyhow::anyhow!("Account {account_id} not found"))?;
    tx.execute(
        "UPDATE accounts SET balance = ?1 WHERE id = ?2",
        params![(current + delta).to_string(), account_id],
    )?;
    Ok(())
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn kind_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<TransactionKind> {
    let raw: String = row.get(idx)?;
    TransactionKind::parse(&raw).map_err(|e| conversion_error(idx, e))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: Some(row.get(0)?),
        username: row.get(1)?,
        role: Role::parse(&row.get::<_, String>(2)?),
        created_at: row.get(3)?,
    })
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    let kind: String = row.get(3)?;
    Ok(Account {
        id: Some(row.get(0)?),
        user_id: row.get(1)?,
        name: row.get(2)?,
        kind: AccountKind::parse(&kind).map_err(|e| conversion_error(3, e))?,
        balance: decimal_column(row, 4)?,
        created_at: row.get(5)?,
    })
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let date: String = row.get(7)?;
    Ok(Transaction {
        id: Some(row.get(0)?),
        user_id: row.get(1)?,
        account_id: row.get(2)?,
        category_id: row.get(3)?,
        merchant_id: row.get(4)?,
        amount: decimal_column(row, 5)?,
        kind: kind_column(row, 6)?,
        date: NaiveDateTime::parse_from_str(&date, DATE_TIME_FORMAT)
            .map_err(|e| conversion_error(7, e))?,
        description: row.get(8)?,
        category_name: row.get(9)?,
        account_name: row.get(10)?,
        merchant_name: row.get(11)?,
    })
}
