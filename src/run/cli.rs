use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::path::Path;
use tracing::info;

use crate::db::Database;
use crate::models::*;
use crate::session::Session;
use crate::util::{expand_home, format_amount, truncate};

pub(crate) fn print_usage() {
    println!("expense-tracker: personal expense tracking with spending reports");
    println!();
    println!("Usage: expense-tracker [--user <name>] <command>");
    println!();
    println!("Users:");
    println!("  user add <name> [--admin]     Create a user");
    println!("  users                         List users");
    println!();
    println!("Setup:");
    println!("  account add <name> <type>     Create an account (cash, bank, credit)");
    println!("  accounts                      List accounts with balances");
    println!("  category add <name> <kind>    Create a category (income, expense)");
    println!("    --parent <id>               Nest under another category");
    println!("  category delete <id>          Delete an unused category");
    println!("  categories                    List categories");
    println!("  merchants                     List merchants");
    println!();
    println!("Transactions:");
    println!("  add <kind> <amount> <category>");
    println!("    --account <name>            Account (optional with a single account)");
    println!("    --merchant <name>           Merchant, created on first use");
    println!("    --date <YYYY-MM-DD[ HH:MM:SS]>  Defaults to now");
    println!("    --desc <text>               Description");
    println!("  txns [--limit N]              List transactions, newest first");
    println!("  delete-txn <id>               Delete a transaction");
    println!("  import <file.csv>             Import transactions from CSV");
    println!("    --account <name>            Account to import into");
    println!("  export [path]                 Export all transactions to CSV");
    println!();
    println!("Budgets:");
    println!("  budget set <category> <amount> <YYYY-MM>");
    println!("  budget delete <id>");
    println!("  budgets [YYYY-MM]             List budgets (default: current month)");
    println!();
    println!("Reports (print a table) and charts (save an SVG):");
    println!("  report|chart trend            Monthly expense trend");
    println!("  report|chart categories [M|YYYY-MM]  Spending by category");
    println!("  report|chart merchants [--top N]     Top merchants (default 5)");
    println!("  report|chart budget [YYYY-MM]        Budget vs actual");
    println!();
    println!("  --help, -h                    Show this help");
    println!("  --version, -V                 Show version");
}

// ── Argument helpers ─────────────────────────────────────────

/// Value following `name`, e.g. `--account Checking`.
pub(super) fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

/// Arguments that are neither flags nor flag values. Every flag except
/// `switches` is assumed to take a value.
pub(super) fn positionals<'a>(args: &'a [String], switches: &[&str]) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg.starts_with("--") {
            if !switches.contains(&arg.as_str()) {
                iter.next();
            }
        } else {
            out.push(arg.as_str());
        }
    }
    out
}

fn parse_id(s: Option<&str>, what: &str) -> Result<i64> {
    let raw = s.ok_or_else(|| anyhow::anyhow!("Missing {what} ID"))?;
    raw.parse()
        .with_context(|| format!("Invalid {what} ID '{raw}'"))
}

fn parse_amount(raw: &str) -> Result<rust_decimal::Decimal> {
    let amount = crate::import::parse_decimal(raw)?;
    if amount <= rust_decimal::Decimal::ZERO {
        return Err(ModelError::NonPositiveAmount(amount).into());
    }
    Ok(amount)
}

pub(super) fn parse_when(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, DATE_TIME_FORMAT)
        .or_else(|_| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
        })
        .with_context(|| format!("Invalid date '{raw}' (expected YYYY-MM-DD[ HH:MM:SS])"))
}

fn find_category<'a>(categories: &'a [Category], name: &str) -> Result<&'a Category> {
    Category::find_by_name(categories, name).ok_or_else(|| {
        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        anyhow::anyhow!(
            "Category '{name}' not found. Available: {}",
            names.join(", ")
        )
    })
}

/// `--account <name>`, or the only account when the user has just one.
fn resolve_account(db: &Database, session: &Session, name: Option<&str>) -> Result<Account> {
    let accounts = db.get_accounts(session.user_id)?;
    if let Some(name) = name {
        return Account::find_by_name(&accounts, name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Account '{name}' not found"));
    }
    match accounts.as_slice() {
        [] => anyhow::bail!("No accounts found. Create one with: account add <name> <type>"),
        // A single account needs no flag
        [only] => Ok(only.clone()),
        many => {
            let names: Vec<String> = many
                .iter()
                .map(|a| format!("  --account \"{}\"  ({})", a.name, a.kind))
                .collect();
            anyhow::bail!(
                "Multiple accounts found. Use --account <name> to specify:\n{}",
                names.join("\n")
            );
        }
    }
}

// ── Users ────────────────────────────────────────────────────

pub(super) fn cli_user(args: &[String], db: &mut Database, active: Option<&str>) -> Result<()> {
    let pos = positionals(args, &["--admin"]);
    match pos.as_slice() {
        ["add", name] => {
            let name = name.trim();
            if name.is_empty() {
                anyhow::bail!("User name cannot be empty");
            }
            let wants_admin = args.iter().any(|a| a == "--admin");
            // The first user may make themselves admin; after that only an admin can
            if wants_admin && !db.get_users()?.is_empty() {
                let caller = match active {
                    Some(n) => Some(Session::login(db, n)?),
                    None => None,
                };
                if !caller.is_some_and(|s| s.is_admin()) {
                    anyhow::bail!("Only an admin can create another admin");
                }
            }
            let role = if wants_admin { Role::Admin } else { Role::User };
            let id = db.insert_user(&User::new(name.to_string(), role))?;
            println!("Created {role} '{name}' (ID {id})");
            Ok(())
        }
        _ => anyhow::bail!("Usage: expense-tracker user add <name> [--admin]"),
    }
}

pub(super) fn cli_users(db: &Database) -> Result<()> {
    let users = db.get_users()?;
    if users.is_empty() {
        println!("No users");
        return Ok(());
    }
    println!("{:<4} {:<20} Role", "ID", "Name");
    println!("{}", "─".repeat(32));
    for user in &users {
        let marker = if user.is_admin() { " *" } else { "" };
        println!(
            "{:<4} {:<20} {}{marker}",
            user.id.unwrap_or(0),
            user.username,
            user.role
        );
    }
    Ok(())
}

// ── Accounts ─────────────────────────────────────────────────

pub(super) fn cli_account(args: &[String], db: &Database, session: &Session) -> Result<()> {
    let pos = positionals(args, &[]);
    match pos.as_slice() {
        ["add", name, kind] => {
            let kind = AccountKind::parse(kind).map_err(|e| {
                let kinds: Vec<&str> = AccountKind::all().iter().map(|k| k.label()).collect();
                anyhow::anyhow!("{e}. Known types: {}", kinds.join(", "))
            })?;
            let id = db.insert_account(&Account::new(session.user_id, name.to_string(), kind))?;
            println!("Created {kind} account '{name}' (ID {id})");
            Ok(())
        }
        _ => anyhow::bail!("Usage: expense-tracker account add <name> <cash|bank|credit>"),
    }
}

pub(super) fn cli_accounts(db: &Database, session: &Session) -> Result<()> {
    let accounts = db.get_accounts(session.user_id)?;
    if accounts.is_empty() {
        println!("No accounts");
        return Ok(());
    }

    println!("{:<4} {:<20} {:<12} {:>14}", "ID", "Name", "Type", "Balance");
    println!("{}", "─".repeat(53));
    for acct in &accounts {
        let owed = if acct.kind.is_credit() && acct.balance < rust_decimal::Decimal::ZERO {
            " owed"
        } else {
            ""
        };
        println!(
            "{:<4} {:<20} {:<12} {:>14}{owed}",
            acct.id.unwrap_or(0),
            truncate(&acct.name, 20),
            acct.kind,
            format_amount(acct.balance),
        );
    }
    Ok(())
}

// ── Categories & merchants ───────────────────────────────────

pub(super) fn cli_category(args: &[String], db: &Database, session: &Session) -> Result<()> {
    let pos = positionals(args, &[]);
    match pos.as_slice() {
        ["add", name, kind] => {
            let kind = TransactionKind::parse(kind)?;
            let mut cat = Category::new(session.user_id, name.to_string(), kind);
            if let Some(raw) = flag(args, "--parent") {
                let parent_id = parse_id(Some(raw), "parent category")?;
                let existing = db.get_categories(session.user_id)?;
                if Category::find_by_id(&existing, parent_id).is_none() {
                    anyhow::bail!("Parent category {parent_id} not found");
                }
                cat.parent_id = Some(parent_id);
            }
            let id = db.insert_category(&cat)?;
            println!("Created {kind} category '{name}' (ID {id})");
            Ok(())
        }
        ["delete", id] => {
            let id = parse_id(Some(*id), "category")?;
            if db.delete_category(id, session.user_id)? {
                println!("Deleted category {id}");
                Ok(())
            } else {
                anyhow::bail!("Category {id} not found")
            }
        }
        _ => anyhow::bail!(
            "Usage: expense-tracker category add <name> <income|expense> [--parent <id>]\n       expense-tracker category delete <id>"
        ),
    }
}

pub(super) fn cli_categories(db: &Database, session: &Session) -> Result<()> {
    let categories = db.get_categories(session.user_id)?;
    if categories.is_empty() {
        println!("No categories");
        return Ok(());
    }

    println!("{:<4} {:<24} {:<8} Parent", "ID", "Name", "Kind");
    println!("{}", "─".repeat(50));
    for kind in TransactionKind::all() {
        for cat in categories.iter().filter(|c| c.kind == *kind) {
            let parent = cat
                .parent_id
                .and_then(|id| Category::find_by_id(&categories, id))
                .map(|p| p.name.as_str())
                .unwrap_or("");
            println!(
                "{:<4} {:<24} {:<8} {parent}",
                cat.id.unwrap_or(0),
                truncate(&cat.name, 24),
                cat.kind,
            );
        }
    }
    Ok(())
}

pub(super) fn cli_merchants(db: &Database, session: &Session) -> Result<()> {
    let merchants = db.get_merchants(session.user_id)?;
    if merchants.is_empty() {
        println!("No merchants");
        return Ok(());
    }
    println!("{:<4} Name", "ID");
    println!("{}", "─".repeat(30));
    for m in &merchants {
        println!("{:<4} {}", m.id.unwrap_or(0), m.name);
    }
    Ok(())
}

// ── Transactions ─────────────────────────────────────────────

pub(super) fn cli_add(args: &[String], db: &mut Database, session: &Session) -> Result<()> {
    let pos = positionals(args, &[]);
    let [kind, amount, category] = pos.as_slice() else {
        anyhow::bail!(
            "Usage: expense-tracker add <expense|income> <amount> <category> --account <name> \
             [--merchant <name>] [--date YYYY-MM-DD] [--desc <text>]"
        );
    };

    let kind = TransactionKind::parse(kind)?;
    let amount = parse_amount(amount)?;
    let categories = db.get_categories(session.user_id)?;
    let category = find_category(&categories, category)?;
    if category.kind != kind {
        anyhow::bail!(
            "Category '{}' is an {} category, not {kind}",
            category.name,
            category.kind
        );
    }
    let category_id = category
        .id
        .ok_or_else(|| anyhow::anyhow!("Category has no ID"))?;
    let account = resolve_account(db, session, flag(args, "--account"))?;
    let account_id = account
        .id
        .ok_or_else(|| anyhow::anyhow!("Account has no ID"))?;
    let date = match flag(args, "--date") {
        Some(raw) => parse_when(raw)?,
        None => chrono::Local::now().naive_local(),
    };

    let mut txn = Transaction::new(session.user_id, account_id, category_id, amount, kind, date)?;
    if let Some(name) = flag(args, "--merchant") {
        let merchant = db.find_or_create_merchant(session.user_id, name)?;
        if let Some(id) = merchant.id {
            txn = txn.with_merchant(id, merchant.name);
        }
    }
    if let Some(desc) = flag(args, "--desc") {
        txn = txn.with_description(desc);
    }

    let id = db.insert_transaction(&txn)?;
    let sign = if txn.is_income() { "+" } else { "-" };
    println!(
        "Recorded {kind} {id}: {sign}{} in {} ({})",
        format_amount(amount),
        category.name,
        account.name
    );
    if let Some(updated) = db.get_account_by_id(account_id)? {
        println!("{} balance: {}", updated.name, format_amount(updated.balance));
    }
    Ok(())
}

pub(super) fn cli_txns(args: &[String], db: &Database, session: &Session) -> Result<()> {
    let limit = flag(args, "--limit")
        .map(|raw| {
            raw.parse::<u32>()
                .with_context(|| format!("Invalid limit '{raw}'"))
        })
        .transpose()?;
    let txns = db.get_transactions(session.user_id, limit)?;
    if txns.is_empty() {
        println!("No transactions");
        return Ok(());
    }

    println!(
        "{:<5} {:<19} {:>12} {:<16} {:<12} {:<16} Description",
        "ID", "Date", "Amount", "Category", "Account", "Merchant"
    );
    println!("{}", "─".repeat(100));
    for t in &txns {
        let amount = if t.is_expense() { -t.amount } else { t.amount };
        println!(
            "{:<5} {:<19} {:>12} {:<16} {:<12} {:<16} {}",
            t.id.unwrap_or(0),
            t.date.format(DATE_TIME_FORMAT),
            format_amount(amount),
            truncate(&t.category_name, 16),
            truncate(&t.account_name, 12),
            truncate(t.merchant_name.as_deref().unwrap_or(""), 16),
            truncate(t.description.as_deref().unwrap_or(""), 30),
        );
    }
    Ok(())
}

pub(super) fn cli_delete_txn(args: &[String], db: &mut Database, session: &Session) -> Result<()> {
    let id = parse_id(args.first().map(String::as_str), "transaction")?;
    if db.delete_transaction(id, session.user_id)? {
        println!("Deleted transaction {id}");
        Ok(())
    } else {
        anyhow::bail!("Transaction {id} not found")
    }
}

// ── Budgets ──────────────────────────────────────────────────

pub(super) fn cli_budget(args: &[String], db: &Database, session: &Session) -> Result<()> {
    let pos = positionals(args, &[]);
    match pos.as_slice() {
        ["set", category, amount, period] => {
            let period: Period = period.parse()?;
            let amount = parse_amount(amount)?;
            let categories = db.get_categories(session.user_id)?;
            let category = find_category(&categories, category)?;
            if category.kind != TransactionKind::Expense {
                anyhow::bail!("Budgets apply to expense categories; '{}' is income", category.name);
            }
            let category_id = category
                .id
                .ok_or_else(|| anyhow::anyhow!("Category has no ID"))?;
            let budget = Budget::new(session.user_id, category_id, amount, period)?;
            let id = db.upsert_budget(&budget)?;
            info!(id, %period, "budget set");
            println!(
                "Budget for {} in {period} set to {} (ID {id})",
                category.name,
                format_amount(amount)
            );
            Ok(())
        }
        ["delete", id] => {
            let id = parse_id(Some(*id), "budget")?;
            if db.delete_budget(id, session.user_id)? {
                println!("Deleted budget {id}");
                Ok(())
            } else {
                anyhow::bail!("Budget {id} not found")
            }
        }
        _ => anyhow::bail!(
            "Usage: expense-tracker budget set <category> <amount> <YYYY-MM>\n       expense-tracker budget delete <id>"
        ),
    }
}

pub(super) fn cli_budgets(args: &[String], db: &Database, session: &Session) -> Result<()> {
    let period = match args.first() {
        Some(raw) => raw.parse::<Period>()?,
        None => Period::current(),
    };
    let budgets = db.get_budgets_for_period(session.user_id, period)?;
    if budgets.is_empty() {
        println!("No budgets for {period}");
        return Ok(());
    }

    println!("Budgets for {period}");
    println!("{:<4} {:<24} {:<8} {:>12}", "ID", "Category", "Type", "Amount");
    println!("{}", "─".repeat(51));
    for b in &budgets {
        println!(
            "{:<4} {:<24} {:<8} {:>12}",
            b.id.unwrap_or(0),
            truncate(&b.category_name, 24),
            b.category_kind,
            format_amount(b.amount)
        );
    }
    let total: rust_decimal::Decimal = budgets.iter().map(|b| b.amount).sum();
    println!("{:<4} {:<24} {:<8} {:>12}", "", "Total", "", format_amount(total));
    Ok(())
}

// ── Import / export ──────────────────────────────────────────

pub(super) fn cli_import(args: &[String], db: &mut Database, session: &Session) -> Result<()> {
    let pos = positionals(args, &[]);
    let Some(file_path) = pos.first() else {
        anyhow::bail!("Usage: expense-tracker import <file.csv> [--account <name>]");
    };
    let expanded = expand_home(file_path);
    let path = Path::new(&expanded);
    if !path.exists() {
        anyhow::bail!("File not found: {file_path}");
    }

    let account = resolve_account(db, session, flag(args, "--account"))?;
    let summary = crate::import::import_file(db, session, &account, path)?;
    println!("Parsed {} transactions", summary.parsed);
    if summary.new_categories > 0 {
        println!("Created {} new categories", summary.new_categories);
    }
    println!(
        "Imported {} new transactions into '{}' ({} duplicates skipped)",
        summary.imported,
        account.name,
        summary.duplicates()
    );
    Ok(())
}

pub(super) fn cli_export(args: &[String], db: &Database, session: &Session) -> Result<()> {
    let output_path = positionals(args, &[])
        .first()
        .map(|a| expand_home(a))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            format!("{home}/expenses-{}.csv", session.username)
        });

    let count = crate::import::export_file(db, session, Path::new(&output_path))?;
    if count == 0 {
        println!("No transactions to export");
    } else {
        println!("Exported {count} transactions to {output_path}");
    }
    Ok(())
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
