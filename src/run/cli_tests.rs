#![allow(clippy::unwrap_used)]

use super::*;
use rust_decimal_macros::dec;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn setup() -> (Database, Session) {
    let mut db = Database::open_in_memory().unwrap();
    cli_user(&args(&["add", "alice"]), &mut db, None).unwrap();
    let session = Session::login(&db, "alice").unwrap();
    cli_account(&args(&["add", "Checking", "bank"]), &db, &session).unwrap();
    (db, session)
}

// ── Argument helpers ──────────────────────────────────────────

#[test]
fn test_flag_lookup() {
    let a = args(&["expense", "12", "Groceries", "--account", "Checking"]);
    assert_eq!(flag(&a, "--account"), Some("Checking"));
    assert_eq!(flag(&a, "--merchant"), None);
}

#[test]
fn test_positionals_skip_flag_values() {
    let a = args(&["expense", "--merchant", "Cafe", "4.50", "--admin", "Food"]);
    assert_eq!(
        positionals(&a, &["--admin"]),
        vec!["expense", "4.50", "Food"]
    );
}

#[test]
fn test_parse_when() {
    let dt = parse_when("2025-03-10 14:30:00").unwrap();
    assert_eq!(dt.format(DATE_TIME_FORMAT).to_string(), "2025-03-10 14:30:00");
    let d = parse_when("2025-03-10").unwrap();
    assert_eq!(d.format(DATE_TIME_FORMAT).to_string(), "2025-03-10 00:00:00");
    assert!(parse_when("10/03/2025").is_err());
}

#[test]
fn test_parse_amount_rejects_non_positive() {
    assert_eq!(parse_amount("$1,200.50").unwrap(), dec!(1200.50));
    assert!(parse_amount("0").is_err());
    assert!(parse_amount("-3").is_err());
}

// ── Users ─────────────────────────────────────────────────────

#[test]
fn test_first_user_may_be_admin() {
    let mut db = Database::open_in_memory().unwrap();
    cli_user(&args(&["add", "root", "--admin"]), &mut db, None).unwrap();
    assert!(db.get_user_by_name("root").unwrap().unwrap().is_admin());
}

#[test]
fn test_only_admin_creates_admin() {
    let mut db = Database::open_in_memory().unwrap();
    cli_user(&args(&["add", "root", "--admin"]), &mut db, None).unwrap();
    cli_user(&args(&["add", "alice"]), &mut db, None).unwrap();

    assert!(cli_user(&args(&["add", "mallory", "--admin"]), &mut db, Some("alice")).is_err());
    assert!(cli_user(&args(&["add", "mallory", "--admin"]), &mut db, None).is_err());
    cli_user(&args(&["add", "carol", "--admin"]), &mut db, Some("root")).unwrap();
    assert!(db.get_user_by_name("carol").unwrap().unwrap().is_admin());
}

#[test]
fn test_user_usage_error() {
    let mut db = Database::open_in_memory().unwrap();
    assert!(cli_user(&args(&["remove", "alice"]), &mut db, None).is_err());
}

// ── Accounts & categories ─────────────────────────────────────

#[test]
fn test_account_add_unknown_type() {
    let (db, session) = setup();
    let err = cli_account(&args(&["add", "Stash", "crypto"]), &db, &session).unwrap_err();
    assert!(err.to_string().contains("Credit Card"));
}

#[test]
fn test_category_add_with_parent_and_delete() {
    let (db, session) = setup();
    let cats = db.get_categories(session.user_id).unwrap();
    let parent = Category::find_by_name(&cats, "Food & Dining")
        .unwrap()
        .id
        .unwrap();
    let parent_arg = parent.to_string();
    cli_category(
        &args(&["add", "Coffee", "expense", "--parent", parent_arg.as_str()]),
        &db,
        &session,
    )
    .unwrap();

    let cats = db.get_categories(session.user_id).unwrap();
    let coffee = Category::find_by_name(&cats, "Coffee").unwrap();
    assert_eq!(coffee.parent_id, Some(parent));

    let id = coffee.id.unwrap().to_string();
    cli_category(&args(&["delete", id.as_str()]), &db, &session).unwrap();
    assert!(cli_category(&args(&["delete", id.as_str()]), &db, &session).is_err());
}

#[test]
fn test_category_add_missing_parent() {
    let (db, session) = setup();
    let result = cli_category(
        &args(&["add", "Coffee", "expense", "--parent", "9999"]),
        &db,
        &session,
    );
    assert!(result.is_err());
}

// ── Transactions ──────────────────────────────────────────────

#[test]
fn test_add_uses_only_account_and_creates_merchant() {
    let (mut db, session) = setup();
    cli_add(
        &args(&[
            "expense",
            "12.50",
            "groceries",
            "--merchant",
            "Market",
            "--date",
            "2025-03-10",
            "--desc",
            "weekly shop",
        ]),
        &mut db,
        &session,
    )
    .unwrap();

    let txns = db.get_transactions(session.user_id, None).unwrap();
    assert_eq!(txns.len(), 1);
    assert_eq!(txns[0].amount, dec!(12.50));
    assert_eq!(txns[0].category_name, "Groceries");
    assert_eq!(txns[0].merchant_name.as_deref(), Some("Market"));
    assert_eq!(txns[0].description.as_deref(), Some("weekly shop"));

    let accounts = db.get_accounts(session.user_id).unwrap();
    assert_eq!(accounts[0].balance, dec!(-12.50));
}

#[test]
fn test_add_requires_account_when_ambiguous() {
    let (mut db, session) = setup();
    cli_account(&args(&["add", "Wallet", "cash"]), &db, &session).unwrap();

    let a = args(&["expense", "5", "Groceries"]);
    let err = cli_add(&a, &mut db, &session).unwrap_err();
    assert!(err.to_string().contains("Multiple accounts"));

    let a = args(&["expense", "5", "Groceries", "--account", "wallet"]);
    cli_add(&a, &mut db, &session).unwrap();
    let txns = db.get_transactions(session.user_id, None).unwrap();
    assert_eq!(txns[0].account_name, "Wallet");
}

#[test]
fn test_add_rejects_kind_mismatch_and_unknown_category() {
    let (mut db, session) = setup();
    assert!(cli_add(&args(&["expense", "5", "Salary"]), &mut db, &session).is_err());
    let err = cli_add(&args(&["expense", "5", "Yachts"]), &mut db, &session).unwrap_err();
    assert!(err.to_string().contains("not found"));
    assert!(cli_add(&args(&["gift", "5", "Groceries"]), &mut db, &session).is_err());
    assert!(db.get_transactions(session.user_id, None).unwrap().is_empty());
}

#[test]
fn test_delete_txn() {
    let (mut db, session) = setup();
    cli_add(&args(&["income", "100", "Salary"]), &mut db, &session).unwrap();
    let id = db.get_transactions(session.user_id, None).unwrap()[0]
        .id
        .unwrap()
        .to_string();

    cli_delete_txn(&args(&[id.as_str()]), &mut db, &session).unwrap();
    assert!(cli_delete_txn(&args(&[id.as_str()]), &mut db, &session).is_err());
    assert_eq!(
        db.get_accounts(session.user_id).unwrap()[0].balance,
        dec!(0)
    );
}

#[test]
fn test_txns_rejects_bad_limit() {
    let (db, session) = setup();
    assert!(cli_txns(&args(&["--limit", "ten"]), &db, &session).is_err());
    cli_txns(&args(&["--limit", "10"]), &db, &session).unwrap();
}

// ── Budgets ───────────────────────────────────────────────────

#[test]
fn test_budget_set_and_delete() {
    let (db, session) = setup();
    cli_budget(&args(&["set", "Groceries", "300", "2025-03"]), &db, &session).unwrap();
    cli_budget(&args(&["set", "groceries", "350", "2025-03"]), &db, &session).unwrap();

    let period: Period = "2025-03".parse().unwrap();
    let budgets = db.get_budgets_for_period(session.user_id, period).unwrap();
    assert_eq!(budgets.len(), 1);
    assert_eq!(budgets[0].amount, dec!(350));

    let id = budgets[0].id.unwrap().to_string();
    cli_budget(&args(&["delete", id.as_str()]), &db, &session).unwrap();
    assert!(db
        .get_budgets_for_period(session.user_id, period)
        .unwrap()
        .is_empty());
}

#[test]
fn test_budget_rejects_bad_input() {
    let (db, session) = setup();
    assert!(cli_budget(&args(&["set", "Groceries", "300", "2025-13"]), &db, &session).is_err());
    assert!(cli_budget(&args(&["set", "Groceries", "0", "2025-03"]), &db, &session).is_err());
    assert!(cli_budget(&args(&["set", "Salary", "10", "2025-03"]), &db, &session).is_err());
    assert!(cli_budgets(&args(&["March"]), &db, &session).is_err());
}

// ── Import / export ───────────────────────────────────────────

#[test]
fn test_import_missing_file() {
    let (mut db, session) = setup();
    let err = cli_import(&args(&["/no/such/file.csv"]), &mut db, &session).unwrap_err();
    assert!(err.to_string().contains("File not found"));
}

#[test]
fn test_import_then_export() {
    let (mut db, session) = setup();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.csv");
    std::fs::write(&input, "date,amount,category\n2025-01-02,-20,Groceries\n").unwrap();

    let input_arg = input.to_string_lossy().into_owned();
    cli_import(&args(&[input_arg.as_str()]), &mut db, &session).unwrap();
    assert_eq!(db.get_transactions(session.user_id, None).unwrap().len(), 1);

    let output = dir.path().join("out.csv");
    let output_arg = output.to_string_lossy().into_owned();
    cli_export(&args(&[output_arg.as_str()]), &db, &session).unwrap();
    let text = std::fs::read_to_string(output).unwrap();
    assert!(text.contains("2025-01-02 00:00:00,expense,20,Groceries,Checking"));
}
