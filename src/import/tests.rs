#![allow(clippy::unwrap_used)]

use super::*;
use crate::models::{AccountKind, Role, TransactionKind, User};
use rust_decimal_macros::dec;

fn setup() -> (Database, Session, Account) {
    let mut db = Database::open_in_memory().unwrap();
    db.insert_user(&User::new("alice".into(), Role::User))
        .unwrap();
    let session = Session::login(&db, "alice").unwrap();
    let id = db
        .insert_account(&Account::new(
            session.user_id,
            "Checking".into(),
            AccountKind::Bank,
        ))
        .unwrap();
    let account = db.get_account_by_id(id).unwrap().unwrap();
    (db, session, account)
}

const SAMPLE: &str = "date,kind,amount,category,merchant,description\n\
                      2024-01-15,expense,4.50,Groceries,Market,\n\
                      2024-01-16,expense,30,Pets,Vet,checkup\n\
                      2024-01-31,income,2500,Salary,,\n\
                      2024-02-01,,-9.99,,,\n";

#[test]
fn test_import_resolves_and_creates_categories() {
    let (mut db, session, account) = setup();
    let records = CsvImporter::read(SAMPLE.as_bytes()).unwrap();
    let summary = import_records(&mut db, &session, &account, &records).unwrap();

    assert_eq!(summary.parsed, 4);
    assert_eq!(summary.imported, 4);
    assert_eq!(summary.duplicates(), 0);
    // Only "Pets" is new; blank category goes to the fallback
    assert_eq!(summary.new_categories, 1);

    let txns = db.get_transactions(session.user_id, None).unwrap();
    assert_eq!(txns.len(), 4);
    assert!(txns
        .iter()
        .any(|t| t.category_name == fallback_category(TransactionKind::Expense) && t.amount == dec!(9.99)));
    assert!(txns
        .iter()
        .any(|t| t.merchant_name.as_deref() == Some("Vet")));

    let balance = db.get_account_by_id(account.id.unwrap()).unwrap().unwrap().balance;
    assert_eq!(balance, dec!(2455.51));
}

#[test]
fn test_reimport_skips_duplicates() {
    let (mut db, session, account) = setup();
    let records = CsvImporter::read(SAMPLE.as_bytes()).unwrap();
    import_records(&mut db, &session, &account, &records).unwrap();

    let again = import_records(&mut db, &session, &account, &records).unwrap();
    assert_eq!(again.imported, 0);
    assert_eq!(again.duplicates(), 4);
    assert_eq!(again.new_categories, 0);
    assert_eq!(db.get_transactions(session.user_id, None).unwrap().len(), 4);
}

#[test]
fn test_export_then_import_into_fresh_user() {
    let (mut db, session, account) = setup();
    import_file_from_str(&mut db, &session, &account, SAMPLE);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.csv");
    assert_eq!(export_file(&db, &session, &path).unwrap(), 4);

    db.insert_user(&User::new("bob".into(), Role::User)).unwrap();
    let bob = Session::login(&db, "bob").unwrap();
    let id = db
        .insert_account(&Account::new(bob.user_id, "Wallet".into(), AccountKind::Cash))
        .unwrap();
    let wallet = db.get_account_by_id(id).unwrap().unwrap();

    let summary = import_file(&mut db, &bob, &wallet, &path).unwrap();
    assert_eq!(summary.imported, 4);

    let mut mine: Vec<_> = db
        .get_transactions(session.user_id, None)
        .unwrap()
        .into_iter()
        .map(|t| (t.date, t.kind, t.amount, t.category_name))
        .collect();
    let mut theirs: Vec<_> = db
        .get_transactions(bob.user_id, None)
        .unwrap()
        .into_iter()
        .map(|t| (t.date, t.kind, t.amount, t.category_name))
        .collect();
    mine.sort_by_key(|row| row.0);
    theirs.sort_by_key(|row| row.0);
    assert_eq!(mine, theirs);
}

#[test]
fn test_import_redirects_rows_of_the_other_kind() {
    let (mut db, session, account) = setup();
    let csv = "date,kind,amount,category\n\
               2024-03-01,income,50,Groceries\n\
               2024-03-02,income,20,\n\
               2024-03-03,expense,15,Salary\n";
    let records = CsvImporter::read(csv.as_bytes()).unwrap();
    let summary = import_records(&mut db, &session, &account, &records).unwrap();
    assert_eq!(summary.imported, 3);
    assert_eq!(summary.new_categories, 1);

    let cats = db.get_categories(session.user_id).unwrap();
    let income_fallback = Category::find_by_name(&cats, "Uncategorized Income").unwrap();
    assert_eq!(income_fallback.kind, TransactionKind::Income);

    let txns = db.get_transactions(session.user_id, None).unwrap();
    for t in &txns {
        let cat = Category::find_by_name(&cats, &t.category_name).unwrap();
        assert_eq!(cat.kind, t.kind, "{} filed under {}", t.amount, t.category_name);
    }
    let balance = db.get_account_by_id(account.id.unwrap()).unwrap().unwrap().balance;
    assert_eq!(balance, dec!(55));
}

#[test]
fn test_import_fails_when_fallback_has_the_other_kind() {
    let (mut db, session, account) = setup();
    db.insert_category(&Category::new(
        session.user_id,
        "Uncategorized Income".into(),
        TransactionKind::Expense,
    ))
    .unwrap();
    let records = CsvImporter::read("date,kind,amount\n2024-03-02,income,20\n".as_bytes()).unwrap();
    let err = import_records(&mut db, &session, &account, &records).unwrap_err();
    assert!(err.to_string().contains("cannot hold income rows"));
    assert!(db.get_transactions(session.user_id, None).unwrap().is_empty());
}

#[test]
fn test_export_nothing_writes_no_file() {
    let (db, session, _) = setup();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("export.csv");
    assert_eq!(export_file(&db, &session, &path).unwrap(), 0);
    assert!(!path.exists());
}

fn import_file_from_str(db: &mut Database, session: &Session, account: &Account, csv: &str) {
    let records = CsvImporter::read(csv.as_bytes()).unwrap();
    import_records(db, session, account, &records).unwrap();
}
