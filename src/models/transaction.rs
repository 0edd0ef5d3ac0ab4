use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::ModelError;

/// Storage and display format for transaction timestamps.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Direction of a transaction. Categories carry the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ModelError> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(ModelError::UnknownKind(other.to_string())),
        }
    }

    pub fn all() -> &'static [TransactionKind] {
        &[Self::Income, Self::Expense]
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A posted transaction, with the category/account/merchant names attached
/// by the repository for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: Option<i64>,
    pub user_id: i64,
    pub account_id: i64,
    pub category_id: i64,
    pub merchant_id: Option<i64>,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub date: NaiveDateTime,
    pub description: Option<String>,
    pub category_name: String,
    pub account_name: String,
    pub merchant_name: Option<String>,
}

impl Transaction {
    pub fn new(
        user_id: i64,
        account_id: i64,
        category_id: i64,
        amount: Decimal,
        kind: TransactionKind,
        date: NaiveDateTime,
    ) -> Result<Self, ModelError> {
        if amount <= Decimal::ZERO {
            return Err(ModelError::NonPositiveAmount(amount));
        }
        Ok(Self {
            id: None,
            user_id,
            account_id,
            category_id,
            merchant_id: None,
            amount,
            kind,
            date,
            description: None,
            category_name: String::new(),
            account_name: String::new(),
            merchant_name: None,
        })
    }

    pub fn with_merchant(mut self, merchant_id: i64, name: impl Into<String>) -> Self {
        self.merchant_id = Some(merchant_id);
        self.merchant_name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = (!description.trim().is_empty()).then_some(description);
        self
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionKind::Income
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionKind::Expense
    }

    /// Effect on the owning account's balance: income adds, expense subtracts.
    pub fn balance_effect(&self) -> Decimal {
        match self.kind {
            TransactionKind::Income => self.amount,
            TransactionKind::Expense => -self.amount,
        }
    }
}
