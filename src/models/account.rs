use rust_decimal::Decimal;

use super::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    Cash,
    Bank,
    CreditCard,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Bank => "bank",
            Self::CreditCard => "credit_card",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Cash => "Cash",
            Self::Bank => "Bank",
            Self::CreditCard => "Credit Card",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ModelError> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "bank" | "checking" | "savings" => Ok(Self::Bank),
            "credit" | "credit card" | "creditcard" | "credit_card" => Ok(Self::CreditCard),
            other => Err(ModelError::UnknownAccountKind(other.to_string())),
        }
    }

    pub fn all() -> &'static [AccountKind] {
        &[Self::Cash, Self::Bank, Self::CreditCard]
    }

    pub fn is_credit(&self) -> bool {
        matches!(self, Self::CreditCard)
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.label())
    }
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: Option<i64>,
    pub user_id: i64,
    pub name: String,
    pub kind: AccountKind,
    pub balance: Decimal,
    pub created_at: String,
}

impl Account {
    pub fn new(user_id: i64, name: String, kind: AccountKind) -> Self {
        Self {
            id: None,
            user_id,
            name,
            kind,
            balance: Decimal::ZERO,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Find an account by name (case-insensitive) in a slice.
    pub fn find_by_name<'a>(accounts: &'a [Account], name: &str) -> Option<&'a Account> {
        let lower = name.to_lowercase();
        accounts.iter().find(|a| a.name.to_lowercase() == lower)
    }
}
