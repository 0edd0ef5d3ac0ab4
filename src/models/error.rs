use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("unknown kind '{0}' (expected 'income' or 'expense')")]
    UnknownKind(String),

    #[error("unknown account type '{0}' (expected cash, bank or credit)")]
    UnknownAccountKind(String),

    #[error("month must be between 1 and 12, got {0}")]
    MonthOutOfRange(u32),

    #[error("invalid period '{0}' (expected YYYY-MM)")]
    InvalidPeriod(String),
}
