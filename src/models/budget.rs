use rust_decimal::Decimal;

use super::{ModelError, Period, TransactionKind};

#[derive(Debug, Clone, PartialEq)]
pub struct Budget {
    pub id: Option<i64>,
    pub user_id: i64,
    pub category_id: i64,
    pub category_name: String,
    /// Kind of the budgeted category, filled from the join on load.
    pub category_kind: TransactionKind,
    pub amount: Decimal,
    pub period: Period,
}

impl Budget {
    pub fn new(
        user_id: i64,
        category_id: i64,
        amount: Decimal,
        period: Period,
    ) -> Result<Self, ModelError> {
        if amount <= Decimal::ZERO {
            return Err(ModelError::NonPositiveAmount(amount));
        }
        Ok(Self {
            id: None,
            user_id,
            category_id,
            category_name: String::new(),
            category_kind: TransactionKind::Expense,
            amount,
            period,
        })
    }
}
