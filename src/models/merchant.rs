#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merchant {
    pub id: Option<i64>,
    pub user_id: i64,
    pub name: String,
}
