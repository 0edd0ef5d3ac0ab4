use super::TransactionKind;

#[derive(Debug, Clone)]
pub struct Category {
    pub id: Option<i64>,
    pub user_id: i64,
    pub name: String,
    pub kind: TransactionKind,
    pub parent_id: Option<i64>,
}

impl Category {
    pub fn new(user_id: i64, name: String, kind: TransactionKind) -> Self {
        Self {
            id: None,
            user_id,
            name,
            kind,
            parent_id: None,
        }
    }

    /// Find a category by name (case-insensitive) in a slice.
    pub fn find_by_name<'a>(categories: &'a [Category], name: &str) -> Option<&'a Category> {
        let lower = name.to_lowercase();
        categories.iter().find(|c| c.name.to_lowercase() == lower)
    }

    /// Find a category by ID in a slice.
    pub fn find_by_id(categories: &[Category], id: i64) -> Option<&Category> {
        categories.iter().find(|c| c.id == Some(id))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.name)
    }
}
