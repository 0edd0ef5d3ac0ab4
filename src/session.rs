use anyhow::Result;

use crate::db::Database;
use crate::models::{Role, User};

/// The user every command acts on behalf of. Built once per invocation and
/// passed down explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Session {
    pub(crate) user_id: i64,
    pub(crate) username: String,
    pub(crate) role: Role,
}

impl Session {
    /// Look the user up by name (case-insensitive).
    pub(crate) fn login(db: &Database, username: &str) -> Result<Self> {
        let user = db.get_user_by_name(username.trim())?.ok_or_else(|| {
            anyhow::anyhow!("Unknown user '{username}'. Create one with: expense-tracker user add <name>")
        })?;
        Self::from_user(&user)
    }

    pub(crate) fn from_user(user: &User) -> Result<Self> {
        let user_id = user
            .id
            .ok_or_else(|| anyhow::anyhow!("User '{}' has no ID", user.username))?;
        Ok(Self {
            user_id,
            username: user.username.clone(),
            role: user.role,
        })
    }

    pub(crate) fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
