mod account;
mod budget;
mod category;
mod error;
mod merchant;
mod period;
mod transaction;
mod user;

pub use account::{Account, AccountKind};
pub use budget::Budget;
pub use category::Category;
pub use error::ModelError;
pub use merchant::Merchant;
pub use period::Period;
pub use transaction::{Transaction, TransactionKind, DATE_TIME_FORMAT};
pub use user::{Role, User};
