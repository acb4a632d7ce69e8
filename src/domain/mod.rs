mod ledger;
mod money;
mod transaction;
mod user;
mod validation;

pub use ledger::*;
pub use money::*;
pub use transaction::*;
pub use user::*;
pub use validation::*;
