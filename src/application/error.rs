use thiserror::Error;

use crate::domain::{BalanceOverflow, ValidationError};
use crate::identity::AuthError;
use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error(transparent)]
    Balance(#[from] BalanceOverflow),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
