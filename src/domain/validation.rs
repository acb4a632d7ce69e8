use thiserror::Error;

use super::{format_cents, MAX_AMOUNT_CENTS};

/// Input rejected locally, before anything is sent to the identity provider
/// or the document store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill in the {0} field.")]
    MissingField(&'static str),

    #[error("Invalid amount '{0}': expected a number such as 12.50")]
    InvalidAmount(String),

    #[error("Amount must not be negative")]
    NegativeAmount,

    #[error("Amount must not exceed {}", format_cents(MAX_AMOUNT_CENTS))]
    AmountTooLarge,

    #[error("Invalid transaction type '{0}': expected income or expense")]
    InvalidType(String),

    #[error("Passwords do not match")]
    PasswordMismatch,
}

/// Return the trimmed value, or `MissingField` when nothing is left.
pub(crate) fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(value)
    }
}
