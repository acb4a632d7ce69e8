use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::required;
use super::{parse_cents, Cents, UserId, ValidationError};

/// Identifier assigned by the document store when the transaction is added.
pub type TransactionId = String;

/// Largest amount a single transaction may carry: 100 billion in cents.
pub const MAX_AMOUNT_CENTS: Cents = 100_000_000_000 * 100;

/// Name of the document collection holding transactions.
pub const TRANSACTIONS_COLLECTION: &str = "transactions";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money coming in; adds to the balance
    #[default]
    Income,
    /// Money going out; subtracts from the balance
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }

    /// Sign applied to the amount when computing a balance.
    pub fn signum(&self) -> Cents {
        match self {
            TransactionType::Income => 1,
            TransactionType::Expense => -1,
        }
    }
}

impl FromStr for TransactionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            _ => Err(ValidationError::InvalidType(s.to_string())),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recorded income or expense. Created and deleted, never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    /// Owner of the transaction
    pub user_id: UserId,
    pub description: String,
    /// Amount in cents (never negative; the sign comes from `kind`)
    pub amount_cents: Cents,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Amount with the sign implied by the transaction type. Widened so
    /// that any stored amount can be negated.
    pub fn signed_amount(&self) -> i128 {
        i128::from(self.kind.signum()) * i128::from(self.amount_cents)
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionType::Income
    }
}

/// A validated transaction that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub description: String,
    pub amount_cents: Cents,
    pub kind: TransactionType,
}

impl NewTransaction {
    /// Validate raw user input: the description and amount must be present and
    /// the amount must be a non-negative decimal number no larger than
    /// [`MAX_AMOUNT_CENTS`].
    pub fn parse(
        description: &str,
        amount: &str,
        kind: TransactionType,
    ) -> Result<Self, ValidationError> {
        let description = required("description", description)?;
        let amount = required("amount", amount)?;

        let amount_cents =
            parse_cents(amount).map_err(|_| ValidationError::InvalidAmount(amount.to_string()))?;
        if amount_cents < 0 {
            return Err(ValidationError::NegativeAmount);
        }
        if amount_cents > MAX_AMOUNT_CENTS {
            return Err(ValidationError::AmountTooLarge);
        }

        Ok(Self {
            description: description.to_string(),
            amount_cents,
            kind,
        })
    }

    /// Attach ownership and a creation timestamp. The id is left empty until
    /// the document store assigns one.
    pub fn into_transaction(self, user_id: UserId, created_at: DateTime<Utc>) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            user_id,
            description: self.description,
            amount_cents: self.amount_cents,
            kind: self.kind,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_parsing() {
        assert_eq!(
            "income".parse::<TransactionType>(),
            Ok(TransactionType::Income)
        );
        assert_eq!(
            "Expense".parse::<TransactionType>(),
            Ok(TransactionType::Expense)
        );
        assert_eq!(
            "transfer".parse::<TransactionType>(),
            Err(ValidationError::InvalidType("transfer".into()))
        );
    }

    #[test]
    fn test_new_transaction_parse() {
        let new = NewTransaction::parse(" Salary ", "1500.00", TransactionType::Income).unwrap();
        assert_eq!(new.description, "Salary");
        assert_eq!(new.amount_cents, 150000);
        assert_eq!(new.kind, TransactionType::Income);
    }

    #[test]
    fn test_new_transaction_allows_zero() {
        let new = NewTransaction::parse("Free sample", "0", TransactionType::Expense).unwrap();
        assert_eq!(new.amount_cents, 0);
    }

    #[test]
    fn test_new_transaction_rejects_missing_fields() {
        assert_eq!(
            NewTransaction::parse("", "10", TransactionType::Income),
            Err(ValidationError::MissingField("description"))
        );
        assert_eq!(
            NewTransaction::parse("Coffee", "  ", TransactionType::Expense),
            Err(ValidationError::MissingField("amount"))
        );
    }

    #[test]
    fn test_new_transaction_rejects_bad_amounts() {
        assert_eq!(
            NewTransaction::parse("Coffee", "three", TransactionType::Expense),
            Err(ValidationError::InvalidAmount("three".into()))
        );
        assert_eq!(
            NewTransaction::parse("Coffee", "-3.50", TransactionType::Expense),
            Err(ValidationError::NegativeAmount)
        );
    }

    #[test]
    fn test_new_transaction_amount_limit() {
        let at_limit =
            NewTransaction::parse("Lottery", "100000000000.00", TransactionType::Income).unwrap();
        assert_eq!(at_limit.amount_cents, MAX_AMOUNT_CENTS);

        assert_eq!(
            NewTransaction::parse("Lottery", "100000000000.01", TransactionType::Income),
            Err(ValidationError::AmountTooLarge)
        );
        assert_eq!(
            NewTransaction::parse("Lottery", "92233720368547758", TransactionType::Income),
            Err(ValidationError::AmountTooLarge)
        );
    }

    #[test]
    fn test_signed_amount() {
        let now = Utc::now();
        let income = NewTransaction::parse("Pay", "100", TransactionType::Income)
            .unwrap()
            .into_transaction("u".into(), now);
        let expense = NewTransaction::parse("Food", "40", TransactionType::Expense)
            .unwrap()
            .into_transaction("u".into(), now);

        assert_eq!(income.signed_amount(), 10000);
        assert_eq!(expense.signed_amount(), -4000);
    }

    #[test]
    fn test_document_field_names() {
        let tx = NewTransaction::parse("Pay", "1", TransactionType::Income)
            .unwrap()
            .into_transaction("uid-7".into(), Utc::now());
        let value = serde_json::to_value(&tx).unwrap();

        assert_eq!(value["userId"], "uid-7");
        assert_eq!(value["amountCents"], 100);
        assert_eq!(value["type"], "income");
        assert!(value["createdAt"].is_string());
    }
}
