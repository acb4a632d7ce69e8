use serde::Serialize;
use thiserror::Error;

use super::{Cents, Transaction, TransactionType};

/// A total that does not fit in [`Cents`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Balance is too large to represent")]
pub struct BalanceOverflow;

/// Compute the balance of a list of transactions.
/// Balance = sum of income amounts - sum of expense amounts
pub fn compute_balance(transactions: &[Transaction]) -> Result<Cents, BalanceOverflow> {
    let total: i128 = transactions.iter().map(Transaction::signed_amount).sum();
    Cents::try_from(total).map_err(|_| BalanceOverflow)
}

/// Sort transactions newest first. The sort is stable, so re-sorting an
/// already sorted slice leaves it unchanged.
pub fn sort_by_recency(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn total_of(transactions: &[Transaction], kind: TransactionType) -> Result<Cents, BalanceOverflow> {
    transactions
        .iter()
        .filter(|t| t.kind == kind)
        .try_fold(0, |total: Cents, t| total.checked_add(t.amount_cents))
        .ok_or(BalanceOverflow)
}

/// A user's transactions, newest first, with derived totals.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Ledger {
    pub transactions: Vec<Transaction>,
    pub income_total: Cents,
    pub expense_total: Cents,
    pub balance: Cents,
}

impl Ledger {
    pub fn new(mut transactions: Vec<Transaction>) -> Result<Self, BalanceOverflow> {
        sort_by_recency(&mut transactions);
        let income_total = total_of(&transactions, TransactionType::Income)?;
        let expense_total = total_of(&transactions, TransactionType::Expense)?;
        Ok(Self {
            balance: compute_balance(&transactions)?,
            transactions,
            income_total,
            expense_total,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// True while income covers expenses.
    pub fn is_solvent(&self) -> bool {
        self.balance >= 0
    }
}
