use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{format_cents, Cents, Transaction, User};

/// A user's full history for JSON export
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub profile: Option<User>,
    pub balance_cents: Cents,
    pub transactions: Vec<Transaction>,
}

/// Exporter for converting a user's ledger to various formats
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export a user's transactions to CSV, newest first
    pub async fn export_history_csv<W: Write>(&self, user_id: &str, writer: W) -> Result<usize> {
        let transactions = self.service.list_transactions(user_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "created_at",
            "type",
            "description",
            "amount",
            "amount_cents",
        ])?;

        for transaction in &transactions {
            csv_writer.write_record([
                transaction.id.clone(),
                transaction.created_at.to_rfc3339(),
                transaction.kind.to_string(),
                transaction.description.clone(),
                format_cents(transaction.amount_cents),
                transaction.amount_cents.to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(transactions.len())
    }

    /// Export a user's profile, balance and transactions as a JSON snapshot
    pub async fn export_history_json<W: Write>(
        &self,
        user_id: &str,
        mut writer: W,
    ) -> Result<HistorySnapshot> {
        let profile = self.service.profile(user_id).await?;
        let ledger = self.service.ledger(user_id).await?;

        let snapshot = HistorySnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            profile,
            balance_cents: ledger.balance,
            transactions: ledger.transactions,
        };

        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writeln!(writer)?;
        writer.flush()?;

        Ok(snapshot)
    }
}
