//! Document store port and its SQLite adapter.
//!
//! The store holds schemaless JSON documents grouped into collections and
//! supports single-field equality queries, the subset of a hosted document
//! database the ledger relies on.

mod document_store;

pub use document_store::*;

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use thiserror::Error;

/// SQL migration for the document table
pub const MIGRATION_001_DOCUMENTS: &str = include_str!("migrations/001_documents.sql");

/// SQL migration for local accounts and the persisted session
pub const MIGRATION_002_ACCOUNTS: &str = include_str!("migrations/002_accounts.sql");

/// Field name holding the document id when a document is decoded into a record.
const ID_FIELD: &str = "id";

/// The body of a document.
pub type Fields = Map<String, Value>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("Document store error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// A stored document: its id within the collection plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    /// Decode the document into a record type whose `id` field receives the
    /// document id.
    pub fn into_record<T: DeserializeOwned>(self) -> Result<T, StoreError> {
        let mut fields = self.fields;
        fields.insert(ID_FIELD.to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(fields))
            .map_err(|err| StoreError::Malformed(format!("{}: {}", self.id, err)))
    }
}

/// Encode a record as document fields. The record's `id`, if any, is dropped;
/// it lives in the document key.
pub fn record_fields<T: Serialize>(record: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(record).map_err(|err| StoreError::Malformed(err.to_string()))? {
        Value::Object(mut fields) => {
            fields.remove(ID_FIELD);
            Ok(fields)
        }
        other => Err(StoreError::Malformed(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

/// Operations consumed from a document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a single document.
    async fn get_document(&self, collection: &str, id: &str)
        -> Result<Option<Document>, StoreError>;

    /// Create or overwrite the document with the given id.
    async fn set_document(&self, collection: &str, id: &str, fields: Fields)
        -> Result<(), StoreError>;

    /// Create a document with a store-assigned id and return that id.
    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// All documents in the collection whose `field` equals `value`.
    /// Result order is unspecified.
    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError>;

    /// Remove a document. Fails with `StoreError::NotFound` if it does not exist.
    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}

/// Connect to a SQLite database.
pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    SqlitePool::connect(database_url)
        .await
        .with_context(|| format!("Failed to connect to database {}", database_url))
}

/// Run database migrations.
pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(MIGRATION_001_DOCUMENTS)
        .execute(pool)
        .await
        .context("Failed to run migration 001")?;

    sqlx::query(MIGRATION_002_ACCOUNTS)
        .execute(pool)
        .await
        .context("Failed to run migration 002")?;

    tracing::debug!("migrations applied");
    Ok(())
}
