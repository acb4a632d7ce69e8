use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{Document, DocumentStore, Fields, StoreError};

/// Document store backed by a single SQLite table, with fields kept as JSON text.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Create a new store with the given SQLite connection pool.
    /// The pool must already be migrated.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<Document, StoreError> {
        let id: String = row.get("id");
        let fields_json: String = row.get("fields");
        let fields: Fields = serde_json::from_str(&fields_json)
            .map_err(|err| StoreError::Malformed(format!("{}: {}", id, err)))?;
        Ok(Document { id, fields })
    }

    /// JSON path addressing a top-level field. Quoting allows any key except
    /// ones containing a double quote.
    fn field_path(field: &str) -> Result<String, StoreError> {
        if field.is_empty() || field.contains('"') {
            return Err(StoreError::Malformed(format!(
                "invalid field name '{}'",
                field
            )));
        }
        Ok(format!("$.\"{}\"", field))
    }

    fn encode(fields: &Fields) -> Result<String, StoreError> {
        serde_json::to_string(fields).map_err(|err| StoreError::Malformed(err.to_string()))
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query("SELECT id, fields FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch document")?;

        tracing::debug!(collection, id, found = row.is_some(), "get document");
        row.as_ref().map(Self::row_to_document).transpose()
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        let fields_json = Self::encode(&fields)?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, fields, written_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (collection, id) DO UPDATE SET
                fields = excluded.fields,
                written_at = excluded.written_at
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(&fields_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to set document")?;

        tracing::debug!(collection, id, "set document");
        Ok(())
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        let fields_json = Self::encode(&fields)?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, fields, written_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(collection)
        .bind(&id)
        .bind(&fields_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to add document")?;

        tracing::debug!(collection, id = %id, "add document");
        Ok(id)
    }

    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        let path = Self::field_path(field)?;
        let value_json =
            serde_json::to_string(value).map_err(|err| StoreError::Malformed(err.to_string()))?;

        // json_extract on both sides compares with SQLite's JSON typing, so
        // strings match strings and numbers match numbers.
        let rows = sqlx::query(
            r#"
            SELECT id, fields
            FROM documents
            WHERE collection = ?
              AND json_extract(fields, ?) = json_extract(?, '$')
            "#,
        )
        .bind(collection)
        .bind(&path)
        .bind(&value_json)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query documents")?;

        tracing::debug!(collection, field, matches = rows.len(), "query documents");
        rows.iter().map(Self::row_to_document).collect()
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete document")?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        tracing::debug!(collection, id, "delete document");
        Ok(())
    }
}
