pub mod keys;
mod schema;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use thiserror::Error;

pub use schema::SCHEMA_VERSION;

/// Collection-oriented JSON document store on top of SQLite.
///
/// Every document lives in one `documents` table addressed by
/// `(collection, id)`. Counter fields are bumped with a single
/// `INSERT .. ON CONFLICT DO UPDATE` statement so concurrent increments on
/// the same document never lose writes; every other field is last-write-wins.
#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
}

impl DocumentStore {
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", path.display());
        let options = SqliteConnectOptions::from_str(&db_url)
            .map_err(|e| StoreError::Config(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// A private store that lives as long as the returned handle.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::Config(e.to_string()))?;

        // One pinned connection: each new in-memory connection is a new database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        schema::bootstrap(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<T>, StoreError> {
        let raw: Option<String> = sqlx::query_scalar(
            r#"SELECT "data" FROM "documents" WHERE "collection" = ? AND "id" = ?"#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        raw.map(|data| decode(collection, id, &data)).transpose()
    }

    /// Replaces the whole document.
    pub async fn set<T: Serialize>(
        &self,
        collection: &str,
        id: &str,
        document: &T,
    ) -> Result<(), StoreError> {
        let data = serde_json::to_string(document).map_err(StoreError::Encode)?;
        let now = now_iso();

        sqlx::query(
            r#"
            INSERT INTO "documents" ("collection", "id", "data", "createdAt", "updatedAt")
            VALUES (?, ?, json(?), ?, ?)
            ON CONFLICT ("collection", "id")
            DO UPDATE SET "data" = excluded."data", "updatedAt" = excluded."updatedAt"
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(data)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Merge-patches top-level fields into a document, creating it when absent.
    /// A `null` field removes the key.
    pub async fn merge(&self, collection: &str, id: &str, fields: Value) -> Result<(), StoreError> {
        if !fields.is_object() {
            return Err(StoreError::NotAnObject);
        }
        let data = fields.to_string();
        let now = now_iso();

        sqlx::query(
            r#"
            INSERT INTO "documents" ("collection", "id", "data", "createdAt", "updatedAt")
            VALUES (?, ?, json_patch('{}', ?), ?, ?)
            ON CONFLICT ("collection", "id")
            DO UPDATE SET "data" = json_patch("data", excluded."data"), "updatedAt" = excluded."updatedAt"
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(data)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Atomically adds `delta` to each numeric field. When the document does
    /// not exist it is created from `seed` with the deltas applied.
    pub async fn increment(
        &self,
        collection: &str,
        id: &str,
        seed: Value,
        deltas: &[(&str, i64)],
    ) -> Result<(), StoreError> {
        let Value::Object(mut initial) = seed else {
            return Err(StoreError::NotAnObject);
        };
        if deltas.is_empty() {
            return Ok(());
        }
        for (field, delta) in deltas {
            let base = initial.get(*field).and_then(Value::as_i64).unwrap_or(0);
            initial.insert((*field).to_string(), Value::from(base.saturating_add(*delta)));
        }

        let setters = deltas
            .iter()
            .map(|_| "?, COALESCE(json_extract(\"data\", ?), 0) + ?")
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            r#"
            INSERT INTO "documents" ("collection", "id", "data", "createdAt", "updatedAt")
            VALUES (?, ?, json(?), ?, ?)
            ON CONFLICT ("collection", "id")
            DO UPDATE SET "data" = json_set("data", {setters}), "updatedAt" = excluded."updatedAt"
            "#
        );

        let now = now_iso();
        let mut query = sqlx::query(&sql)
            .bind(collection)
            .bind(id)
            .bind(Value::Object(initial).to_string())
            .bind(&now)
            .bind(&now);
        for (field, delta) in deltas {
            let path = json_path(field)?;
            query = query.bind(path.clone()).bind(path).bind(*delta);
        }
        query.execute(&self.pool).await?;

        Ok(())
    }

    /// All documents of `collection` whose top-level `field` equals `value`,
    /// in creation order.
    pub async fn query<T: DeserializeOwned>(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<T>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT "id", "data" FROM "documents"
            WHERE "collection" = ? AND json_extract("data", ?) = ?
            ORDER BY "createdAt" ASC, "id" ASC
            "#,
        )
        .bind(collection)
        .bind(json_path(field)?)
        .bind(value)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let id: String = row.try_get("id")?;
                let data: String = row.try_get("data")?;
                decode(collection, &id, &data)
            })
            .collect()
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(r#"DELETE FROM "documents" WHERE "collection" = ? AND "id" = ?"#)
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("linguaquest")
        .join("data.db")
}

fn decode<T: DeserializeOwned>(collection: &str, id: &str, data: &str) -> Result<T, StoreError> {
    serde_json::from_str(data).map_err(|source| StoreError::Decode {
        collection: collection.to_string(),
        id: id.to_string(),
        source,
    })
}

fn json_path(field: &str) -> Result<String, StoreError> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StoreError::InvalidField(field.to_string()));
    }
    Ok(format!("$.{field}"))
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("document {collection}/{id} is malformed: {source}")]
    Decode {
        collection: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("document body must be a JSON object")]
    NotAnObject,
    #[error("invalid field name: {0}")]
    InvalidField(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Config error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Counter {
        user_id: String,
        words: i64,
        minutes: i64,
    }

    #[tokio::test]
    async fn increment_creates_then_accumulates() {
        let store = DocumentStore::in_memory().await.unwrap();
        let seed = json!({ "userId": "u1", "words": 0, "minutes": 0 });

        store
            .increment("stats", "u1_2024-01-01", seed.clone(), &[("words", 3), ("minutes", 10)])
            .await
            .unwrap();
        store
            .increment("stats", "u1_2024-01-01", seed, &[("words", 2)])
            .await
            .unwrap();

        let counter: Counter = store.get("stats", "u1_2024-01-01").await.unwrap().unwrap();
        assert_eq!(
            counter,
            Counter { user_id: "u1".into(), words: 5, minutes: 10 }
        );
    }

    #[tokio::test]
    async fn merge_keeps_untouched_fields() {
        let store = DocumentStore::in_memory().await.unwrap();
        store
            .set("stats", "a", &json!({ "userId": "u1", "words": 4, "minutes": 1 }))
            .await
            .unwrap();
        store.merge("stats", "a", json!({ "minutes": 9 })).await.unwrap();

        let counter: Counter = store.get("stats", "a").await.unwrap().unwrap();
        assert_eq!(counter.words, 4);
        assert_eq!(counter.minutes, 9);
    }

    #[tokio::test]
    async fn query_filters_by_field_in_creation_order() {
        let store = DocumentStore::in_memory().await.unwrap();
        for (id, user) in [("a", "u1"), ("b", "u2"), ("c", "u1")] {
            store
                .set("stats", id, &json!({ "userId": user, "words": 1, "minutes": 0 }))
                .await
                .unwrap();
        }

        let found: Vec<Counter> = store.query("stats", "userId", "u1").await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|c| c.user_id == "u1"));
    }

    #[tokio::test]
    async fn rejects_field_names_outside_identifier_charset() {
        let store = DocumentStore::in_memory().await.unwrap();
        let err = store
            .increment("stats", "x", json!({}), &[("words') --", 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidField(_)));
    }

    #[tokio::test]
    async fn delete_reports_whether_a_document_was_removed() {
        let store = DocumentStore::in_memory().await.unwrap();
        store.set("stats", "a", &json!({ "userId": "u1" })).await.unwrap();
        assert!(store.delete("stats", "a").await.unwrap());
        assert!(!store.delete("stats", "a").await.unwrap());
        assert!(store.get::<Value>("stats", "a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.db");

        {
            let store = DocumentStore::open(&path).await.unwrap();
            store.set("prefs", "u1", &json!({ "theme": "dark" })).await.unwrap();
            store.pool().close().await;
        }

        let store = DocumentStore::open(&path).await.unwrap();
        let prefs: Value = store.get("prefs", "u1").await.unwrap().unwrap();
        assert_eq!(prefs["theme"], "dark");
    }
}
