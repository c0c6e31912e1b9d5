use sqlx::SqlitePool;

use super::StoreError;

pub const SCHEMA_VERSION: &str = "1.0.0";

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS "_db_metadata" (
        "key" TEXT PRIMARY KEY NOT NULL,
        "value" TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "documents" (
        "collection" TEXT NOT NULL,
        "id" TEXT NOT NULL,
        "data" TEXT NOT NULL CHECK (json_valid("data")),
        "createdAt" TEXT NOT NULL,
        "updatedAt" TEXT NOT NULL,
        PRIMARY KEY ("collection", "id")
    )"#,
    r#"CREATE INDEX IF NOT EXISTS "documents_user_idx"
        ON "documents" ("collection", json_extract("data", '$.userId'))"#,
];

pub(super) async fn bootstrap(pool: &SqlitePool) -> Result<(), StoreError> {
    for statement in SCHEMA_STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }

    let version: Option<String> =
        sqlx::query_scalar(r#"SELECT "value" FROM "_db_metadata" WHERE "key" = 'schema_version'"#)
            .fetch_optional(pool)
            .await?;

    if version.as_deref() != Some(SCHEMA_VERSION) {
        sqlx::query(
            r#"INSERT OR REPLACE INTO "_db_metadata" ("key", "value") VALUES ('schema_version', ?)"#,
        )
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;
        tracing::info!(version = SCHEMA_VERSION, "document schema initialised");
    }

    Ok(())
}
