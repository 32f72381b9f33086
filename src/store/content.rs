use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::models::ContentBlockRow;

#[derive(Debug, Deserialize)]
pub struct ContentBlockInput {
    pub key: String,
    pub title: String,
    pub html: String,
}

pub async fn fetch_block(pool: &SqlitePool, key: &str) -> Option<ContentBlockRow> {
    sqlx::query_as::<_, ContentBlockRow>(
        "SELECT key, title, html FROM content_blocks WHERE key = ?",
    )
    .bind(key)
    .fetch_optional(pool)
    .await
    .unwrap_or(None)
}

pub async fn block_html(pool: &SqlitePool, key: &str) -> String {
    fetch_block(pool, key)
        .await
        .map(|block| block.html)
        .unwrap_or_default()
}

pub async fn list_blocks(pool: &SqlitePool) -> Result<Vec<ContentBlockRow>, sqlx::Error> {
    sqlx::query_as::<_, ContentBlockRow>(
        "SELECT key, title, html FROM content_blocks ORDER BY key",
    )
    .fetch_all(pool)
    .await
}

pub async fn upsert_block(pool: &SqlitePool, input: &ContentBlockInput) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO content_blocks (key, title, html, updated_at)
           VALUES (?, ?, ?, ?)
           ON CONFLICT(key) DO UPDATE SET title = excluded.title, html = excluded.html, updated_at = excluded.updated_at"#,
    )
    .bind(&input.key)
    .bind(&input.title)
    .bind(&input.html)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}
