use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{auth::new_id, errors::ApiError, models::ServiceRow};

const COLUMNS: &str =
    "id, name, description, price, duration_minutes, image_url, is_active, created_at, updated_at";

#[derive(Debug, Deserialize)]
pub struct ServiceInput {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration_minutes: i64,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub duration_minutes: Option<i64>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

pub fn validate_input(input: &ServiceInput) -> Result<(), ApiError> {
    if input.name.trim().len() < 3 {
        return Err(ApiError::Validation(
            "name must be at least 3 characters".to_string(),
        ));
    }
    if input.price <= 0.0 {
        return Err(ApiError::Validation("price must be positive".to_string()));
    }
    if input.duration_minutes <= 0 {
        return Err(ApiError::Validation(
            "duration_minutes must be positive".to_string(),
        ));
    }
    Ok(())
}

pub async fn list(pool: &SqlitePool, search: Option<&str>) -> Result<Vec<ServiceRow>, sqlx::Error> {
    if let Some(search) = search {
        let pattern = format!("%{search}%");
        return sqlx::query_as::<_, ServiceRow>(&format!(
            r#"SELECT {COLUMNS} FROM services
               WHERE is_active = 1 AND (name LIKE ? OR description LIKE ?)
               ORDER BY created_at DESC"#
        ))
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(pool)
        .await;
    }

    sqlx::query_as::<_, ServiceRow>(&format!(
        "SELECT {COLUMNS} FROM services WHERE is_active = 1 ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn list_all(pool: &SqlitePool) -> Result<Vec<ServiceRow>, sqlx::Error> {
    sqlx::query_as::<_, ServiceRow>(&format!(
        "SELECT {COLUMNS} FROM services ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn fetch(pool: &SqlitePool, id: &str) -> Result<Option<ServiceRow>, sqlx::Error> {
    sqlx::query_as::<_, ServiceRow>(&format!(
        "SELECT {COLUMNS} FROM services WHERE id = ? LIMIT 1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_active(pool: &SqlitePool, id: &str) -> Result<Option<ServiceRow>, sqlx::Error> {
    sqlx::query_as::<_, ServiceRow>(&format!(
        "SELECT {COLUMNS} FROM services WHERE id = ? AND is_active = 1 LIMIT 1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn insert(pool: &SqlitePool, input: &ServiceInput) -> Result<ServiceRow, ApiError> {
    let id = new_id();
    let now = Utc::now().to_rfc3339();
    let is_active = i64::from(input.is_active.unwrap_or(true));

    sqlx::query(
        r#"INSERT INTO services (id, name, description, price, duration_minutes, image_url, is_active, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(input.name.trim())
    .bind(&input.description)
    .bind(input.price)
    .bind(input.duration_minutes)
    .bind(&input.image_url)
    .bind(is_active)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    fetch(pool, &id)
        .await?
        .ok_or_else(|| ApiError::Internal("service vanished after insert".to_string()))
}

pub async fn update(
    pool: &SqlitePool,
    id: &str,
    input: &ServiceUpdate,
) -> Result<Option<ServiceRow>, ApiError> {
    if let Some(price) = input.price {
        if price <= 0.0 {
            return Err(ApiError::Validation("price must be positive".to_string()));
        }
    }
    if let Some(duration) = input.duration_minutes {
        if duration <= 0 {
            return Err(ApiError::Validation(
                "duration_minutes must be positive".to_string(),
            ));
        }
    }

    let result = sqlx::query(
        r#"UPDATE services
           SET name = COALESCE(?, name),
               description = COALESCE(?, description),
               price = COALESCE(?, price),
               duration_minutes = COALESCE(?, duration_minutes),
               image_url = COALESCE(?, image_url),
               is_active = COALESCE(?, is_active),
               updated_at = ?
           WHERE id = ?"#,
    )
    .bind(&input.name)
    .bind(&input.description)
    .bind(input.price)
    .bind(input.duration_minutes)
    .bind(&input.image_url)
    .bind(input.is_active.map(i64::from))
    .bind(Utc::now().to_rfc3339())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    Ok(fetch(pool, id).await?)
}

pub async fn deactivate(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE services SET is_active = 0, updated_at = ? WHERE id = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
