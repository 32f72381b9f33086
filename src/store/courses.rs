use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{auth::new_id, errors::ApiError, models::CourseRow};

const COLUMNS: &str = "id, title, description, price, image_url, category, content_url, duration, instructor, level, is_active, created_at, updated_at";

#[derive(Debug, Deserialize)]
pub struct CourseInput {
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub image_url: Option<String>,
    pub category: String,
    pub content_url: Option<String>,
    pub duration: Option<String>,
    pub instructor: Option<String>,
    pub level: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CourseUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub content_url: Option<String>,
    pub duration: Option<String>,
    pub instructor: Option<String>,
    pub level: Option<String>,
    pub is_active: Option<bool>,
}

pub fn validate_input(input: &CourseInput) -> Result<(), ApiError> {
    if input.title.trim().len() < 3 {
        return Err(ApiError::Validation(
            "title must be at least 3 characters".to_string(),
        ));
    }
    if input.price <= 0.0 {
        return Err(ApiError::Validation("price must be positive".to_string()));
    }
    if input.category.trim().is_empty() {
        return Err(ApiError::Validation("category is required".to_string()));
    }
    Ok(())
}

/// Active courses, optionally narrowed by category or a free-text search
/// over title/description/category.
pub async fn list(
    pool: &SqlitePool,
    category: Option<&str>,
    search: Option<&str>,
) -> Result<Vec<CourseRow>, sqlx::Error> {
    if let Some(search) = search {
        let pattern = format!("%{search}%");
        return sqlx::query_as::<_, CourseRow>(&format!(
            r#"SELECT {COLUMNS} FROM courses
               WHERE is_active = 1
                 AND (title LIKE ? OR description LIKE ? OR category LIKE ?)
               ORDER BY created_at DESC"#
        ))
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(pool)
        .await;
    }

    if let Some(category) = category {
        return sqlx::query_as::<_, CourseRow>(&format!(
            "SELECT {COLUMNS} FROM courses WHERE category = ? AND is_active = 1 ORDER BY created_at DESC"
        ))
        .bind(category)
        .fetch_all(pool)
        .await;
    }

    sqlx::query_as::<_, CourseRow>(&format!(
        "SELECT {COLUMNS} FROM courses WHERE is_active = 1 ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await
}

/// Every course, inactive rows included. Admin listings only.
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<CourseRow>, sqlx::Error> {
    sqlx::query_as::<_, CourseRow>(&format!(
        "SELECT {COLUMNS} FROM courses ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn fetch(pool: &SqlitePool, id: &str) -> Result<Option<CourseRow>, sqlx::Error> {
    sqlx::query_as::<_, CourseRow>(&format!("SELECT {COLUMNS} FROM courses WHERE id = ? LIMIT 1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert(pool: &SqlitePool, input: &CourseInput) -> Result<CourseRow, ApiError> {
    let id = new_id();
    let now = Utc::now().to_rfc3339();
    let is_active = i64::from(input.is_active.unwrap_or(true));

    sqlx::query(
        r#"INSERT INTO courses (id, title, description, price, image_url, category, content_url, duration, instructor, level, is_active, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(input.title.trim())
    .bind(&input.description)
    .bind(input.price)
    .bind(&input.image_url)
    .bind(input.category.trim())
    .bind(&input.content_url)
    .bind(&input.duration)
    .bind(input.instructor.as_deref().unwrap_or("Lumina"))
    .bind(input.level.as_deref().unwrap_or("Beginner"))
    .bind(is_active)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    fetch(pool, &id)
        .await?
        .ok_or_else(|| ApiError::Internal("course vanished after insert".to_string()))
}

pub async fn update(
    pool: &SqlitePool,
    id: &str,
    input: &CourseUpdate,
) -> Result<Option<CourseRow>, ApiError> {
    if let Some(price) = input.price {
        if price <= 0.0 {
            return Err(ApiError::Validation("price must be positive".to_string()));
        }
    }

    let result = sqlx::query(
        r#"UPDATE courses
           SET title = COALESCE(?, title),
               description = COALESCE(?, description),
               price = COALESCE(?, price),
               image_url = COALESCE(?, image_url),
               category = COALESCE(?, category),
               content_url = COALESCE(?, content_url),
               duration = COALESCE(?, duration),
               instructor = COALESCE(?, instructor),
               level = COALESCE(?, level),
               is_active = COALESCE(?, is_active),
               updated_at = ?
           WHERE id = ?"#,
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(input.price)
    .bind(&input.image_url)
    .bind(&input.category)
    .bind(&input.content_url)
    .bind(&input.duration)
    .bind(&input.instructor)
    .bind(&input.level)
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

/// Soft delete: the row stays for order history, the catalog stops showing it.
pub async fn deactivate(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE courses SET is_active = 0, updated_at = ? WHERE id = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
