use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    auth::{hash_password, new_id},
    errors::ApiError,
    models::ProfileRow,
};

const COLUMNS: &str =
    "id, user_id, full_name, email, phone, avatar_url, password_hash, is_admin, created_at, updated_at";

#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

pub async fn fetch_by_email(pool: &SqlitePool, email: &str) -> Result<Option<ProfileRow>, sqlx::Error> {
    sqlx::query_as::<_, ProfileRow>(&format!(
        "SELECT {COLUMNS} FROM profiles WHERE email = ? LIMIT 1"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_by_user_id(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<ProfileRow>, sqlx::Error> {
    sqlx::query_as::<_, ProfileRow>(&format!(
        "SELECT {COLUMNS} FROM profiles WHERE user_id = ? LIMIT 1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Creates a profile for a fresh auth identity. The caller is expected to
/// have validated the input; duplicate emails still surface as a conflict.
pub async fn register(pool: &SqlitePool, input: &RegisterInput) -> Result<ProfileRow, ApiError> {
    if fetch_by_email(pool, &input.email).await?.is_some() {
        return Err(ApiError::Conflict(
            "a user with this email already exists".to_string(),
        ));
    }

    let user_id = new_id();
    let password_hash = hash_password(&input.password)?;
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"INSERT INTO profiles (id, user_id, full_name, email, phone, avatar_url, password_hash, is_admin, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, NULL, ?, 0, ?, ?)"#,
    )
    .bind(new_id())
    .bind(&user_id)
    .bind(&input.full_name)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(password_hash)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    fetch_by_user_id(pool, &user_id)
        .await?
        .ok_or_else(|| ApiError::Internal("profile vanished after insert".to_string()))
}

pub async fn update(
    pool: &SqlitePool,
    user_id: &str,
    input: &ProfileUpdate,
) -> Result<Option<ProfileRow>, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE profiles
           SET full_name = COALESCE(?, full_name),
               phone = COALESCE(?, phone),
               avatar_url = COALESCE(?, avatar_url),
               updated_at = ?
           WHERE user_id = ?"#,
    )
    .bind(&input.full_name)
    .bind(&input.phone)
    .bind(&input.avatar_url)
    .bind(Utc::now().to_rfc3339())
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    fetch_by_user_id(pool, user_id).await
}
