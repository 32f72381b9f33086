pub mod appointments;
pub mod content;
pub mod courses;
pub mod orders;
pub mod profiles;
pub mod services;

use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Debug, Clone, Serialize)]
pub struct EntityCounts {
    pub total_courses: i64,
    pub total_services: i64,
    pub total_appointments: i64,
    pub total_orders: i64,
}

pub async fn entity_counts(pool: &SqlitePool) -> Result<EntityCounts, sqlx::Error> {
    let total_courses = count(pool, "SELECT COUNT(*) FROM courses").await?;
    let total_services = count(pool, "SELECT COUNT(*) FROM services").await?;
    let total_appointments = count(pool, "SELECT COUNT(*) FROM appointments").await?;
    let total_orders = count(pool, "SELECT COUNT(*) FROM orders").await?;
    Ok(EntityCounts {
        total_courses,
        total_services,
        total_appointments,
        total_orders,
    })
}

async fn count(pool: &SqlitePool, query: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(query).fetch_one(pool).await
}
