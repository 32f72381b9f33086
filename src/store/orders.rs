use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    auth::new_id,
    errors::ApiError,
    models::{CourseRow, OrderItemRow, OrderRow, OrderStats, ORDER_PENDING, ORDER_STATUSES},
};

#[derive(Debug, Deserialize)]
pub struct OrderInput {
    pub total_amount: f64,
    pub payment_method: Option<String>,
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemInput {
    pub course_id: String,
    pub price: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct OrderUpdate {
    pub payment_method: Option<String>,
    pub status: Option<String>,
}

pub async fn list_all(pool: &SqlitePool) -> Result<Vec<OrderRow>, sqlx::Error> {
    sqlx::query_as::<_, OrderRow>("SELECT * FROM orders ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

pub async fn list_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<OrderRow>, sqlx::Error> {
    sqlx::query_as::<_, OrderRow>(
        "SELECT * FROM orders WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn fetch(pool: &SqlitePool, id: &str) -> Result<Option<OrderRow>, sqlx::Error> {
    sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = ? LIMIT 1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn fetch_with_items(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<(OrderRow, Vec<OrderItemRow>)>, sqlx::Error> {
    let Some(order) = fetch(pool, id).await? else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, OrderItemRow>(
        r#"SELECT oi.id, oi.order_id, oi.course_id, oi.price,
                  c.title as course_title, c.image_url as course_image,
                  oi.created_at
           FROM order_items oi
           JOIN courses c ON oi.course_id = c.id
           WHERE oi.order_id = ?
           ORDER BY oi.created_at ASC"#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(Some((order, items)))
}

/// Creates the order and all of its items in one transaction. A missing or
/// inactive course aborts the whole thing; the rollback leaves no order row.
pub async fn create(
    pool: &SqlitePool,
    user_id: &str,
    input: &OrderInput,
) -> Result<OrderRow, ApiError> {
    if input.total_amount <= 0.0 {
        return Err(ApiError::Validation(
            "total_amount must be positive".to_string(),
        ));
    }
    if input.items.is_empty() {
        return Err(ApiError::Validation(
            "an order needs at least one item".to_string(),
        ));
    }

    let order_id = new_id();
    let now = Utc::now().to_rfc3339();

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"INSERT INTO orders (id, user_id, total_amount, payment_method, status, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&order_id)
    .bind(user_id)
    .bind(input.total_amount)
    .bind(&input.payment_method)
    .bind(ORDER_PENDING)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    for item in &input.items {
        let course = sqlx::query_as::<_, CourseRow>(
            "SELECT * FROM courses WHERE id = ? AND is_active = 1 LIMIT 1",
        )
        .bind(&item.course_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(course) = course else {
            return Err(ApiError::Validation(format!(
                "course {} not found or inactive",
                item.course_id
            )));
        };

        let price = item.price.unwrap_or(course.price);

        sqlx::query(
            r#"INSERT INTO order_items (id, order_id, course_id, price, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(new_id())
        .bind(&order_id)
        .bind(&item.course_id)
        .bind(price)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    fetch(pool, &order_id)
        .await?
        .ok_or_else(|| ApiError::Internal("order vanished after insert".to_string()))
}

pub async fn update(
    pool: &SqlitePool,
    id: &str,
    input: &OrderUpdate,
) -> Result<Option<OrderRow>, ApiError> {
    if let Some(status) = input.status.as_deref() {
        if !ORDER_STATUSES.contains(&status) {
            return Err(ApiError::Validation(format!("unknown status '{status}'")));
        }
    }

    let result = sqlx::query(
        r#"UPDATE orders
           SET payment_method = COALESCE(?, payment_method),
               status = COALESCE(?, status),
               updated_at = ?
           WHERE id = ?"#,
    )
    .bind(&input.payment_method)
    .bind(&input.status)
    .bind(Utc::now().to_rfc3339())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    Ok(fetch(pool, id).await?)
}

/// Items first, then the order itself, atomically.
pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM order_items WHERE order_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM orders WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

pub async fn stats(pool: &SqlitePool) -> Result<OrderStats, sqlx::Error> {
    let (total_orders, total_revenue, pending_orders, paid_orders) =
        sqlx::query_as::<_, (i64, f64, i64, i64)>(
            r#"SELECT COUNT(*),
                      COALESCE(SUM(CASE WHEN status = 'paid' THEN total_amount ELSE 0.0 END), 0.0),
                      COUNT(CASE WHEN status = 'pending' THEN 1 END),
                      COUNT(CASE WHEN status = 'paid' THEN 1 END)
               FROM orders"#,
        )
        .fetch_one(pool)
        .await?;

    Ok(OrderStats {
        total_orders,
        total_revenue,
        pending_orders,
        paid_orders,
    })
}
