use serde::Serialize;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_CONFIRMED: &str = "confirmed";
pub const STATUS_CANCELLED: &str = "cancelled";
pub const STATUS_COMPLETED: &str = "completed";

pub const APPOINTMENT_STATUSES: [&str; 4] = [
    STATUS_PENDING,
    STATUS_CONFIRMED,
    STATUS_CANCELLED,
    STATUS_COMPLETED,
];

pub const ORDER_PENDING: &str = "pending";
pub const ORDER_PAID: &str = "paid";
pub const ORDER_CANCELLED: &str = "cancelled";
pub const ORDER_REFUNDED: &str = "refunded";

pub const ORDER_STATUSES: [&str; 4] = [ORDER_PENDING, ORDER_PAID, ORDER_CANCELLED, ORDER_REFUNDED];

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileRow {
    pub id: String,
    pub user_id: String,
    pub full_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub password_hash: String,
    pub is_admin: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Profile as exposed over the API. The password hash never leaves the row.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: String,
    pub user_id: String,
    pub full_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub is_admin: bool,
    pub created_at: String,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            avatar_url: row.avatar_url,
            is_admin: row.is_admin == 1,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CourseRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub image_url: Option<String>,
    pub category: String,
    pub content_url: Option<String>,
    pub duration: Option<String>,
    pub instructor: String,
    pub level: String,
    pub is_active: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub image_url: Option<String>,
    pub category: String,
    pub content_url: Option<String>,
    pub duration: Option<String>,
    pub instructor: String,
    pub level: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            price: row.price,
            image_url: row.image_url,
            category: row.category,
            content_url: row.content_url,
            duration: row.duration,
            instructor: row.instructor,
            level: row.level,
            is_active: row.is_active == 1,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ServiceRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration_minutes: i64,
    pub image_url: Option<String>,
    pub is_active: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration_minutes: i64,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            duration_minutes: row.duration_minutes,
            image_url: row.image_url,
            is_active: row.is_active == 1,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct AppointmentRow {
    pub id: String,
    pub user_id: String,
    pub service_id: String,
    pub appointment_date: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub notes: Option<String>,
    pub status: String,
    pub service_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct OrderRow {
    pub id: String,
    pub user_id: String,
    pub total_amount: f64,
    pub payment_method: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct OrderItemRow {
    pub id: String,
    pub order_id: String,
    pub course_id: String,
    pub price: f64,
    pub course_title: Option<String>,
    pub course_image: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderStats {
    pub total_orders: i64,
    pub total_revenue: f64,
    pub pending_orders: i64,
    pub paid_orders: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContentBlockRow {
    pub key: String,
    pub title: String,
    pub html: String,
}
