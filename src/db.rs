use std::{env, fs, path::Path};

use chrono::Utc;
use sqlx::SqlitePool;

use crate::auth::{hash_password, new_id};

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = if let Some(path) = db_url.strip_prefix("sqlite://") {
        Some(path)
    } else if let Some(path) = db_url.strip_prefix("sqlite:") {
        Some(path)
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = path.strip_prefix("file:").unwrap_or(path);
    let db_path = Path::new(path);
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub async fn seed_defaults(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    seed_admin(pool).await?;
    seed_content_blocks(pool).await?;
    seed_catalog(pool).await?;
    Ok(())
}

async fn seed_admin(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let existing = sqlx::query_as::<_, (String,)>("SELECT id FROM profiles WHERE is_admin = 1 LIMIT 1")
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    let email = env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@lumina.studio".to_string());
    let password = env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string());
    let full_name = env::var("ADMIN_NAME").unwrap_or_else(|_| "Studio Admin".to_string());

    if password == "admin" {
        log::warn!("ADMIN_PASSWORD not set. Using default password 'admin'. Set ADMIN_PASSWORD in production.");
    }

    let password_hash =
        hash_password(&password).map_err(|_| sqlx::Error::Protocol("password hash failed".into()))?;
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"INSERT INTO profiles (id, user_id, full_name, email, phone, avatar_url, password_hash, is_admin, created_at, updated_at)
           VALUES (?, ?, ?, ?, NULL, NULL, ?, 1, ?, ?)"#,
    )
    .bind(new_id())
    .bind(new_id())
    .bind(full_name)
    .bind(email)
    .bind(password_hash)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(())
}

async fn seed_content_blocks(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let blocks = vec![
        (
            "home_hero",
            "Home Hero",
            r#"<h1>Look your best, learn the craft.</h1>
<p>Lumina Studio offers in-person beauty services and self-paced courses. Book a session or start learning today.</p>"#,
        ),
        (
            "home_about",
            "Home About",
            r#"<h2>A studio built around you</h2>
<p>From makeup sessions to skincare consultations, every appointment is one-on-one with a certified professional.</p>"#,
        ),
        (
            "home_services",
            "Home Services Intro",
            r#"<h2>Services</h2>
<p>Pick a service and a time that works for you. Confirmation lands in minutes.</p>"#,
        ),
        (
            "home_courses",
            "Home Courses Intro",
            r#"<h2>Courses</h2>
<p>Learn the techniques we use every day, at your own pace, from any device.</p>"#,
        ),
    ];

    for (key, title, html) in blocks {
        let exists = sqlx::query_as::<_, (String,)>("SELECT key FROM content_blocks WHERE key = ? LIMIT 1")
            .bind(key)
            .fetch_optional(pool)
            .await?;
        if exists.is_some() {
            continue;
        }
        sqlx::query(
            r#"INSERT INTO content_blocks (key, title, html, updated_at)
               VALUES (?, ?, ?, ?)"#,
        )
        .bind(key)
        .bind(title)
        .bind(html)
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
    }

    Ok(())
}

async fn seed_catalog(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let have_services = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM services")
        .fetch_one(pool)
        .await?;

    if have_services == 0 {
        let services = vec![
            ("Signature Makeup", "Full-face session for events and shoots.", 180.0, 60),
            ("Express Makeup", "Quick polish for busy days.", 90.0, 30),
            ("Skincare Consultation", "Personalized routine and product guidance.", 120.0, 45),
            ("Bridal Trial", "Complete trial run ahead of the big day.", 250.0, 90),
        ];
        for (name, description, price, duration_minutes) in services {
            let now = Utc::now().to_rfc3339();
            sqlx::query(
                r#"INSERT INTO services (id, name, description, price, duration_minutes, image_url, is_active, created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?, NULL, 1, ?, ?)"#,
            )
            .bind(new_id())
            .bind(name)
            .bind(description)
            .bind(price)
            .bind(duration_minutes)
            .bind(&now)
            .bind(&now)
            .execute(pool)
            .await?;
        }
    }

    let have_courses = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM courses")
        .fetch_one(pool)
        .await?;

    if have_courses == 0 {
        let courses = vec![
            ("Everyday Makeup Basics", "Foundation, brows and a natural finish.", 149.0, "makeup", "4h"),
            ("Advanced Contouring", "Light, shadow and structure techniques.", 229.0, "makeup", "6h"),
            ("Skincare Fundamentals", "Skin types, routines and ingredients.", 119.0, "skincare", "3h"),
        ];
        for (title, description, price, category, duration) in courses {
            let now = Utc::now().to_rfc3339();
            sqlx::query(
                r#"INSERT INTO courses (id, title, description, price, image_url, category, content_url, duration, instructor, level, is_active, created_at, updated_at)
                   VALUES (?, ?, ?, ?, NULL, ?, NULL, ?, 'Lumina', 'Beginner', 1, ?, ?)"#,
            )
            .bind(new_id())
            .bind(title)
            .bind(description)
            .bind(price)
            .bind(category)
            .bind(duration)
            .bind(&now)
            .bind(&now)
            .execute(pool)
            .await?;
        }
    }

    Ok(())
}
