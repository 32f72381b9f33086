use std::sync::Arc;

use actix_web::{
    http::{header, StatusCode},
    test, web, App,
};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;

use lumina_studio::{
    auth::issue_token,
    rate_limit::RateLimiter,
    routes,
    state::{AppState, JwtConfig},
    store::courses::{self, CourseInput},
    store::profiles::{self, RegisterInput},
    store::services::{self, ServiceInput},
};

async fn test_state() -> AppState {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    lumina_studio::db::run_migrations(&pool)
        .await
        .expect("migrations");

    AppState {
        db: pool,
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_ttl_hours: 1,
            refresh_ttl_hours: 24,
        },
        limiter: Arc::new(RateLimiter::new(60, 1_000_000)),
    }
}

macro_rules! test_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .configure(routes::configure_app)
                .default_service(web::route().to(routes::site::not_found)),
        )
        .await
    };
}

async fn register_user(state: &AppState, email: &str) -> (String, String) {
    let profile = profiles::register(
        &state.db,
        &RegisterInput {
            email: email.to_string(),
            password: "secret123".to_string(),
            full_name: Some("Test User".to_string()),
            phone: None,
        },
    )
    .await
    .expect("register");
    let token = issue_token(&state.jwt, &profile, false).expect("token");
    (profile.user_id, token)
}

async fn register_admin(state: &AppState, email: &str) -> (String, String) {
    let (user_id, _) = register_user(state, email).await;
    sqlx::query("UPDATE profiles SET is_admin = 1 WHERE user_id = ?")
        .bind(&user_id)
        .execute(&state.db)
        .await
        .expect("promote admin");
    let profile = profiles::fetch_by_user_id(&state.db, &user_id)
        .await
        .expect("fetch")
        .expect("admin profile");
    let token = issue_token(&state.jwt, &profile, false).expect("token");
    (user_id, token)
}

async fn seed_service(state: &AppState) -> String {
    let service = services::insert(
        &state.db,
        &ServiceInput {
            name: "Signature Makeup".to_string(),
            description: None,
            price: 180.0,
            duration_minutes: 60,
            image_url: None,
            is_active: Some(true),
        },
    )
    .await
    .expect("seed service");
    service.id
}

async fn seed_course(state: &AppState) -> String {
    let course = courses::insert(
        &state.db,
        &CourseInput {
            title: "Everyday Makeup Basics".to_string(),
            description: None,
            price: 149.0,
            image_url: None,
            category: "makeup".to_string(),
            content_url: None,
            duration: None,
            instructor: None,
            level: None,
            is_active: Some(true),
        },
    )
    .await
    .expect("seed course");
    course.id
}

fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

#[actix_web::test]
async fn register_login_me_round_trip() {
    let state = test_state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "email": "alex@example.com",
            "password": "secret123",
            "full_name": "Alex Doe"
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    assert!(body["data"]["token"].is_string());
    assert_eq!(body["data"]["user"]["email"], "alex@example.com");
    assert_eq!(body["data"]["user"]["is_admin"], false);
    assert!(body["data"]["user"].get("password_hash").is_none());

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "alex@example.com", "password": "secret123" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    let token = body["data"]["token"].as_str().expect("token").to_string();

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&token))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"]["user"]["full_name"], "Alex Doe");
}

#[actix_web::test]
async fn register_rejects_duplicate_email() {
    let state = test_state().await;
    let app = test_app!(state);

    for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({ "email": "dupe@example.com", "password": "secret123" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), expected);
    }
}

#[actix_web::test]
async fn login_rejects_wrong_password() {
    let state = test_state().await;
    let app = test_app!(state);
    register_user(&state, "alex@example.com").await;

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "alex@example.com", "password": "wrong-password" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn invalid_and_expired_tokens_are_unauthorized() {
    let state = test_state().await;
    let app = test_app!(state);

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer("not-a-real-token"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // A token signed with the right secret but an expiry in the past.
    let (user_id, _) = register_user(&state, "old@example.com").await;
    let profile = profiles::fetch_by_user_id(&state.db, &user_id)
        .await
        .unwrap()
        .unwrap();
    let expired_cfg = JwtConfig {
        access_ttl_hours: -2,
        ..state.jwt.clone()
    };
    let expired = issue_token(&expired_cfg, &profile, false).unwrap();

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&expired))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn refresh_token_renews_access() {
    let state = test_state().await;
    let app = test_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "email": "fresh@example.com", "password": "secret123" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(res).await;
    let refresh_token = body["data"]["refresh_token"].as_str().unwrap().to_string();
    let access_token = body["data"]["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/auth/refresh")
        .set_json(json!({ "refresh_token": refresh_token }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    let renewed = body["data"]["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&renewed))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    // An access token is not accepted as a refresh token.
    let req = test::TestRequest::post()
        .uri("/api/auth/refresh")
        .set_json(json!({ "refresh_token": access_token }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn profile_update_round_trip() {
    let state = test_state().await;
    let app = test_app!(state);
    let (_, token) = register_user(&state, "alex@example.com").await;

    let req = test::TestRequest::put()
        .uri("/api/auth/profile")
        .insert_header(bearer(&token))
        .set_json(json!({ "full_name": "Alexandra Doe", "phone": "+55 11 99999-0000" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"]["user"]["full_name"], "Alexandra Doe");
    assert_eq!(body["data"]["user"]["phone"], "+55 11 99999-0000");
}

#[actix_web::test]
async fn admin_routes_reject_non_admin_and_anonymous() {
    let state = test_state().await;
    let app = test_app!(state);
    let (_, user_token) = register_user(&state, "user@example.com").await;

    let course = json!({ "title": "Some Course", "price": 10.0, "category": "makeup" });

    let req = test::TestRequest::post()
        .uri("/api/courses")
        .set_json(course.clone())
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/courses")
        .insert_header(bearer(&user_token))
        .set_json(course)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/orders")
        .insert_header(bearer(&user_token))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/orders/stats")
        .insert_header(bearer(&user_token))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn course_crud_round_trip_with_soft_delete() {
    let state = test_state().await;
    let app = test_app!(state);
    let (_, admin_token) = register_admin(&state, "admin@example.com").await;

    let req = test::TestRequest::post()
        .uri("/api/courses")
        .insert_header(bearer(&admin_token))
        .set_json(json!({
            "title": "Everyday Makeup Basics",
            "price": 149.0,
            "category": "makeup"
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    let course_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["instructor"], "Lumina");

    // Public list sees the course.
    let req = test::TestRequest::get().uri("/api/courses").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Category filter.
    let req = test::TestRequest::get()
        .uri("/api/courses?category=skincare")
        .to_request();
    let res = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    // Search filter.
    let req = test::TestRequest::get()
        .uri("/api/courses?search=Everyday")
        .to_request();
    let res = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Update the price.
    let req = test::TestRequest::put()
        .uri(&format!("/api/courses/{course_id}"))
        .insert_header(bearer(&admin_token))
        .set_json(json!({ "price": 199.0 }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"]["price"], 199.0);
    assert_eq!(body["data"]["title"], "Everyday Makeup Basics");

    // Soft delete hides it from the public catalog but keeps the row.
    let req = test::TestRequest::delete()
        .uri(&format!("/api/courses/{course_id}"))
        .insert_header(bearer(&admin_token))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/api/courses").to_request();
    let res = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    // An admin listing still shows the deactivated row.
    let req = test::TestRequest::get()
        .uri("/api/courses")
        .insert_header(bearer(&admin_token))
        .to_request();
    let res = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(res).await;
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["is_active"], false);
}

#[actix_web::test]
async fn service_crud_round_trip() {
    let state = test_state().await;
    let app = test_app!(state);
    let (_, admin_token) = register_admin(&state, "admin@example.com").await;

    let req = test::TestRequest::post()
        .uri("/api/services")
        .insert_header(bearer(&admin_token))
        .set_json(json!({ "name": "Bridal Trial", "price": 250.0, "duration_minutes": 90 }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    let service_id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/api/services/{service_id}"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"]["name"], "Bridal Trial");
    assert_eq!(body["data"]["duration_minutes"], 90);

    let req = test::TestRequest::get()
        .uri("/api/services/does-not-exist")
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Invalid payloads are rejected up front.
    let req = test::TestRequest::post()
        .uri("/api/services")
        .insert_header(bearer(&admin_token))
        .set_json(json!({ "name": "X", "price": -1.0, "duration_minutes": 30 }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn double_booking_a_slot_is_rejected() {
    let state = test_state().await;
    let app = test_app!(state);
    let (_, token) = register_user(&state, "alex@example.com").await;
    let service_id = seed_service(&state).await;

    let booking = json!({
        "service_id": service_id,
        "appointment_date": "2030-06-20T10:00:00Z",
        "client_name": "Alex Doe",
        "client_email": "alex@example.com",
        "client_phone": "+55 11 98888-0000"
    });

    let req = test::TestRequest::post()
        .uri("/api/appointments")
        .insert_header(bearer(&token))
        .set_json(booking.clone())
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    let appointment_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["service_name"], "Signature Makeup");

    // Same service, same timestamp: conflict.
    let req = test::TestRequest::post()
        .uri("/api/appointments")
        .insert_header(bearer(&token))
        .set_json(booking.clone())
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // Cancelling the first frees the slot again.
    let req = test::TestRequest::put()
        .uri(&format!("/api/appointments/{appointment_id}"))
        .insert_header(bearer(&token))
        .set_json(json!({ "status": "cancelled" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/api/appointments")
        .insert_header(bearer(&token))
        .set_json(booking)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
}

#[actix_web::test]
async fn booking_validates_service_and_date() {
    let state = test_state().await;
    let app = test_app!(state);
    let (_, token) = register_user(&state, "alex@example.com").await;
    let service_id = seed_service(&state).await;

    // Unknown service.
    let req = test::TestRequest::post()
        .uri("/api/appointments")
        .insert_header(bearer(&token))
        .set_json(json!({
            "service_id": "missing",
            "appointment_date": "2030-06-20T10:00:00Z",
            "client_name": "Alex Doe",
            "client_email": "alex@example.com",
            "client_phone": "123"
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Date in the past.
    let req = test::TestRequest::post()
        .uri("/api/appointments")
        .insert_header(bearer(&token))
        .set_json(json!({
            "service_id": service_id,
            "appointment_date": "2020-06-20T10:00:00Z",
            "client_name": "Alex Doe",
            "client_email": "alex@example.com",
            "client_phone": "123"
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn available_slots_exclude_booked_hours() {
    let state = test_state().await;
    let app = test_app!(state);
    let (_, token) = register_user(&state, "alex@example.com").await;
    let service_id = seed_service(&state).await;

    let req = test::TestRequest::post()
        .uri("/api/appointments")
        .insert_header(bearer(&token))
        .set_json(json!({
            "service_id": service_id,
            "appointment_date": "2030-06-20T10:00:00Z",
            "client_name": "Alex Doe",
            "client_email": "alex@example.com",
            "client_phone": "123456"
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    // Slots are public, no token needed.
    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/appointments/services/{service_id}/available-slots?date=2030-06-20"
        ))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    let slots: Vec<String> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|slot| slot.as_str().unwrap().to_string())
        .collect();
    assert_eq!(slots.len(), 8);
    assert!(!slots.iter().any(|slot| slot.contains("T10:00")));
    assert!(slots.iter().any(|slot| slot.contains("T09:00")));

    // Another day is wide open.
    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/appointments/services/{service_id}/available-slots?date=2030-06-21"
        ))
        .to_request();
    let res = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 9);

    // Missing date parameter.
    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/appointments/services/{service_id}/available-slots"
        ))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Unknown service.
    let req = test::TestRequest::get()
        .uri("/api/appointments/services/missing/available-slots?date=2030-06-20")
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn appointments_are_scoped_to_their_owner() {
    let state = test_state().await;
    let app = test_app!(state);
    let (_, alex_token) = register_user(&state, "alex@example.com").await;
    let (_, blake_token) = register_user(&state, "blake@example.com").await;
    let (_, admin_token) = register_admin(&state, "admin@example.com").await;
    let service_id = seed_service(&state).await;

    let req = test::TestRequest::post()
        .uri("/api/appointments")
        .insert_header(bearer(&alex_token))
        .set_json(json!({
            "service_id": service_id,
            "appointment_date": "2030-06-20T11:00:00Z",
            "client_name": "Alex Doe",
            "client_email": "alex@example.com",
            "client_phone": "123456"
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(res).await;
    let appointment_id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/api/appointments/{appointment_id}"))
        .insert_header(bearer(&blake_token))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri(&format!("/api/appointments/{appointment_id}"))
        .insert_header(bearer(&admin_token))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    // Blake sees an empty list, Alex sees one appointment.
    let req = test::TestRequest::get()
        .uri("/api/appointments/my")
        .insert_header(bearer(&blake_token))
        .to_request();
    let res = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let req = test::TestRequest::get()
        .uri("/api/appointments/my")
        .insert_header(bearer(&alex_token))
        .to_request();
    let res = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Blake cannot cancel Alex's appointment.
    let req = test::TestRequest::delete()
        .uri(&format!("/api/appointments/{appointment_id}"))
        .insert_header(bearer(&blake_token))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/appointments/{appointment_id}"))
        .insert_header(bearer(&alex_token))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_web::test]
async fn order_creation_is_atomic() {
    let state = test_state().await;
    let app = test_app!(state);
    let (_, admin_token) = register_admin(&state, "admin@example.com").await;
    let (_, user_token) = register_user(&state, "buyer@example.com").await;
    let course_id = seed_course(&state).await;

    // One valid item plus one bogus item: the whole order must roll back.
    let req = test::TestRequest::post()
        .uri("/api/orders")
        .insert_header(bearer(&user_token))
        .set_json(json!({
            "total_amount": 298.0,
            "items": [
                { "course_id": course_id, "price": 149.0 },
                { "course_id": "does-not-exist", "price": 149.0 }
            ]
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let order_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders")
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(order_count, 0);
    let item_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM order_items")
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!(item_count, 0);

    // The same order without the bogus item goes through.
    let req = test::TestRequest::post()
        .uri("/api/orders")
        .insert_header(bearer(&user_token))
        .set_json(json!({
            "total_amount": 149.0,
            "payment_method": "card",
            "items": [ { "course_id": course_id } ]
        }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    let order_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["status"], "pending");

    // Item price fell back to the course price.
    let req = test::TestRequest::get()
        .uri(&format!("/api/orders/{order_id}"))
        .insert_header(bearer(&user_token))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["price"], 149.0);
    assert_eq!(items[0]["course_title"], "Everyday Makeup Basics");
}

#[actix_web::test]
async fn order_stats_aggregate_paid_revenue() {
    let state = test_state().await;
    let app = test_app!(state);
    let (_, admin_token) = register_admin(&state, "admin@example.com").await;
    let (_, user_token) = register_user(&state, "buyer@example.com").await;
    let course_id = seed_course(&state).await;

    let mut order_ids = Vec::new();
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/orders")
            .insert_header(bearer(&user_token))
            .set_json(json!({
                "total_amount": 149.0,
                "items": [ { "course_id": course_id } ]
            }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(res).await;
        order_ids.push(body["data"]["id"].as_str().unwrap().to_string());
    }

    // Mark the first as paid (admin only).
    let req = test::TestRequest::put()
        .uri(&format!("/api/orders/{}", order_ids[0]))
        .insert_header(bearer(&admin_token))
        .set_json(json!({ "status": "paid" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/orders/stats")
        .insert_header(bearer(&admin_token))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"]["total_orders"], 2);
    assert_eq!(body["data"]["paid_orders"], 1);
    assert_eq!(body["data"]["pending_orders"], 1);
    assert_eq!(body["data"]["total_revenue"], 149.0);

    // A buyer only ever sees their own orders.
    let req = test::TestRequest::get()
        .uri("/api/orders/my")
        .insert_header(bearer(&user_token))
        .to_request();
    let res = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    // Unknown status values are rejected.
    let req = test::TestRequest::put()
        .uri(&format!("/api/orders/{}", order_ids[1]))
        .insert_header(bearer(&admin_token))
        .set_json(json!({ "status": "shipped" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn edge_surface_mirrors_the_rest_api() {
    let state = test_state().await;
    let app = test_app!(state);
    let (_, admin_token) = register_admin(&state, "admin@example.com").await;
    seed_service(&state).await;

    // Signup through the action convention.
    let req = test::TestRequest::post()
        .uri("/fns/auth?action=signup")
        .set_json(json!({ "email": "edge@example.com", "password": "secret123" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    let token = body["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/fns/auth?action=me")
        .insert_header(bearer(&token))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["email"], "edge@example.com");

    // Unknown action.
    let req = test::TestRequest::post()
        .uri("/fns/auth?action=frobnicate")
        .set_json(json!({}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Public catalog listing returns a bare array.
    let req = test::TestRequest::get().uri("/fns/services").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    // Admin stats require an admin token.
    let req = test::TestRequest::get()
        .uri("/fns/admin?action=stats")
        .insert_header(bearer(&token))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/fns/admin?action=stats")
        .insert_header(bearer(&admin_token))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["total_services"], 1);
    assert_eq!(body["total_orders"], 0);

    // Admin create through the edge surface.
    let req = test::TestRequest::post()
        .uri("/fns/courses")
        .insert_header(bearer(&admin_token))
        .set_json(json!({ "title": "Edge Course", "price": 99.0, "category": "makeup" }))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["title"], "Edge Course");
}

#[actix_web::test]
async fn health_and_unknown_routes() {
    let state = test_state().await;
    let app = test_app!(state);

    let req = test::TestRequest::get().uri("/health").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["status"], "OK");

    let req = test::TestRequest::get().uri("/api/nope").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["message"], "endpoint not found");
    assert_eq!(body["path"], "/api/nope");
}
