use actix_web::{web, HttpRequest, HttpResponse};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{issue_token, require_admin, require_user, verify_password},
    errors::ApiError,
    models::{Course, Profile, Service},
    state::AppState,
    store::{
        self,
        appointments::{self, AppointmentInput, AppointmentUpdate},
        content::{self, ContentBlockInput},
        courses::{self, CourseInput, CourseUpdate},
        orders::{self, OrderInput},
        profiles::{self, RegisterInput},
        services::{self, ServiceInput, ServiceUpdate},
    },
};

/// Alias surface for clients built against the edge-function convention:
/// one path per resource, `?id=` to select a row, `?action=` for verbs.
/// Every handler resolves its own identity, the way the functions did.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/fns")
            .service(web::resource("/auth").to(auth_fn))
            .service(web::resource("/courses").to(courses_fn))
            .service(web::resource("/services").to(services_fn))
            .service(web::resource("/appointments").to(appointments_fn))
            .service(web::resource("/orders").to(orders_fn))
            .service(web::resource("/admin").to(admin_fn)),
    );
}

#[derive(Deserialize)]
struct FnQuery {
    id: Option<String>,
    action: Option<String>,
}

#[derive(Deserialize)]
struct SigninInput {
    email: String,
    password: String,
}

fn parse_json<T: DeserializeOwned>(body: &web::Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|err| ApiError::Validation(format!("invalid JSON body: {err}")))
}

fn invalid_action() -> ApiError {
    ApiError::Validation("invalid action".to_string())
}

async fn auth_fn(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<FnQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let action = query.action.as_deref().unwrap_or_default();

    match (req.method().as_str(), action) {
        ("POST", "signup") => {
            let input: RegisterInput = parse_json(&body)?;
            if !input.email.contains('@') {
                return Err(ApiError::Validation(
                    "email must be a valid email address".to_string(),
                ));
            }
            if input.password.len() < 6 {
                return Err(ApiError::Validation(
                    "password must be at least 6 characters".to_string(),
                ));
            }
            let profile = profiles::register(&state.db, &input).await?;
            let token = issue_token(&state.jwt, &profile, false)?;
            let refresh_token = issue_token(&state.jwt, &profile, true)?;
            Ok(HttpResponse::Created().json(json!({
                "user": Profile::from(profile),
                "token": token,
                "refresh_token": refresh_token,
            })))
        }
        ("POST", "signin") => {
            let input: SigninInput = parse_json(&body)?;
            let profile = profiles::fetch_by_email(&state.db, &input.email)
                .await?
                .ok_or_else(|| ApiError::Unauthorized("invalid credentials".to_string()))?;
            if !verify_password(&input.password, &profile.password_hash) {
                return Err(ApiError::Unauthorized("invalid credentials".to_string()));
            }
            let token = issue_token(&state.jwt, &profile, false)?;
            let refresh_token = issue_token(&state.jwt, &profile, true)?;
            Ok(HttpResponse::Ok().json(json!({
                "user": Profile::from(profile),
                "token": token,
                "refresh_token": refresh_token,
            })))
        }
        ("POST", "signout") => Ok(HttpResponse::Ok().json(json!({ "success": true }))),
        ("GET", "me") => {
            let user = require_user(&req, &state.jwt)?;
            let profile = profiles::fetch_by_user_id(&state.db, &user.user_id)
                .await?
                .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
            Ok(HttpResponse::Ok().json(Profile::from(profile)))
        }
        _ => Err(invalid_action()),
    }
}

async fn courses_fn(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<FnQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    match req.method().as_str() {
        "GET" => match query.id.as_deref() {
            Some(id) => {
                let course = courses::fetch(&state.db, id)
                    .await?
                    .ok_or_else(|| ApiError::NotFound("course not found".to_string()))?;
                Ok(HttpResponse::Ok().json(Course::from(course)))
            }
            None => {
                let rows = courses::list(&state.db, None, None).await?;
                let data: Vec<Course> = rows.into_iter().map(Course::from).collect();
                Ok(HttpResponse::Ok().json(data))
            }
        },
        "POST" => {
            require_admin(&req, &state.jwt)?;
            let input: CourseInput = parse_json(&body)?;
            courses::validate_input(&input)?;
            let course = courses::insert(&state.db, &input).await?;
            Ok(HttpResponse::Created().json(Course::from(course)))
        }
        "PUT" => {
            require_admin(&req, &state.jwt)?;
            let id = query.id.as_deref().ok_or_else(|| {
                ApiError::Validation("id query parameter is required".to_string())
            })?;
            let input: CourseUpdate = parse_json(&body)?;
            let course = courses::update(&state.db, id, &input)
                .await?
                .ok_or_else(|| ApiError::NotFound("course not found".to_string()))?;
            Ok(HttpResponse::Ok().json(Course::from(course)))
        }
        "DELETE" => {
            require_admin(&req, &state.jwt)?;
            let id = query.id.as_deref().ok_or_else(|| {
                ApiError::Validation("id query parameter is required".to_string())
            })?;
            if !courses::deactivate(&state.db, id).await? {
                return Err(ApiError::NotFound("course not found".to_string()));
            }
            Ok(HttpResponse::Ok().json(json!({ "success": true })))
        }
        _ => Err(invalid_action()),
    }
}

async fn services_fn(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<FnQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    match req.method().as_str() {
        "GET" => match query.id.as_deref() {
            Some(id) => {
                let service = services::fetch(&state.db, id)
                    .await?
                    .ok_or_else(|| ApiError::NotFound("service not found".to_string()))?;
                Ok(HttpResponse::Ok().json(Service::from(service)))
            }
            None => {
                let rows = services::list(&state.db, None).await?;
                let data: Vec<Service> = rows.into_iter().map(Service::from).collect();
                Ok(HttpResponse::Ok().json(data))
            }
        },
        "POST" => {
            require_admin(&req, &state.jwt)?;
            let input: ServiceInput = parse_json(&body)?;
            services::validate_input(&input)?;
            let service = services::insert(&state.db, &input).await?;
            Ok(HttpResponse::Created().json(Service::from(service)))
        }
        "PUT" => {
            require_admin(&req, &state.jwt)?;
            let id = query.id.as_deref().ok_or_else(|| {
                ApiError::Validation("id query parameter is required".to_string())
            })?;
            let input: ServiceUpdate = parse_json(&body)?;
            let service = services::update(&state.db, id, &input)
                .await?
                .ok_or_else(|| ApiError::NotFound("service not found".to_string()))?;
            Ok(HttpResponse::Ok().json(Service::from(service)))
        }
        "DELETE" => {
            require_admin(&req, &state.jwt)?;
            let id = query.id.as_deref().ok_or_else(|| {
                ApiError::Validation("id query parameter is required".to_string())
            })?;
            if !services::deactivate(&state.db, id).await? {
                return Err(ApiError::NotFound("service not found".to_string()));
            }
            Ok(HttpResponse::Ok().json(json!({ "success": true })))
        }
        _ => Err(invalid_action()),
    }
}

async fn appointments_fn(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<FnQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let user = require_user(&req, &state.jwt)?;

    match req.method().as_str() {
        "GET" => match query.id.as_deref() {
            Some(id) => {
                let appointment = appointments::fetch(&state.db, id)
                    .await?
                    .ok_or_else(|| ApiError::NotFound("appointment not found".to_string()))?;
                if appointment.user_id != user.user_id && !user.is_admin {
                    return Err(ApiError::Forbidden("not your appointment".to_string()));
                }
                Ok(HttpResponse::Ok().json(appointment))
            }
            None => {
                let rows = if user.is_admin {
                    appointments::list_all(&state.db, None).await?
                } else {
                    appointments::list_for_user(&state.db, &user.user_id).await?
                };
                Ok(HttpResponse::Ok().json(rows))
            }
        },
        "POST" => {
            let input: AppointmentInput = parse_json(&body)?;
            let appointment = appointments::create(&state.db, &user.user_id, &input).await?;
            Ok(HttpResponse::Created().json(json!({ "success": true, "appointment": appointment })))
        }
        "PUT" => {
            let id = query.id.as_deref().ok_or_else(|| {
                ApiError::Validation("id query parameter is required".to_string())
            })?;
            let existing = appointments::fetch(&state.db, id)
                .await?
                .ok_or_else(|| ApiError::NotFound("appointment not found".to_string()))?;
            if existing.user_id != user.user_id && !user.is_admin {
                return Err(ApiError::Forbidden("not your appointment".to_string()));
            }
            let input: AppointmentUpdate = parse_json(&body)?;
            let appointment = appointments::update(&state.db, id, &input)
                .await?
                .ok_or_else(|| ApiError::NotFound("appointment not found".to_string()))?;
            Ok(HttpResponse::Ok().json(appointment))
        }
        "DELETE" => {
            let id = query.id.as_deref().ok_or_else(|| {
                ApiError::Validation("id query parameter is required".to_string())
            })?;
            let existing = appointments::fetch(&state.db, id)
                .await?
                .ok_or_else(|| ApiError::NotFound("appointment not found".to_string()))?;
            if existing.user_id != user.user_id && !user.is_admin {
                return Err(ApiError::Forbidden("not your appointment".to_string()));
            }
            appointments::delete(&state.db, id).await?;
            Ok(HttpResponse::Ok().json(json!({ "success": true })))
        }
        _ => Err(invalid_action()),
    }
}

async fn orders_fn(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<FnQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let user = require_user(&req, &state.jwt)?;

    match req.method().as_str() {
        "GET" => match query.id.as_deref() {
            Some(id) => {
                let (order, items) = orders::fetch_with_items(&state.db, id)
                    .await?
                    .ok_or_else(|| ApiError::NotFound("order not found".to_string()))?;
                if order.user_id != user.user_id && !user.is_admin {
                    return Err(ApiError::Forbidden("not your order".to_string()));
                }
                Ok(HttpResponse::Ok().json(json!({ "order": order, "items": items })))
            }
            None => {
                let rows = if user.is_admin {
                    orders::list_all(&state.db).await?
                } else {
                    orders::list_for_user(&state.db, &user.user_id).await?
                };
                Ok(HttpResponse::Ok().json(rows))
            }
        },
        "POST" => {
            let input: OrderInput = parse_json(&body)?;
            let order = orders::create(&state.db, &user.user_id, &input).await?;
            Ok(HttpResponse::Created().json(json!({ "success": true, "order": order })))
        }
        _ => Err(invalid_action()),
    }
}

async fn admin_fn(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<FnQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    require_admin(&req, &state.jwt)?;
    let action = query.action.as_deref().unwrap_or_default();

    match (req.method().as_str(), action) {
        ("GET", "stats") => {
            let counts = store::entity_counts(&state.db).await?;
            Ok(HttpResponse::Ok().json(counts))
        }
        ("GET", "courses") => {
            let rows = courses::list_all(&state.db).await?;
            let data: Vec<Course> = rows.into_iter().map(Course::from).collect();
            Ok(HttpResponse::Ok().json(data))
        }
        ("GET", "services") => {
            let rows = services::list_all(&state.db).await?;
            let data: Vec<Service> = rows.into_iter().map(Service::from).collect();
            Ok(HttpResponse::Ok().json(data))
        }
        ("GET", "appointments") => {
            let rows = appointments::list_all(&state.db, None).await?;
            Ok(HttpResponse::Ok().json(rows))
        }
        ("GET", "orders") => {
            let rows = orders::list_all(&state.db).await?;
            Ok(HttpResponse::Ok().json(rows))
        }
        ("GET", "content") => {
            let blocks = content::list_blocks(&state.db).await?;
            let data: Vec<_> = blocks
                .into_iter()
                .map(|block| json!({ "key": block.key, "title": block.title, "html": block.html }))
                .collect();
            Ok(HttpResponse::Ok().json(data))
        }
        ("POST", "content") => {
            let input: ContentBlockInput = parse_json(&body)?;
            content::upsert_block(&state.db, &input).await?;
            Ok(HttpResponse::Ok().json(json!({ "success": true })))
        }
        _ => Err(invalid_action()),
    }
}
