use actix_web::{guard, web, HttpRequest, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{admin_validator, identity_from_request},
    errors::ApiError,
    models::Course,
    state::AppState,
    store::courses::{self, CourseInput, CourseUpdate},
};

#[derive(Deserialize)]
struct ListQuery {
    category: Option<String>,
    search: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/courses")
            .service(
                web::scope("")
                    .guard(guard::Any(guard::Post()).or(guard::Put()).or(guard::Delete()))
                    .wrap(HttpAuthentication::bearer(admin_validator))
                    .service(web::resource("").route(web::post().to(create)))
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(update))
                            .route(web::delete().to(remove)),
                    ),
            )
            .service(web::resource("").route(web::get().to(list)))
            .service(web::resource("/{id}").route(web::get().to(fetch_one))),
    );
}

/// Public catalog listing. An admin token widens the listing to include
/// inactive rows so the dashboard can edit them.
async fn list(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let is_admin = identity_from_request(&req, &state.jwt)
        .map(|user| user.is_admin)
        .unwrap_or(false);

    let rows = if is_admin {
        courses::list_all(&state.db).await?
    } else {
        courses::list(
            &state.db,
            query.category.as_deref(),
            query.search.as_deref(),
        )
        .await?
    };

    let data: Vec<Course> = rows.into_iter().map(Course::from).collect();
    Ok(HttpResponse::Ok().json(json!({ "message": "courses fetched", "data": data })))
}

async fn fetch_one(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let course = courses::fetch(&state.db, &path)
        .await?
        .ok_or_else(|| ApiError::NotFound("course not found".to_string()))?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "course fetched",
        "data": Course::from(course)
    })))
}

async fn create(
    state: web::Data<AppState>,
    payload: web::Json<CourseInput>,
) -> Result<HttpResponse, ApiError> {
    courses::validate_input(&payload)?;
    let course = courses::insert(&state.db, &payload).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "course created",
        "data": Course::from(course)
    })))
}

async fn update(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<CourseUpdate>,
) -> Result<HttpResponse, ApiError> {
    let course = courses::update(&state.db, &path, &payload)
        .await?
        .ok_or_else(|| ApiError::NotFound("course not found".to_string()))?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "course updated",
        "data": Course::from(course)
    })))
}

async fn remove(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    if !courses::deactivate(&state.db, &path).await? {
        return Err(ApiError::NotFound("course not found".to_string()));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "course deleted" })))
}
