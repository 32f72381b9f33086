use actix_web::{guard, web, HttpRequest, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{admin_validator, identity_from_request},
    errors::ApiError,
    models::Service,
    state::AppState,
    store::services::{self, ServiceInput, ServiceUpdate},
};

#[derive(Deserialize)]
struct ListQuery {
    search: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/services")
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

async fn list(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let is_admin = identity_from_request(&req, &state.jwt)
        .map(|user| user.is_admin)
        .unwrap_or(false);

    let rows = if is_admin {
        services::list_all(&state.db).await?
    } else {
        services::list(&state.db, query.search.as_deref()).await?
    };

    let data: Vec<Service> = rows.into_iter().map(Service::from).collect();
    Ok(HttpResponse::Ok().json(json!({ "message": "services fetched", "data": data })))
}

async fn fetch_one(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let service = services::fetch(&state.db, &path)
        .await?
        .ok_or_else(|| ApiError::NotFound("service not found".to_string()))?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "service fetched",
        "data": Service::from(service)
    })))
}

async fn create(
    state: web::Data<AppState>,
    payload: web::Json<ServiceInput>,
) -> Result<HttpResponse, ApiError> {
    services::validate_input(&payload)?;
    let service = services::insert(&state.db, &payload).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "service created",
        "data": Service::from(service)
    })))
}

async fn update(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<ServiceUpdate>,
) -> Result<HttpResponse, ApiError> {
    let service = services::update(&state.db, &path, &payload)
        .await?
        .ok_or_else(|| ApiError::NotFound("service not found".to_string()))?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "service updated",
        "data": Service::from(service)
    })))
}

async fn remove(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    if !services::deactivate(&state.db, &path).await? {
        return Err(ApiError::NotFound("service not found".to_string()));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "service deleted" })))
}
