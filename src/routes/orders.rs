use actix_web::{web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use serde_json::json;

use crate::{
    auth::{bearer_validator, AuthUser},
    errors::ApiError,
    state::AppState,
    store::orders::{self, OrderInput, OrderUpdate},
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/orders")
            .wrap(HttpAuthentication::bearer(bearer_validator))
            .service(
                web::resource("")
                    .route(web::get().to(list))
                    .route(web::post().to(create)),
            )
            .service(web::resource("/stats").route(web::get().to(stats)))
            .service(web::resource("/my").route(web::get().to(my)))
            .service(
                web::resource("/{id}")
                    .route(web::get().to(fetch_one))
                    .route(web::put().to(update))
                    .route(web::delete().to(remove)),
            ),
    );
}

async fn list(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    if !auth.is_admin {
        return Err(ApiError::Forbidden("admin access required".to_string()));
    }
    let rows = orders::list_all(&state.db).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "orders fetched", "data": rows })))
}

async fn stats(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    if !auth.is_admin {
        return Err(ApiError::Forbidden("admin access required".to_string()));
    }
    let stats = orders::stats(&state.db).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "order stats fetched", "data": stats })))
}

async fn my(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    let rows = orders::list_for_user(&state.db, &auth.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "orders fetched", "data": rows })))
}

async fn fetch_one(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let (order, items) = orders::fetch_with_items(&state.db, &path)
        .await?
        .ok_or_else(|| ApiError::NotFound("order not found".to_string()))?;

    if order.user_id != auth.user_id && !auth.is_admin {
        return Err(ApiError::Forbidden("not your order".to_string()));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "order fetched",
        "data": { "order": order, "items": items }
    })))
}

async fn create(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    payload: web::Json<OrderInput>,
) -> Result<HttpResponse, ApiError> {
    let order = orders::create(&state.db, &auth.user_id, &payload).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "order created",
        "data": order
    })))
}

async fn update(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
    payload: web::Json<OrderUpdate>,
) -> Result<HttpResponse, ApiError> {
    if !auth.is_admin {
        return Err(ApiError::Forbidden("admin access required".to_string()));
    }

    let order = orders::update(&state.db, &path, &payload)
        .await?
        .ok_or_else(|| ApiError::NotFound("order not found".to_string()))?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "order updated",
        "data": order
    })))
}

async fn remove(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    if !auth.is_admin {
        return Err(ApiError::Forbidden("admin access required".to_string()));
    }

    if !orders::delete(&state.db, &path).await? {
        return Err(ApiError::NotFound("order not found".to_string()));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "order deleted" })))
}
