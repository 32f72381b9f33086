use actix_web::{web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{bearer_validator, AuthUser},
    errors::ApiError,
    state::AppState,
    store::appointments::{self, AppointmentInput, AppointmentUpdate},
};

#[derive(Deserialize)]
struct ListQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Deserialize)]
struct SlotsQuery {
    date: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/appointments")
            .service(
                web::resource("/services/{service_id}/available-slots")
                    .route(web::get().to(available_slots)),
            )
            .service(
                web::scope("")
                    .wrap(HttpAuthentication::bearer(bearer_validator))
                    .service(
                        web::resource("")
                            .route(web::get().to(list))
                            .route(web::post().to(create)),
                    )
                    .service(web::resource("/my").route(web::get().to(my)))
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(fetch_one))
                            .route(web::put().to(update))
                            .route(web::delete().to(remove)),
                    ),
            ),
    );
}

/// Admins see the whole book, everyone else their own appointments.
async fn list(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let rows = if auth.is_admin {
        let range = match (query.start_date.as_deref(), query.end_date.as_deref()) {
            (Some(start), Some(end)) => Some((
                appointments::canonical_date(start)?,
                appointments::canonical_date(end)?,
            )),
            _ => None,
        };
        appointments::list_all(&state.db, range).await?
    } else {
        appointments::list_for_user(&state.db, &auth.user_id).await?
    };

    Ok(HttpResponse::Ok().json(json!({ "message": "appointments fetched", "data": rows })))
}

async fn my(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    let rows = appointments::list_for_user(&state.db, &auth.user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "appointments fetched", "data": rows })))
}

async fn fetch_one(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let appointment = appointments::fetch(&state.db, &path)
        .await?
        .ok_or_else(|| ApiError::NotFound("appointment not found".to_string()))?;

    if appointment.user_id != auth.user_id && !auth.is_admin {
        return Err(ApiError::Forbidden("not your appointment".to_string()));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "appointment fetched", "data": appointment })))
}

async fn create(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    payload: web::Json<AppointmentInput>,
) -> Result<HttpResponse, ApiError> {
    let appointment = appointments::create(&state.db, &auth.user_id, &payload).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "appointment created",
        "data": appointment
    })))
}

async fn update(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
    payload: web::Json<AppointmentUpdate>,
) -> Result<HttpResponse, ApiError> {
    let existing = appointments::fetch(&state.db, &path)
        .await?
        .ok_or_else(|| ApiError::NotFound("appointment not found".to_string()))?;

    if existing.user_id != auth.user_id && !auth.is_admin {
        return Err(ApiError::Forbidden("not your appointment".to_string()));
    }

    let appointment = appointments::update(&state.db, &path, &payload)
        .await?
        .ok_or_else(|| ApiError::NotFound("appointment not found".to_string()))?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "appointment updated",
        "data": appointment
    })))
}

async fn remove(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let existing = appointments::fetch(&state.db, &path)
        .await?
        .ok_or_else(|| ApiError::NotFound("appointment not found".to_string()))?;

    if existing.user_id != auth.user_id && !auth.is_admin {
        return Err(ApiError::Forbidden("not your appointment".to_string()));
    }

    appointments::delete(&state.db, &path).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "appointment deleted" })))
}

async fn available_slots(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<SlotsQuery>,
) -> Result<HttpResponse, ApiError> {
    let date = query
        .date
        .as_deref()
        .ok_or_else(|| ApiError::Validation("date is required".to_string()))?;

    let slots = appointments::available_slots(&state.db, &path, date).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "available slots fetched",
        "data": slots
    })))
}
