use actix_web::{web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{bearer_validator, issue_token, verify_password, verify_token, AuthUser},
    errors::ApiError,
    models::Profile,
    state::AppState,
    store::profiles::{self, ProfileUpdate, RegisterInput},
};

#[derive(Deserialize)]
struct LoginInput {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct RefreshInput {
    refresh_token: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .service(web::resource("/register").route(web::post().to(register)))
            .service(web::resource("/login").route(web::post().to(login)))
            .service(web::resource("/refresh").route(web::post().to(refresh)))
            .service(
                web::scope("")
                    .wrap(HttpAuthentication::bearer(bearer_validator))
                    .service(web::resource("/me").route(web::get().to(me)))
                    .service(web::resource("/profile").route(web::put().to(update_profile)))
                    .service(web::resource("/logout").route(web::post().to(logout))),
            ),
    );
}

async fn register(
    state: web::Data<AppState>,
    payload: web::Json<RegisterInput>,
) -> Result<HttpResponse, ApiError> {
    let input = payload.into_inner();
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
    if let Some(full_name) = input.full_name.as_deref() {
        if full_name.trim().len() < 2 {
            return Err(ApiError::Validation(
                "full_name must be at least 2 characters".to_string(),
            ));
        }
    }

    let profile = profiles::register(&state.db, &input).await?;
    let token = issue_token(&state.jwt, &profile, false)?;
    let refresh_token = issue_token(&state.jwt, &profile, true)?;

    Ok(HttpResponse::Created().json(json!({
        "message": "user created",
        "data": {
            "user": Profile::from(profile),
            "token": token,
            "refresh_token": refresh_token,
        }
    })))
}

async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginInput>,
) -> Result<HttpResponse, ApiError> {
    let input = payload.into_inner();

    let profile = profiles::fetch_by_email(&state.db, &input.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid credentials".to_string()))?;

    if !verify_password(&input.password, &profile.password_hash) {
        return Err(ApiError::Unauthorized("invalid credentials".to_string()));
    }

    let token = issue_token(&state.jwt, &profile, false)?;
    let refresh_token = issue_token(&state.jwt, &profile, true)?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "login successful",
        "data": {
            "user": Profile::from(profile),
            "token": token,
            "refresh_token": refresh_token,
        }
    })))
}

async fn refresh(
    state: web::Data<AppState>,
    payload: web::Json<RefreshInput>,
) -> Result<HttpResponse, ApiError> {
    let claims = verify_token(&state.jwt, &payload.refresh_token)?;
    if !claims.refresh {
        return Err(ApiError::Unauthorized(
            "a refresh token is required".to_string(),
        ));
    }

    let profile = profiles::fetch_by_user_id(&state.db, &claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("user no longer exists".to_string()))?;

    let token = issue_token(&state.jwt, &profile, false)?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "token renewed",
        "data": { "token": token }
    })))
}

async fn me(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    let profile = profiles::fetch_by_user_id(&state.db, &auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "profile fetched",
        "data": { "user": Profile::from(profile) }
    })))
}

async fn update_profile(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    payload: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, ApiError> {
    let profile = profiles::update(&state.db, &auth.user_id, &payload)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "profile updated",
        "data": { "user": Profile::from(profile) }
    })))
}

async fn logout() -> HttpResponse {
    // Tokens are stateless; the client drops its copy.
    HttpResponse::Ok().json(json!({ "message": "logged out" }))
}
