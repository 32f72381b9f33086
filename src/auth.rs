use actix_web::{dev::ServiceRequest, http::header::Header, web, Error, HttpMessage, HttpRequest};
use actix_web_httpauth::{
    extractors::bearer::BearerAuth,
    headers::authorization::{Authorization, Bearer},
};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{errors::ApiError, models::ProfileRow, state::{AppState, JwtConfig}};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub is_admin: bool,
    pub refresh: bool,
    pub iat: i64,
    pub exp: i64,
}

/// Identity attached to a request once its token has been verified.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            is_admin: claims.is_admin,
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| ApiError::PasswordHash)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(hash) => Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok(),
        Err(_) => false,
    }
}

pub fn issue_token(cfg: &JwtConfig, profile: &ProfileRow, refresh: bool) -> Result<String, ApiError> {
    let ttl_hours = if refresh {
        cfg.refresh_ttl_hours
    } else {
        cfg.access_ttl_hours
    };
    let now = Utc::now();
    let claims = Claims {
        sub: profile.user_id.clone(),
        email: profile.email.clone(),
        is_admin: profile.is_admin == 1,
        refresh,
        iat: now.timestamp(),
        exp: (now + Duration::hours(ttl_hours)).timestamp(),
    };
    encode(
        &JwtHeader::default(),
        &claims,
        &EncodingKey::from_secret(cfg.secret.as_bytes()),
    )
    .map_err(|err| ApiError::Internal(format!("token encoding failed: {err}")))
}

pub fn verify_token(cfg: &JwtConfig, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(cfg.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|err| match err.kind() {
        ErrorKind::ExpiredSignature => ApiError::Unauthorized("token expired".to_string()),
        _ => ApiError::Unauthorized("invalid token".to_string()),
    })
}

fn authenticate(req: &ServiceRequest, token: &str) -> Result<AuthUser, ApiError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ApiError::Unauthorized("unauthorized".to_string()))?;
    let claims = verify_token(&state.jwt, token)?;
    if claims.refresh {
        return Err(ApiError::Unauthorized("refresh token not accepted here".to_string()));
    }
    Ok(AuthUser::from(claims))
}

pub async fn bearer_validator(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    match authenticate(&req, credentials.token()) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            Ok(req)
        }
        Err(err) => Err((err.into(), req)),
    }
}

pub async fn admin_validator(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    match authenticate(&req, credentials.token()) {
        Ok(user) => {
            if !user.is_admin {
                return Err((
                    ApiError::Forbidden("admin access required".to_string()).into(),
                    req,
                ));
            }
            req.extensions_mut().insert(user);
            Ok(req)
        }
        Err(err) => Err((err.into(), req)),
    }
}

/// Best-effort identity for routes where a token is welcome but not required.
pub fn identity_from_request(req: &HttpRequest, cfg: &JwtConfig) -> Option<AuthUser> {
    let auth = Authorization::<Bearer>::parse(req).ok()?;
    let claims = verify_token(cfg, auth.into_scheme().token()).ok()?;
    if claims.refresh {
        return None;
    }
    Some(AuthUser::from(claims))
}

pub fn require_user(req: &HttpRequest, cfg: &JwtConfig) -> Result<AuthUser, ApiError> {
    identity_from_request(req, cfg)
        .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))
}

pub fn require_admin(req: &HttpRequest, cfg: &JwtConfig) -> Result<AuthUser, ApiError> {
    let user = require_user(req, cfg)?;
    if !user.is_admin {
        return Err(ApiError::Forbidden("admin access required".to_string()));
    }
    Ok(user)
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_profile(is_admin: i64) -> ProfileRow {
        ProfileRow {
            id: new_id(),
            user_id: new_id(),
            full_name: Some("Test User".to_string()),
            email: "test@example.com".to_string(),
            phone: None,
            avatar_url: None,
            password_hash: String::new(),
            is_admin,
            created_at: Utc::now().to_rfc3339(),
            updated_at: Utc::now().to_rfc3339(),
        }
    }

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "unit-test-secret".to_string(),
            access_ttl_hours: 1,
            refresh_ttl_hours: 2,
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter42").unwrap();
        assert!(verify_password("hunter42", &hash));
        assert!(!verify_password("hunter43", &hash));
    }

    #[test]
    fn verify_password_rejects_garbage_hash() {
        assert!(!verify_password("hunter42", "not-a-phc-string"));
    }

    #[test]
    fn token_round_trip_preserves_claims() {
        let cfg = test_config();
        let profile = test_profile(1);
        let token = issue_token(&cfg, &profile, false).unwrap();
        let claims = verify_token(&cfg, &token).unwrap();
        assert_eq!(claims.sub, profile.user_id);
        assert_eq!(claims.email, profile.email);
        assert!(claims.is_admin);
        assert!(!claims.refresh);
    }

    #[test]
    fn expired_token_is_rejected() {
        let cfg = JwtConfig {
            access_ttl_hours: -2,
            ..test_config()
        };
        let profile = test_profile(0);
        let token = issue_token(&cfg, &profile, false).unwrap();
        let err = verify_token(&cfg, &token).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let cfg = test_config();
        let other = JwtConfig {
            secret: "different-secret".to_string(),
            ..test_config()
        };
        let token = issue_token(&other, &test_profile(0), false).unwrap();
        assert!(verify_token(&cfg, &token).is_err());
    }

    #[test]
    fn refresh_flag_survives_round_trip() {
        let cfg = test_config();
        let token = issue_token(&cfg, &test_profile(0), true).unwrap();
        let claims = verify_token(&cfg, &token).unwrap();
        assert!(claims.refresh);
    }
}
