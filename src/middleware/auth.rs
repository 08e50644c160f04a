use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, Error, FromRequest, HttpRequest};
use async_trait::async_trait;
use futures::future::LocalBoxFuture;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// Token verification capability.
///
/// The core never depends on a signing scheme; whatever issues tokens only
/// has to hand us something that maps a bearer token to a user id.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Uuid, AppError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// HS256 verifier matching the tokens the auth service issues.
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Uuid, AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| AppError::Unauthorized)?;
        Uuid::parse_str(&data.claims.sub).map_err(|_| AppError::Unauthorized)
    }
}

/// Pull the bearer token out of the Authorization header.
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Authenticated user for REST handlers.
///
/// Extraction fails with 401 when the token is missing or invalid; no
/// detail about the failure reason is exposed.
#[derive(Debug, Clone, Copy)]
pub struct AuthedUser {
    pub id: Uuid,
}

impl FromRequest for AuthedUser {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req);

        Box::pin(async move {
            let state = state.ok_or(AppError::Internal)?;
            let token = token.ok_or(AppError::Unauthorized)?;
            let id = state.verifier.verify(&token).await?;
            Ok(AuthedUser { id })
        })
    }
}
