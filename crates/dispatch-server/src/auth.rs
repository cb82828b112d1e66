//! Bearer-token presence check (spec §1 "user registration/login and
//! token minting" is out of scope; the engine only checks token
//! *presence*, carried here). No signature verification, no session
//! lookup — just a `Bearer` header extractor, deliberately thin because
//! `token_secret` is "read but not otherwise implemented" (spec §6, §9).

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;

pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Auth)?;

        let token = header.strip_prefix("Bearer ").ok_or(AppError::Auth)?;
        if token.trim().is_empty() {
            return Err(AppError::Auth);
        }

        Ok(BearerToken(token.to_string()))
    }
}
