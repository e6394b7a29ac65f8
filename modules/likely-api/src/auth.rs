use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use likely_common::ActorId;
use thiserror::Error;

use crate::error::ApiError;
use crate::jwt::JwtService;
use crate::AppState;

/// Why a request carried no usable identity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthRejection {
    #[error("Authorization header is required.")]
    MissingHeader,

    #[error("Invalid authorization header.")]
    MalformedHeader,

    #[error("Unsupported authorization scheme.")]
    UnsupportedScheme,

    #[error("Invalid authorization token.")]
    InvalidToken,
}

impl From<AuthRejection> for ApiError {
    fn from(rejection: AuthRejection) -> Self {
        ApiError::unauthorized(rejection.to_string())
    }
}

/// Resolve an `Authorization` header value to a verified actor id.
pub fn authenticate(jwt: &JwtService, header: Option<&str>) -> Result<ActorId, AuthRejection> {
    let header = header.ok_or(AuthRejection::MissingHeader)?;

    let parts: Vec<&str> = header.split(' ').collect();
    let [scheme, token] = parts.as_slice() else {
        return Err(AuthRejection::MalformedHeader);
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthRejection::UnsupportedScheme);
    }

    jwt.verify_token(token)
        .and_then(|claims| claims.actor_id())
        .map_err(|_| AuthRejection::InvalidToken)
}

/// Authenticated caller. Extract this in handlers that act on behalf of an actor.
pub struct AuthedActor(pub ActorId);

impl FromRequestParts<Arc<AppState>> for AuthedActor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        authenticate(&state.jwt, header)
            .map(AuthedActor)
            .map_err(|rejection| {
                tracing::debug!(%rejection, "Rejected request");
                rejection.into()
            })
    }
}
