//! Request extractors that resolve the bearer token into a [`Caller`].
//!
//! The token only carries the identity id that is trusted; the identity itself is reloaded on
//! every request.

use crate::error::ApiError;
use crate::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use medibook_core::{Caller, Identity, RecordId};

/// Caller for routes that need a signed-in user.
///
/// A missing `Authorization` header yields [`Caller::Anonymous`] so that the service reports the
/// missing token. A token that fails verification, or whose identity no longer exists, is
/// rejected with 401.
pub struct Session(pub Caller);

/// Caller for routes that also accept anonymous requests. Any token problem is treated as
/// anonymous.
pub struct OptionalSession(pub Caller);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn resolve(state: &AppState, token: &str) -> Result<Identity, ApiError> {
    let claims = state.tokens.verify(token, state.clock.now()).map_err(|e| {
        tracing::debug!("rejected bearer token: {}", e);
        ApiError::unauthenticated("Not authorized, token failed")
    })?;
    let id = RecordId::parse(&claims.sub)
        .map_err(|_| ApiError::unauthenticated("Not authorized, token failed"))?;

    state
        .services
        .identities
        .get(&id)?
        .ok_or_else(|| ApiError::unauthenticated("Not authorized, user not found"))
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            None => Ok(Session(Caller::Anonymous)),
            Some(token) => {
                resolve(state, token).map(|identity| Session(Caller::Authenticated(identity)))
            }
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for OptionalSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let caller = bearer_token(parts)
            .and_then(|token| resolve(state, token).ok())
            .map_or(Caller::Anonymous, Caller::Authenticated);
        Ok(OptionalSession(caller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: &str) -> Parts {
        let (parts, ()) = Request::builder()
            .header(AUTHORIZATION, header)
            .body(())
            .expect("request")
            .into_parts();
        parts
    }

    #[test]
    fn bearer_token_reads_the_scheme_with_a_space() {
        let parts = parts_with("Bearer abc.def");
        assert_eq!(bearer_token(&parts), Some("abc.def"));
    }

    #[test]
    fn bearer_token_rejects_a_glued_scheme() {
        assert_eq!(bearer_token(&parts_with("Bearerabc.def")), None);
        assert_eq!(bearer_token(&parts_with("Bearer")), None);
        assert_eq!(bearer_token(&parts_with("Bearer   ")), None);
    }
}
