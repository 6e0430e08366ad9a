use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::debug;

use super::{AppState, WebError};
use crate::security::TokenData;

/// Any authenticated caller.
#[derive(Debug, Clone)]
pub struct RestrictedAccess(pub TokenData);

/// An authenticated caller holding the administrator role.
#[derive(Debug, Clone)]
pub struct AdministratorAccess(pub TokenData);

#[async_trait]
impl FromRequestParts<AppState> for RestrictedAccess {
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = state.bouncer.authenticate(&parts.headers).await.map_err(|err| {
            debug!(error = %err, path = %parts.uri.path(), "request rejected");
            WebError::from(err)
        })?;
        Ok(Self(token))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdministratorAccess {
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let RestrictedAccess(token) = RestrictedAccess::from_request_parts(parts, state).await?;
        if !token.is_administrator() {
            debug!(user = %token.username, path = %parts.uri.path(), "administrator access denied");
            return Err(WebError::Forbidden);
        }
        Ok(Self(token))
    }
}
