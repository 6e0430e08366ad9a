//! HTTP surface of the registry.
//!
//! Handlers map one request onto one store operation. Every failure is turned
//! into a JSON [`ErrorResponse`] by [`WebError`].

pub mod access;
pub mod app;
pub mod handlers;
pub mod models;
pub mod state;

use crate::core::StoreError;
use crate::security::AuthError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

pub use access::{AdministratorAccess, RestrictedAccess};
pub use app::build_router;
pub use state::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug)]
pub enum WebError {
    InvalidJson(String),
    InvalidRequestFormat(String),
    InvalidId(String),
    NotFound,
    ManagementDisabled,
    Unauthorized(AuthError),
    Forbidden,
    Store(StoreError),
    Internal(String),
}

impl From<StoreError> for WebError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => WebError::NotFound,
            err => WebError::Store(err),
        }
    }
}

impl From<AuthError> for WebError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Hashing(_) | AuthError::Interrupted(_) => WebError::Internal(err.to_string()),
            err => WebError::Unauthorized(err),
        }
    }
}

impl WebError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebError::InvalidJson(_) | WebError::InvalidRequestFormat(_) | WebError::InvalidId(_) => {
                StatusCode::BAD_REQUEST
            }
            WebError::NotFound => StatusCode::NOT_FOUND,
            WebError::ManagementDisabled => StatusCode::SERVICE_UNAVAILABLE,
            WebError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            WebError::Forbidden => StatusCode::FORBIDDEN,
            WebError::Store(_) | WebError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, code) = match self {
            WebError::InvalidJson(msg) => (msg, "invalid_json"),
            WebError::InvalidRequestFormat(msg) => (msg, "invalid_request_format"),
            WebError::InvalidId(raw) => (format!("invalid command id '{raw}'"), "invalid_id"),
            WebError::NotFound => ("command not found".to_string(), "not_found"),
            WebError::ManagementDisabled => (
                "command management is disabled".to_string(),
                "management_disabled",
            ),
            WebError::Unauthorized(err) => (err.to_string(), "unauthorized"),
            WebError::Forbidden => (
                "administrator access required".to_string(),
                "forbidden",
            ),
            WebError::Store(err) => {
                error!(error = %err, "command store failure");
                (err.to_string(), "store_error")
            }
            WebError::Internal(msg) => {
                error!(error = %msg, "request failed");
                ("internal server error".to_string(), "internal_error")
            }
        };

        let mut response = (
            status,
            Json(ErrorResponse {
                error: message,
                code: code.to_string(),
            }),
        )
            .into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Basic realm=\"command-registry\""),
            );
        }
        response
    }
}

pub type Result<T> = std::result::Result<T, WebError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_maps_to_404() {
        assert_eq!(WebError::from(StoreError::NotFound).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_other_store_errors_map_to_500() {
        let err = WebError::from(StoreError::Corrupted("bad record".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unauthorized_sets_challenge_header() {
        let response = WebError::from(AuthError::MissingCredentials).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(axum::http::header::WWW_AUTHENTICATE));
    }

    #[test]
    fn test_broken_password_check_is_a_server_error() {
        let err = WebError::from(AuthError::Hashing(bcrypt::BcryptError::CostNotAllowed(40)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.into_response().headers().contains_key(axum::http::header::WWW_AUTHENTICATE));
    }
}
