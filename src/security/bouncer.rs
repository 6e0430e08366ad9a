use super::auth::{AuthError, Role};
use crate::core::UserId;
use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Identity attached to an authenticated request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenData {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

impl TokenData {
    pub fn is_administrator(&self) -> bool {
        self.role.is_administrator()
    }
}

/// Resolves the caller of an HTTP request
#[async_trait]
pub trait RequestBouncer: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<TokenData, AuthError>;
}

/// Username and password carried in an `Authorization: Basic` header
pub(crate) struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Result<Self, AuthError> {
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingCredentials)?
            .to_str()
            .map_err(|_| AuthError::MalformedCredentials)?;

        let encoded = value
            .strip_prefix("Basic ")
            .ok_or(AuthError::MalformedCredentials)?;
        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|_| AuthError::MalformedCredentials)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MalformedCredentials)?;

        let (username, password) = decoded
            .split_once(':')
            .ok_or(AuthError::MalformedCredentials)?;

        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// Builds an `Authorization` header value for HTTP Basic
pub fn basic_auth_header(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}
