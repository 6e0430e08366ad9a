use super::bouncer::{Credentials, RequestBouncer, TokenData};
use crate::core::UserId;
use async_trait::async_trait;
use axum::http::HeaderMap;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing credentials")]
    MissingCredentials,

    #[error("Malformed credentials")]
    MalformedCredentials,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("User '{0}' already exists")]
    UserExists(String),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("Password check did not complete: {0}")]
    Interrupted(#[from] tokio::task::JoinError),
}

/// Authorization tier of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Administrator,
    Standard,
}

impl Role {
    #[inline]
    pub fn is_administrator(self) -> bool {
        self == Role::Administrator
    }
}

/// User account
#[derive(Debug, Clone)]
pub struct User {
    id: UserId,
    username: String,
    password_hash: String,
    role: Role,
}

impl User {
    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

/// Account store and HTTP Basic bouncer
///
/// Passwords are kept as bcrypt hashes. Hashing and verification run on the
/// blocking pool, so a slow cost never stalls the async workers.
pub struct AuthManager {
    users: RwLock<HashMap<String, User>>,
    next_id: RwLock<u64>,
    cost: u32,
}

impl AuthManager {
    /// Creates a manager holding a single administrator
    pub fn with_admin(username: &str, password: &str, cost: u32) -> Result<Self, AuthError> {
        Self::validate_username(username)?;
        Self::validate_password(password)?;

        let admin = User {
            id: UserId(1),
            username: username.to_string(),
            password_hash: bcrypt::hash(password, cost)?,
            role: Role::Administrator,
        };

        let mut users = HashMap::new();
        users.insert(username.to_string(), admin);

        Ok(Self {
            users: RwLock::new(users),
            next_id: RwLock::new(2),
            cost,
        })
    }

    /// Authenticates a user
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let user = {
            let users = self.users.read().await;
            users
                .get(username)
                .cloned()
                .ok_or(AuthError::InvalidCredentials)?
        };

        let password = password.to_string();
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false)).await?;
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Creates a new user and returns its id
    pub async fn create_user(&self, username: &str, password: &str, role: Role) -> Result<UserId, AuthError> {
        Self::validate_username(username)?;
        Self::validate_password(password)?;
        let password = password.to_string();
        let cost = self.cost;
        let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;

        let mut users = self.users.write().await;
        if users.contains_key(username) {
            return Err(AuthError::UserExists(username.to_string()));
        }

        let id = {
            let mut next_id = self.next_id.write().await;
            let id = UserId(*next_id);
            *next_id += 1;
            id
        };

        users.insert(
            username.to_string(),
            User {
                id,
                username: username.to_string(),
                password_hash,
                role,
            },
        );
        Ok(id)
    }

    fn validate_username(username: &str) -> Result<(), AuthError> {
        if username.is_empty() {
            return Err(AuthError::InvalidUsername("cannot be empty".into()));
        }
        if username.len() > 50 {
            return Err(AuthError::InvalidUsername("too long (max 50 characters)".into()));
        }
        if username.contains(':') {
            return Err(AuthError::InvalidUsername("cannot contain ':'".into()));
        }
        Ok(())
    }

    fn validate_password(password: &str) -> Result<(), AuthError> {
        if password.len() < 8 {
            return Err(AuthError::InvalidPassword("must be at least 8 characters long".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RequestBouncer for AuthManager {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<TokenData, AuthError> {
        let credentials = Credentials::from_headers(headers)?;
        let user = AuthManager::authenticate(self, &credentials.username, &credentials.password).await?;

        Ok(TokenData {
            user_id: user.id(),
            username: user.username().to_string(),
            role: user.role(),
        })
    }
}
