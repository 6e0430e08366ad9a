// ============================================================================
// Security Module - accounts and request authentication
// ============================================================================

pub mod auth;
pub mod bouncer;

pub use auth::{AuthError, AuthManager, Role, User};
pub use bouncer::{basic_auth_header, RequestBouncer, TokenData};
