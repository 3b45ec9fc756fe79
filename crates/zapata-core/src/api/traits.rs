//! Network seam used by the session coordinator.

use async_trait::async_trait;

use crate::auth::AuthError;
use crate::models::{LoginRequest, RegisterRequest, User};

/// Token and account returned by a successful login or register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

/// Remote auth endpoints.
///
/// Implemented over HTTP by [`super::ApiClient`]; tests substitute their own.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /login`
    async fn login(&self, request: &LoginRequest) -> Result<AuthSession, AuthError>;

    /// `POST /register`
    async fn register(&self, request: &RegisterRequest) -> Result<AuthSession, AuthError>;

    /// `GET /verify-token` with `token` as bearer; returns the server's view
    /// of the account.
    async fn verify_token(&self, token: &str) -> Result<User, AuthError>;
}
