//! REST API client module for the footing calculation backend.
//!
//! This module provides the `ApiClient` for the auth endpoints
//! (`/login`, `/register`, `/verify-token`) and the four footing
//! calculation endpoints, plus the `AuthApi` trait the session
//! coordinator talks to.
//!
//! The API uses JWT bearer token authentication; the token is read
//! from the persisted `TokenStore` for every protected request.

pub mod client;
pub mod error;
pub mod traits;

pub use client::{is_public_url, ApiClient, PUBLIC_URLS};
pub use error::ApiError;
pub use traits::{AuthApi, AuthSession};
