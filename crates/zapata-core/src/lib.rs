//! Core library for zapata, the footing calculator client.
//!
//! - `auth`: session state coordinator, token codec and persistence
//! - `api`: HTTP client for the auth and calculation endpoints
//! - `models`: account and calculation types
//! - `config`: user configuration
//! - `utils`: numeric input evaluation and formatting

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError, AuthApi};
pub use auth::{AccessGate, AuthError, AuthState, SessionCoordinator, TokenStore};
pub use config::Config;
pub use models::{
    CalculationParams, CalculationRequest, CalculationResponse, Footing, LoginRequest,
    RegisterRequest, User,
};
