//! HTTP client for the auth and calculation endpoints.
//!
//! Requests to non-public URLs carry `Authorization: Bearer <token>` read
//! from the [`TokenStore`]. A 401 on such a request means the stored token is
//! no longer accepted, so the store is cleared before the error is returned.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::traits::{AuthApi, AuthSession};
use super::ApiError;
use crate::auth::{AuthError, TokenStore};
use crate::models::{CalculationRequest, CalculationResponse, LoginRequest, RegisterRequest, User};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// Calculations on the hosted backend can take a while on a cold start.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// URL fragments that never receive a bearer token.
pub const PUBLIC_URLS: [&str; 5] = [
    "/api/login",
    "/api/register",
    "/api/health",
    "/api/forgot-password",
    "/api/reset-password",
];

#[derive(Debug, Deserialize)]
struct AuthResponse {
    data: AuthData,
}

#[derive(Debug, Deserialize)]
struct AuthData {
    token: String,
    user: User,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    success: bool,
    data: Option<VerifyData>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    user: Option<User>,
}

/// Whether `url` is on the public allow-list.
pub fn is_public_url(url: &str) -> bool {
    PUBLIC_URLS.iter().any(|public| url.contains(public))
}

/// API client for the footing calculation backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: TokenStore,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, store: TokenStore) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Attach the stored bearer token unless the URL is public.
    fn authorize(&self, builder: RequestBuilder, url: &str) -> RequestBuilder {
        if is_public_url(url) {
            return builder;
        }
        match self.store.load() {
            Some(token) => builder
                .bearer_auth(token)
                .header(header::CONTENT_TYPE, "application/json"),
            None => builder,
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send a request and apply the session-expiry rule for protected URLs.
    async fn send(&self, builder: RequestBuilder, url: &str) -> Result<Response, ApiError> {
        let response = builder.send().await.map_err(|e| {
            warn!(url, error = %e, "Request failed");
            ApiError::from(e)
        })?;

        match Self::check_response(response).await {
            Ok(response) => Ok(response),
            Err(err) => {
                if matches!(err, ApiError::Unauthorized(_)) && !is_public_url(url) {
                    warn!(url, "Server rejected the stored token; clearing it");
                    self.store.clear();
                }
                warn!(url, status = ?err.status(), message = %err.user_message(), "HTTP error");
                Err(err)
            }
        }
    }

    async fn parse<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
        })
    }

    async fn post_auth<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<AuthSession, AuthError> {
        let url = self.url(path);
        debug!(url = %url, "Sending auth request");
        let builder = self.authorize(self.client.post(&url).json(body), &url);
        let response = self.send(builder, &url).await?;
        let auth: AuthResponse = Self::parse(response, &url).await?;
        Ok(AuthSession {
            token: auth.data.token,
            user: auth.data.user,
        })
    }

    /// `GET /health`; `true` when the backend answers with a success status.
    pub async fn health(&self) -> bool {
        let url = self.url("health");
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "Health check failed");
                false
            }
        }
    }

    /// Run a footing calculation on the backend.
    pub async fn calculate(&self, request: &CalculationRequest) -> Result<CalculationResponse, ApiError> {
        let footing = request.footing;
        let url = self.url(footing.endpoint());
        debug!(
            url = %url,
            footing = %footing,
            params = request.params.len(),
            bars = request.bars.len(),
            "Requesting calculation"
        );

        let builder = self.authorize(self.client.post(&url).json(&request.body()), &url);
        let response = self.send(builder, &url).await?;
        let result: CalculationResponse = Self::parse(response, &url).await?;

        if result.is_error() {
            let message = result
                .message
                .clone()
                .unwrap_or_else(|| "Calculation error".to_string());
            warn!(footing = %footing, message = %message, "Calculation rejected by server");
            return Err(ApiError::Calculation {
                message,
                details: result.details,
            });
        }
        Ok(result)
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, request: &LoginRequest) -> Result<AuthSession, AuthError> {
        self.post_auth("login", request).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthSession, AuthError> {
        self.post_auth("register", request).await
    }

    async fn verify_token(&self, token: &str) -> Result<User, AuthError> {
        let url = self.url("verify-token");
        let builder = self.client.get(&url).bearer_auth(token);
        let response = self.send(builder, &url).await?;
        let body: VerifyResponse = Self::parse(response, &url).await?;

        match body.data.and_then(|d| d.user) {
            Some(user) if body.success => Ok(user),
            _ => Err(AuthError::InvalidResponse("Invalid server response".to_string())),
        }
    }
}
