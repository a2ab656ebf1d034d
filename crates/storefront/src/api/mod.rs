//! HTTP client for the remote catalog/order API.
//!
//! # Architecture
//!
//! - `reqwest` with a per-request timeout and optional `x-api-key` header
//! - Every response body is read as text first for better error diagnostics
//! - Non-2xx responses are mapped to [`ApiError`] by status:
//!   401/403 → `Unauthorized`, 404 → `NotFound`, 409 → `Conflict`,
//!   anything else → `Status`
//! - No automatic retry; the caller decides
//!
//! Higher-level facades ([`crate::catalog::CatalogClient`],
//! [`crate::session::RemoteAuth`], [`crate::state::Storefront`]) build on the
//! typed endpoint methods in this module.

pub mod conversions;
pub mod types;

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use comfycube_core::ProductId;

use crate::config::{ApiConfig, api_key_header};
use types::{
    AuthResponse, CartItemRequest, CategoryRecord, ErrorBody, ProductRecord, ReviewRecord,
    ReviewRequest, SignInRequest, SignUpRequest, WishlistItemRequest,
};

/// Longest slice of a response body copied into logs and error messages.
const MAX_LOGGED_BODY: usize = 500;

/// Errors that can occur when talking to the remote API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// 401 or 403.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 404.
    #[error("Not found: {0}")]
    NotFound(String),

    /// 409.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other non-success status.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Body parsed but violates a domain invariant.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Endpoint path could not be joined onto the base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Client for the remote catalog/order API.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));

        if let Some(key) = api_key_header(config) {
            let mut value = HeaderValue::from_str(key)
                .map_err(|e| ApiError::InvalidPayload(format!("Invalid API key format: {e}")))?;
            value.set_sensitive(true);
            headers.insert("x-api-key", value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    /// Base URL every endpoint path is joined onto.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Send a request and return the body of a 2xx response.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        token: Option<&str>,
    ) -> Result<String, ApiError> {
        let url = self.endpoint(path)?;
        let mut request = self.inner.client.request(method.clone(), url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let text = response.text().await?;

        if status.is_success() {
            debug!(%method, path, %status, "API request succeeded");
            return Ok(text);
        }

        let message = error_message(&text, status);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Unauthorized(message)),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(message)),
            StatusCode::CONFLICT => Err(ApiError::Conflict(message)),
            _ => {
                tracing::error!(
                    %method,
                    path,
                    status = %status,
                    body = %truncate(&text),
                    "API returned non-success status"
                );
                Err(ApiError::Status {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, token: Option<&str>) -> Result<T, ApiError> {
        let text = self.send::<()>(Method::GET, path, None, token).await?;
        parse_body(&text)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        let text = self.send(Method::POST, path, Some(body), token).await?;
        parse_body(&text)
    }

    async fn post_ignoring_body<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<(), ApiError> {
        self.send(Method::POST, path, Some(body), token).await?;
        Ok(())
    }

    // =========================================================================
    // Catalog endpoints
    // =========================================================================

    /// `GET /products`
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not parse.
    #[instrument(skip(self))]
    pub async fn fetch_products(&self) -> Result<Vec<ProductRecord>, ApiError> {
        self.get("products", None).await
    }

    /// `GET /products/{id}`
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown id.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn fetch_product(&self, id: &ProductId) -> Result<ProductRecord, ApiError> {
        self.get(&format!("products/{}", encode_segment(id.as_str())), None)
            .await
    }

    /// `GET /categories`
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not parse.
    #[instrument(skip(self))]
    pub async fn fetch_categories(&self) -> Result<Vec<CategoryRecord>, ApiError> {
        self.get("categories", None).await
    }

    /// `GET /products/{id}/reviews`
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body does not parse.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn fetch_reviews(&self, id: &ProductId) -> Result<Vec<ReviewRecord>, ApiError> {
        self.get(
            &format!("products/{}/reviews", encode_segment(id.as_str())),
            None,
        )
        .await
    }

    /// `POST /products/{id}/reviews`
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the token is rejected.
    #[instrument(skip(self, request, token), fields(product_id = %id))]
    pub async fn create_review(
        &self,
        id: &ProductId,
        request: &ReviewRequest<'_>,
        token: &str,
    ) -> Result<ReviewRecord, ApiError> {
        self.post(
            &format!("products/{}/reviews", encode_segment(id.as_str())),
            request,
            Some(token),
        )
        .await
    }

    // =========================================================================
    // Auth endpoints
    // =========================================================================

    /// `POST /auth/signin`
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for invalid credentials.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn sign_in(&self, request: &SignInRequest<'_>) -> Result<AuthResponse, ApiError> {
        self.post("auth/signin", request, None).await
    }

    /// `POST /auth/signup`
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Conflict` if the email is already registered.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn sign_up(&self, request: &SignUpRequest<'_>) -> Result<AuthResponse, ApiError> {
        self.post("auth/signup", request, None).await
    }

    // =========================================================================
    // Cart and wishlist endpoints
    // =========================================================================

    /// `POST /cart/items`
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the token is rejected.
    #[instrument(skip(self, request, token), fields(product_id = %request.product_id, quantity = request.quantity))]
    pub async fn put_cart_item(
        &self,
        request: &CartItemRequest<'_>,
        token: &str,
    ) -> Result<(), ApiError> {
        self.post_ignoring_body("cart/items", request, Some(token))
            .await
    }

    /// `POST /wishlist/items`
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the token is rejected.
    #[instrument(skip(self, request, token), fields(product_id = %request.product_id, saved = request.saved))]
    pub async fn put_wishlist_item(
        &self,
        request: &WishlistItemRequest<'_>,
        token: &str,
    ) -> Result<(), ApiError> {
        self.post_ignoring_body("wishlist/items", request, Some(token))
            .await
    }
}

fn parse_body<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    serde_json::from_str(text).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %truncate(text),
            "Failed to parse API response"
        );
        ApiError::Parse(e)
    })
}

/// Prefer the `{message}` body; fall back to the status reason.
fn error_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        })
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_LOGGED_BODY).collect()
}

/// Percent-encode an id for use as a single path segment.
fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_body() {
        assert_eq!(
            error_message(r#"{"message":"Invalid login credentials"}"#, StatusCode::UNAUTHORIZED),
            "Invalid login credentials"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_reason() {
        assert_eq!(
            error_message("<html>oops</html>", StatusCode::BAD_GATEWAY),
            "Bad Gateway"
        );
        assert_eq!(
            error_message(r#"{"message":""}"#, StatusCode::NOT_FOUND),
            "Not Found"
        );
    }

    #[test]
    fn test_endpoint_joins_under_base_path() {
        let config = ApiConfig::new("https://api.comfycube.test/v1").unwrap();
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint("/products").unwrap().as_str(),
            "https://api.comfycube.test/v1/products"
        );
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("p1"), "p1");
        assert_eq!(encode_segment("a/b c"), "a%2Fb%20c");
    }

    #[test]
    fn test_invalid_api_key_header_is_rejected() {
        let mut config = ApiConfig::new("https://api.comfycube.test").unwrap();
        config.api_key = Some(secrecy::SecretString::from("bad\nkey"));
        assert!(matches!(
            ApiClient::new(&config),
            Err(ApiError::InvalidPayload(_))
        ));
    }
}
