//! Wire types for the remote catalog/order API.
//!
//! These mirror the API's JSON exactly and are converted into the domain
//! models in [`crate::models`] by [`super::conversions`]. Field aliases
//! accept both the camelCase and snake_case spellings the API has used.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Responses
// =============================================================================

/// Product as returned by `GET /products` and `GET /products/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    #[serde(default, rename = "imageUrl", alias = "image_url")]
    pub image_url: Option<String>,
    #[serde(alias = "categoryId")]
    pub category_id: String,
    /// Denormalised category name.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub measurements: Option<String>,
    #[serde(default, rename = "quantity", alias = "quantityAvailable", alias = "quantity_available")]
    pub quantity: i64,
}

/// Category as returned by `GET /categories`.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRecord {
    pub id: String,
    pub name: String,
}

/// Review as returned by `GET /products/{id}/reviews`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRecord {
    pub id: String,
    #[serde(alias = "productId")]
    pub product_id: String,
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
    #[serde(alias = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// User as embedded in auth responses.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

/// Body of a successful `POST /auth/signin` or `/auth/signup`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub user: UserRecord,
    #[serde(default, alias = "accessToken", alias = "access_token")]
    pub token: Option<String>,
}

/// Error body returned with any non-2xx status.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

// =============================================================================
// Requests
// =============================================================================

/// `POST /auth/signin`.
#[derive(Debug, Serialize)]
pub struct SignInRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// `POST /auth/signup`.
#[derive(Debug, Serialize)]
pub struct SignUpRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: String,
}

/// `POST /products/{id}/reviews`.
#[derive(Debug, Serialize)]
pub struct ReviewRequest<'a> {
    pub rating: u8,
    pub comment: &'a str,
}

/// `POST /cart/items`: absolute quantity for one product; 0 removes it.
#[derive(Debug, Serialize)]
pub struct CartItemRequest<'a> {
    pub product_id: &'a str,
    pub quantity: u32,
    pub request_id: &'a str,
}

/// `POST /wishlist/items`: whether the product is saved.
#[derive(Debug, Serialize)]
pub struct WishlistItemRequest<'a> {
    pub product_id: &'a str,
    pub saved: bool,
    pub request_id: &'a str,
}
