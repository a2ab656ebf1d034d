//! Conversions from wire records to domain models.
//!
//! Conversions validate what the remote sends; a record that violates a
//! domain invariant (negative price, rating outside 1..=5, malformed email)
//! surfaces as [`ApiError::InvalidPayload`].

use comfycube_core::{CategoryId, Email, Price, ProductId, Rating, ReviewId, Role, UserId};

use super::ApiError;
use super::types::{AuthResponse, CategoryRecord, ProductRecord, ReviewRecord, UserRecord};
use crate::models::{AuthSession, Category, Product, Review, User};

pub fn convert_product(record: ProductRecord) -> Result<Product, ApiError> {
    let price = Price::new(record.price).map_err(|e| {
        ApiError::InvalidPayload(format!("product {}: {e}", record.id))
    })?;

    Ok(Product {
        id: ProductId::new(record.id),
        name: record.name,
        price,
        image_url: record.image_url.filter(|url| !url.is_empty()),
        category_id: CategoryId::new(record.category_id),
        category_name: record.category.filter(|name| !name.is_empty()),
        description: record.description.unwrap_or_default(),
        measurements: record.measurements.filter(|m| !m.is_empty()),
        // Negative stock from the API means "none left"
        quantity_available: u32::try_from(record.quantity.max(0)).unwrap_or(u32::MAX),
    })
}

pub fn convert_products(records: Vec<ProductRecord>) -> Result<Vec<Product>, ApiError> {
    records.into_iter().map(convert_product).collect()
}

pub fn convert_category(record: CategoryRecord) -> Category {
    Category {
        id: CategoryId::new(record.id),
        name: record.name,
    }
}

pub fn convert_review(record: ReviewRecord) -> Result<Review, ApiError> {
    let rating = Rating::new(record.rating)
        .map_err(|e| ApiError::InvalidPayload(format!("review {}: {e}", record.id)))?;

    Ok(Review {
        id: ReviewId::new(record.id),
        product_id: ProductId::new(record.product_id),
        user_id: record.user_id.map(UserId::new),
        rating,
        comment: record.comment,
        created_at: record.created_at,
    })
}

pub fn convert_user(record: UserRecord) -> Result<User, ApiError> {
    let email = Email::parse(&record.email)
        .map_err(|e| ApiError::InvalidPayload(format!("user {}: {e}", record.id)))?;
    let role = record
        .role
        .parse::<Role>()
        .map_err(|e| ApiError::InvalidPayload(format!("user {}: {e}", record.id)))?;

    Ok(User {
        id: UserId::new(record.id),
        name: record.name,
        email,
        role,
    })
}

pub fn convert_auth_response(response: AuthResponse) -> Result<AuthSession, ApiError> {
    Ok(AuthSession {
        user: convert_user(response.user)?,
        access_token: response
            .token
            .filter(|t| !t.is_empty())
            .map(secrecy::SecretString::from),
    })
}
