//! Catalog domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use comfycube_core::{CategoryId, Price, ProductId, Rating, ReviewId, UserId};

/// A product as last fetched from the catalog.
///
/// Read-only and possibly stale; the remote catalog owns the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Price,
    /// Primary image URL.
    pub image_url: Option<String>,
    /// Owning category.
    pub category_id: CategoryId,
    /// Category display name, when the API denormalises it.
    pub category_name: Option<String>,
    /// Long-form description.
    pub description: String,
    /// Free-text dimensions (e.g. "W 220 x D 95 x H 80 cm").
    pub measurements: Option<String>,
    /// Units in stock at fetch time.
    pub quantity_available: u32,
}

impl Product {
    /// Stock level below which the product detail shows "Only N left".
    pub const LOW_STOCK_THRESHOLD: u32 = 10;

    /// Whether at least one unit can be added to a cart.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.quantity_available > 0
    }

    /// Remaining units when stock is low, `None` otherwise.
    #[must_use]
    pub const fn low_stock(&self) -> Option<u32> {
        if self.quantity_available < Self::LOW_STOCK_THRESHOLD {
            Some(self.quantity_available)
        } else {
            None
        }
    }
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Category ID.
    pub id: CategoryId,
    /// Display name.
    pub name: String,
}

/// A customer review of a product. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Review ID.
    pub id: ReviewId,
    /// Reviewed product.
    pub product_id: ProductId,
    /// Author, absent for anonymised reviews.
    pub user_id: Option<UserId>,
    /// Star rating.
    pub rating: Rating,
    /// Review text.
    pub comment: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}
