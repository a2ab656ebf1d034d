//! Cache types for catalog responses.

use comfycube_core::ProductId;

use crate::models::{Category, Product, Review};

/// Cache key for catalog resources.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products,
    Product(ProductId),
    Categories,
    Reviews(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Vec<Product>),
    Product(Box<Product>),
    Categories(Vec<Category>),
    Reviews(Vec<Review>),
}
