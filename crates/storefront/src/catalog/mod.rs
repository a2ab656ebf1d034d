//! Catalog client: read-only facade over products, categories and reviews.
//!
//! Caches list and detail responses using `moka` (TTL from
//! [`ApiConfig::cache_ttl`](crate::config::ApiConfig)). Similar products,
//! featured products and per-category counts are derived from the cached
//! product list rather than fetched separately.

mod cache;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use comfycube_core::{CategoryId, ProductId, Rating};

use crate::api::conversions::{convert_category, convert_product, convert_products, convert_review};
use crate::api::types::ReviewRequest;
use crate::api::{ApiClient, ApiError};
use crate::error::{Result, StorefrontError};
use crate::models::{AuthSession, Category, Product, Review};

pub use cache::{CacheKey, CacheValue};

/// Number of similar products shown on a product page.
pub const SIMILAR_PRODUCTS_LIMIT: usize = 4;

/// Number of featured products shown on the home page.
pub const FEATURED_PRODUCTS_LIMIT: usize = 4;

/// Client for catalog reads and review submission.
///
/// Cheaply cloneable via `Arc`; clones share one cache.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    api: ApiClient,
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogClient {
    /// Create a catalog client over `api` with the given cache TTL.
    #[must_use]
    pub fn new(api: ApiClient, cache_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(cache_ttl)
            .build();

        Self {
            inner: Arc::new(CatalogClientInner { api, cache }),
        }
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// List all products in server order.
    ///
    /// # Errors
    ///
    /// Returns `Network` or `Server` errors from the API.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for product list");
            return Ok(products);
        }

        let records = self.inner.api.fetch_products().await?;
        let products = convert_products(records)?;

        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get a product by its ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the catalog has no such product.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product> {
        let cache_key = CacheKey::Product(id.clone());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let record = self.inner.api.fetch_product(id).await.map_err(|e| match e {
            ApiError::NotFound(_) => StorefrontError::NotFound(format!("product {id}")),
            other => other.into(),
        })?;
        let product = convert_product(record)?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Products sharing `category_id`, excluding `exclude_id`.
    ///
    /// Keeps the server's product order; `limit` caps the result.
    ///
    /// # Errors
    ///
    /// Returns `Network` or `Server` errors from the API.
    #[instrument(skip(self), fields(category_id = %category_id, exclude_id = %exclude_id))]
    pub async fn list_similar(
        &self,
        category_id: &CategoryId,
        exclude_id: &ProductId,
        limit: Option<usize>,
    ) -> Result<Vec<Product>> {
        let products = self.list_products().await?;
        Ok(similar_products(products, category_id, exclude_id, limit))
    }

    /// The first `count` products, as shown on the home page.
    ///
    /// # Errors
    ///
    /// Returns `Network` or `Server` errors from the API.
    pub async fn featured(&self, count: usize) -> Result<Vec<Product>> {
        let mut products = self.list_products().await?;
        products.truncate(count);
        Ok(products)
    }

    // =========================================================================
    // Category Methods
    // =========================================================================

    /// List all categories.
    ///
    /// # Errors
    ///
    /// Returns `Network` or `Server` errors from the API.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for category list");
            return Ok(categories);
        }

        let records = self.inner.api.fetch_categories().await?;
        let categories: Vec<Category> = records.into_iter().map(convert_category).collect();

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;

        Ok(categories)
    }

    /// Number of products in each category.
    ///
    /// Categories without products are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns `Network` or `Server` errors from the API.
    pub async fn category_counts(&self) -> Result<HashMap<CategoryId, usize>> {
        let products = self.list_products().await?;
        Ok(count_by_category(&products))
    }

    // =========================================================================
    // Review Methods
    // =========================================================================

    /// List reviews for a product.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn list_reviews(&self, product_id: &ProductId) -> Result<Vec<Review>> {
        let cache_key = CacheKey::Reviews(product_id.clone());

        if let Some(CacheValue::Reviews(reviews)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for reviews");
            return Ok(reviews);
        }

        let records = self
            .inner
            .api
            .fetch_reviews(product_id)
            .await
            .map_err(|e| match e {
                ApiError::NotFound(_) => StorefrontError::NotFound(format!("product {product_id}")),
                other => other.into(),
            })?;
        let reviews = records
            .into_iter()
            .map(convert_review)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Reviews(reviews.clone()))
            .await;

        Ok(reviews)
    }

    /// Submit a review as the signed-in user.
    ///
    /// Rating and comment are validated before any network call. On success
    /// the product's cached review list is dropped.
    ///
    /// # Errors
    ///
    /// Returns `Auth` without a session (or with one the remote cannot
    /// authenticate), `Validation` for a bad rating or empty comment.
    #[instrument(skip(self, session, comment), fields(product_id = %product_id))]
    pub async fn submit_review(
        &self,
        session: Option<&AuthSession>,
        product_id: &ProductId,
        rating: i64,
        comment: &str,
    ) -> Result<Review> {
        let session = session
            .ok_or_else(|| StorefrontError::Auth("Sign in to write a review.".to_string()))?;
        let token = session.bearer().ok_or_else(|| {
            StorefrontError::Auth("Sign in with a store account to write a review.".to_string())
        })?;

        let rating = Rating::new(rating)?;
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(StorefrontError::Validation(
                "review comment cannot be empty".to_string(),
            ));
        }

        let request = ReviewRequest {
            rating: rating.value(),
            comment,
        };
        let record = self
            .inner
            .api
            .create_review(product_id, &request, token)
            .await
            .map_err(|e| match e {
                ApiError::NotFound(_) => StorefrontError::NotFound(format!("product {product_id}")),
                other => other.into(),
            })?;
        let review = convert_review(record)?;

        self.inner
            .cache
            .invalidate(&CacheKey::Reviews(product_id.clone()))
            .await;

        Ok(review)
    }

    /// Drop every cached response.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

fn similar_products(
    products: Vec<Product>,
    category_id: &CategoryId,
    exclude_id: &ProductId,
    limit: Option<usize>,
) -> Vec<Product> {
    products
        .into_iter()
        .filter(|p| &p.category_id == category_id && &p.id != exclude_id)
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

fn count_by_category(products: &[Product]) -> HashMap<CategoryId, usize> {
    let mut counts = HashMap::new();
    for product in products {
        *counts.entry(product.category_id.clone()).or_insert(0) += 1;
    }
    counts
}
