//! Product detail view state.
//!
//! Holds the product being viewed, its similar products and reviews, and the
//! quantity selector. Each navigation issues a fresh ticket; responses that
//! arrive for a product the shopper has already left are dropped.

use tracing::debug;

use comfycube_core::ProductId;

use crate::models::{Product, Review};
use crate::sync::{RequestGuard, Ticket};

/// Selector ceiling while the product has not loaded yet.
pub const DEFAULT_MAX_QUANTITY: u32 = 10;

#[derive(Debug)]
pub struct ProductView {
    guard: RequestGuard<ProductId>,
    active: Option<ProductId>,
    product: Option<Product>,
    similar: Vec<Product>,
    reviews: Vec<Review>,
    quantity: u32,
}

impl ProductView {
    #[must_use]
    pub fn new() -> Self {
        Self {
            guard: RequestGuard::new(),
            active: None,
            product: None,
            similar: Vec::new(),
            reviews: Vec::new(),
            quantity: 1,
        }
    }

    /// Navigate to `id`, clearing whatever was shown before.
    ///
    /// The returned ticket must accompany every response for this visit.
    pub fn begin(&mut self, id: &ProductId) -> Ticket<ProductId> {
        if let Some(previous) = self.active.take() {
            self.guard.cancel(&previous);
        }
        self.product = None;
        self.similar.clear();
        self.reviews.clear();
        self.quantity = 1;
        self.active = Some(id.clone());
        self.guard.issue(id.clone())
    }

    /// Leave the view; outstanding responses become stale.
    pub fn leave(&mut self) {
        if let Some(previous) = self.active.take() {
            self.guard.cancel(&previous);
        }
    }

    /// Whether responses carrying `ticket` still belong to this view.
    #[must_use]
    pub fn is_current(&self, ticket: &Ticket<ProductId>) -> bool {
        self.guard.is_current(ticket)
    }

    /// Show `product` if `ticket` is current. Returns whether it was applied.
    pub fn apply_product(&mut self, ticket: &Ticket<ProductId>, product: Product) -> bool {
        if !self.accept(ticket, "product") {
            return false;
        }
        self.product = Some(product);
        self.quantity = self.quantity.min(self.max_quantity());
        true
    }

    pub fn apply_similar(&mut self, ticket: &Ticket<ProductId>, similar: Vec<Product>) -> bool {
        if !self.accept(ticket, "similar products") {
            return false;
        }
        self.similar = similar;
        true
    }

    pub fn apply_reviews(&mut self, ticket: &Ticket<ProductId>, reviews: Vec<Review>) -> bool {
        if !self.accept(ticket, "reviews") {
            return false;
        }
        self.reviews = reviews;
        true
    }

    fn accept(&self, ticket: &Ticket<ProductId>, what: &str) -> bool {
        let current = self.is_current(ticket);
        if !current {
            debug!(product_id = %ticket.key(), what, "Discarding stale response");
        }
        current
    }

    // =========================================================================
    // Quantity selector
    // =========================================================================

    /// Step the selector by `delta`, clamped to `[1, max_quantity]`.
    pub fn adjust_quantity(&mut self, delta: i64) -> u32 {
        self.set_quantity(i64::from(self.quantity).saturating_add(delta))
    }

    /// Set the selector, clamped to `[1, max_quantity]`.
    pub fn set_quantity(&mut self, quantity: i64) -> u32 {
        let max = i64::from(self.max_quantity());
        self.quantity = u32::try_from(quantity.clamp(1, max)).unwrap_or(1);
        self.quantity
    }

    /// Upper bound of the selector: stock once loaded, otherwise
    /// [`DEFAULT_MAX_QUANTITY`]. Never below 1.
    #[must_use]
    pub fn max_quantity(&self) -> u32 {
        self.product
            .as_ref()
            .map_or(DEFAULT_MAX_QUANTITY, |p| p.quantity_available)
            .max(1)
    }

    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// "Only N left" when the loaded product is low on stock.
    #[must_use]
    pub fn low_stock(&self) -> Option<u32> {
        self.product.as_ref().and_then(Product::low_stock)
    }

    /// Product being viewed, if navigation has begun.
    #[must_use]
    pub const fn active_id(&self) -> Option<&ProductId> {
        self.active.as_ref()
    }

    #[must_use]
    pub const fn product(&self) -> Option<&Product> {
        self.product.as_ref()
    }

    #[must_use]
    pub fn similar(&self) -> &[Product] {
        &self.similar
    }

    #[must_use]
    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    /// Whether the product itself is still loading.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.active.is_some() && self.product.is_none()
    }
}

impl Default for ProductView {
    fn default() -> Self {
        Self::new()
    }
}
