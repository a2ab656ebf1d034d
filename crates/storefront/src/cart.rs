//! Cart store.
//!
//! An ordered list of lines, one per product, persisted under
//! [`keys::CART`]. Every mutation writes the new list to storage before it
//! replaces the in-memory list; if the write fails the store is unchanged.
//!
//! Quantities are clamped to the product's stock snapshot and never drop
//! below 1; asking for 0 or less removes the line.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use comfycube_core::{Price, ProductId, RequestId};

use crate::error::{Result, StorefrontError};
use crate::models::Product;
use crate::notify::ChangeNotifier;
use crate::storage::{Storage, keys, load_record, save_record};

/// Where a local mutation stands relative to the remote.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncState {
    /// Never sent (guest, demo session, or restored from disk).
    #[default]
    Local,
    /// Sent with this request ID; awaiting the response.
    Pending(RequestId),
    /// Acknowledged by the remote.
    Confirmed,
}

impl SyncState {
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

/// One product in the cart.
///
/// Name, price and image are snapshots taken when the line was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Price,
    pub name: String,
    pub image_url: Option<String>,
    /// Stock at the last add; upper bound for `quantity`.
    pub quantity_available: u32,
    #[serde(skip)]
    pub sync: SyncState,
}

impl CartLine {
    /// `price * quantity`.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.price * self.quantity
    }
}

/// The shopper's cart.
pub struct CartStore {
    lines: Vec<CartLine>,
    storage: Arc<dyn Storage>,
    notifier: ChangeNotifier,
}

impl CartStore {
    /// Empty cart backed by `storage`; nothing is read.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            lines: Vec::new(),
            storage,
            notifier: ChangeNotifier::new(),
        }
    }

    /// Cart restored from `storage`.
    ///
    /// An unreadable record yields an empty cart. Restored lines with a zero
    /// quantity are dropped, duplicate lines for one product are merged, and
    /// quantities are clamped to the stock snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the backend itself fails.
    pub fn restore(storage: Arc<dyn Storage>) -> Result<Self> {
        let stored: Vec<CartLine> =
            load_record(storage.as_ref(), keys::CART)?.unwrap_or_default();
        let lines = merge_restored(stored);
        debug!(lines = lines.len(), "Restored cart");

        Ok(Self {
            lines,
            storage,
            notifier: ChangeNotifier::new(),
        })
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` units of `product`.
    ///
    /// An existing line grows to `min(current + quantity, stock)`; a new line
    /// starts at `quantity` clamped to `[1, stock]`. The line's stock snapshot
    /// is refreshed from `product`.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the product is out of stock.
    pub fn add_item(&mut self, product: &Product, quantity: u32) -> Result<()> {
        let available = product.quantity_available;
        if available == 0 {
            return Err(StorefrontError::Validation(format!(
                "{} is out of stock",
                product.name
            )));
        }

        let mut lines = self.lines.clone();
        if let Some(line) = lines.iter_mut().find(|l| l.product_id == product.id) {
            line.quantity = line.quantity.saturating_add(quantity).min(available);
            line.quantity_available = available;
        } else {
            lines.push(CartLine {
                product_id: product.id.clone(),
                quantity: quantity.clamp(1, available),
                price: product.price,
                name: product.name.clone(),
                image_url: product.image_url.clone(),
                quantity_available: available,
                sync: SyncState::Local,
            });
        }
        self.commit(lines)
    }

    /// Set a line's quantity, clamped to `[1, stock]`.
    ///
    /// Does nothing for a product not in the cart. Zero or a negative
    /// quantity removes the line.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the new cart cannot be persisted.
    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: i64) -> Result<()> {
        if !self.contains(product_id) {
            return Ok(());
        }
        if quantity <= 0 {
            return self.remove_item(product_id);
        }

        let mut lines = self.lines.clone();
        if let Some(line) = lines.iter_mut().find(|l| &l.product_id == product_id) {
            let max = line.quantity_available.max(1);
            line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX).min(max);
        }
        self.commit(lines)
    }

    /// Remove a line. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the new cart cannot be persisted.
    pub fn remove_item(&mut self, product_id: &ProductId) -> Result<()> {
        if !self.contains(product_id) {
            return Ok(());
        }
        let lines = self
            .lines
            .iter()
            .filter(|l| &l.product_id != product_id)
            .cloned()
            .collect();
        self.commit(lines)
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the empty cart cannot be persisted.
    pub fn clear(&mut self) -> Result<()> {
        self.commit(Vec::new())
    }

    /// Mark a line's sync state. Not persisted.
    pub(crate) fn set_sync(&mut self, product_id: &ProductId, sync: SyncState) {
        if let Some(line) = self.lines.iter_mut().find(|l| &l.product_id == product_id) {
            line.sync = sync;
            self.notifier.notify();
        }
    }

    /// Drop every line's sync marker back to `Local`. Not persisted.
    pub(crate) fn reset_sync(&mut self) {
        let mut changed = false;
        for line in self.lines.iter_mut().filter(|l| l.sync != SyncState::Local) {
            line.sync = SyncState::Local;
            changed = true;
        }
        if changed {
            self.notifier.notify();
        }
    }

    /// Put back a line as it was before a rejected mutation.
    ///
    /// `None` means the product was not in the cart. Memory is rolled back
    /// even when the save fails; the error then reports that the stored cart
    /// still holds the rejected line.
    pub(crate) fn restore_line(
        &mut self,
        product_id: &ProductId,
        previous: Option<CartLine>,
    ) -> Result<()> {
        let mut lines = self.lines.clone();
        match (lines.iter().position(|l| &l.product_id == product_id), previous) {
            (Some(index), Some(line)) => {
                if let Some(slot) = lines.get_mut(index) {
                    *slot = line;
                }
            }
            (Some(index), None) => {
                lines.remove(index);
            }
            (None, Some(line)) => lines.push(line),
            (None, None) => return Ok(()),
        }
        let saved = save_record(self.storage.as_ref(), keys::CART, &lines);
        self.lines = lines;
        self.notifier.notify();
        saved.map_err(Into::into)
    }

    fn commit(&mut self, lines: Vec<CartLine>) -> Result<()> {
        save_record(self.storage.as_ref(), keys::CART, &lines)?;
        self.lines = lines;
        self.notifier.notify();
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Sum of `price * quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Sum of quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn get(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.product_id == product_id)
    }

    fn contains(&self, product_id: &ProductId) -> bool {
        self.get(product_id).is_some()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Subscribe to cart changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notifier.subscribe()
    }
}

fn merge_restored(stored: Vec<CartLine>) -> Vec<CartLine> {
    let mut lines: Vec<CartLine> = Vec::with_capacity(stored.len());
    for line in stored.into_iter().filter(|l| l.quantity > 0) {
        if let Some(existing) = lines.iter_mut().find(|l| l.product_id == line.product_id) {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
        } else {
            lines.push(line);
        }
    }
    for line in &mut lines {
        line.quantity = line.quantity.min(line.quantity_available.max(1));
    }
    lines
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use comfycube_core::CategoryId;
    use rust_decimal::Decimal;

    use super::*;
    use crate::storage::{MemoryStorage, ReadOnlyStorage};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn product(id: &str, price: &str, available: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Price::new(dec(price)).unwrap(),
            image_url: Some(format!("https://img.comfycube.test/{id}.jpg")),
            category_id: CategoryId::new("sofas"),
            category_name: Some("Sofas".to_string()),
            description: String::new(),
            measurements: None,
            quantity_available: available,
        }
    }

    fn empty_cart() -> CartStore {
        CartStore::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_add_update_remove_scenario() {
        let mut cart = empty_cart();
        let p1 = product("p1", "20", 5);
        let id = ProductId::new("p1");

        cart.add_item(&p1, 3).unwrap();
        assert_eq!(cart.total().amount(), dec("60.00"));
        assert_eq!(cart.item_count(), 3);

        cart.update_quantity(&id, 10).unwrap();
        assert_eq!(cart.get(&id).unwrap().quantity, 5);
        assert_eq!(cart.total().amount(), dec("100.00"));

        cart.remove_item(&id).unwrap();
        assert_eq!(cart.total(), Price::ZERO);
        assert_eq!(cart.item_count(), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_repeated_add_merges_and_clamps() {
        let mut cart = empty_cart();
        let p = product("p1", "10", 4);

        cart.add_item(&p, 3).unwrap();
        cart.add_item(&p, 3).unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 4);

        let mut cart = empty_cart();
        cart.add_item(&p, 1).unwrap();
        cart.add_item(&p, 2).unwrap();
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn test_new_line_quantity_at_least_one() {
        let mut cart = empty_cart();
        cart.add_item(&product("p1", "10", 4), 0).unwrap();
        assert_eq!(cart.item_count(), 1);

        cart.add_item(&product("p2", "10", 2), 9).unwrap();
        assert_eq!(cart.get(&ProductId::new("p2")).unwrap().quantity, 2);
    }

    #[test]
    fn test_out_of_stock_rejected() {
        let mut cart = empty_cart();
        let err = cart.add_item(&product("p1", "10", 0), 1).unwrap_err();
        assert!(matches!(err, StorefrontError::Validation(_)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_edge_cases() {
        let mut cart = empty_cart();
        let id = ProductId::new("p1");
        cart.add_item(&product("p1", "10", 5), 2).unwrap();

        // Absent product is a no-op
        cart.update_quantity(&ProductId::new("nope"), 3).unwrap();
        assert_eq!(cart.lines().len(), 1);

        cart.update_quantity(&id, 0).unwrap();
        assert!(cart.get(&id).is_none());

        cart.add_item(&product("p1", "10", 5), 2).unwrap();
        cart.update_quantity(&id, -4).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = empty_cart();
        cart.add_item(&product("p1", "10", 5), 1).unwrap();
        let before = cart.lines().to_vec();
        cart.remove_item(&ProductId::new("p9")).unwrap();
        assert_eq!(cart.lines(), before.as_slice());
    }

    #[test]
    fn test_total_sums_lines() {
        let mut cart = empty_cart();
        cart.add_item(&product("p1", "19.99", 10), 2).unwrap();
        cart.add_item(&product("p2", "5.50", 10), 3).unwrap();
        assert_eq!(cart.total().amount(), dec("56.48"));
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_clear() {
        let mut cart = empty_cart();
        cart.add_item(&product("p1", "10", 5), 1).unwrap();
        cart.clear().unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Price::ZERO);
    }

    #[test]
    fn test_persists_and_restores() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut cart = CartStore::new(Arc::clone(&storage));
        cart.add_item(&product("p1", "20", 5), 2).unwrap();
        cart.set_sync(&ProductId::new("p1"), SyncState::Confirmed);

        let restored = CartStore::restore(storage).unwrap();
        let line = restored.get(&ProductId::new("p1")).unwrap();
        assert_eq!(line.quantity, 2);
        assert_eq!(line.name, "Product p1");
        assert_eq!(line.sync, SyncState::Local);
    }

    #[test]
    fn test_storage_failure_leaves_cart_unchanged() {
        let mut cart = CartStore::new(Arc::new(ReadOnlyStorage::default()));
        let err = cart.add_item(&product("p1", "20", 5), 1).unwrap_err();
        assert!(matches!(err, StorefrontError::Storage(_)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_restore_line() {
        let mut cart = empty_cart();
        let id = ProductId::new("p1");
        cart.add_item(&product("p1", "20", 5), 1).unwrap();
        let previous = cart.get(&id).cloned();

        cart.add_item(&product("p1", "20", 5), 2).unwrap();
        cart.restore_line(&id, previous).unwrap();
        assert_eq!(cart.get(&id).unwrap().quantity, 1);

        cart.restore_line(&id, None).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_mutation_notifies() {
        let mut cart = empty_cart();
        let rx = cart.subscribe();
        cart.add_item(&product("p1", "20", 5), 1).unwrap();
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn test_restore_merges_duplicates_and_clamps() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let line = |id: &str, quantity: u32, available: u32| CartLine {
            product_id: ProductId::new(id),
            quantity,
            price: Price::from_cents(2_000),
            name: format!("Product {id}"),
            image_url: None,
            quantity_available: available,
            sync: SyncState::Local,
        };
        let stored = vec![line("p1", 2, 5), line("p2", 9, 3), line("p1", 2, 5), line("p3", 0, 5)];
        save_record(storage.as_ref(), keys::CART, &stored).unwrap();

        let cart = CartStore::restore(storage).unwrap();
        let quantities: Vec<(&str, u32)> = cart
            .lines()
            .iter()
            .map(|l| (l.product_id.as_str(), l.quantity))
            .collect();
        assert_eq!(quantities, [("p1", 4), ("p2", 3)]);
    }

    #[test]
    fn test_reset_sync_marks_lines_local() {
        let mut cart = empty_cart();
        let id = ProductId::new("p1");
        cart.add_item(&product("p1", "20", 5), 1).unwrap();
        cart.set_sync(&id, SyncState::Pending(RequestId::generate()));

        let rx = cart.subscribe();
        cart.reset_sync();
        assert_eq!(cart.get(&id).unwrap().sync, SyncState::Local);
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn test_rollback_applies_in_memory_when_save_fails() {
        let id = ProductId::new("p1");
        let mut cart = CartStore {
            lines: Vec::new(),
            storage: Arc::new(ReadOnlyStorage::default()),
            notifier: ChangeNotifier::new(),
        };
        cart.lines.push(CartLine {
            product_id: id.clone(),
            quantity: 2,
            price: Price::from_cents(2_000),
            name: "Product p1".to_string(),
            image_url: None,
            quantity_available: 5,
            sync: SyncState::Pending(RequestId::generate()),
        });

        let err = cart.restore_line(&id, None).unwrap_err();
        assert!(matches!(err, StorefrontError::Storage(_)));
        assert!(cart.is_empty());
    }
}
