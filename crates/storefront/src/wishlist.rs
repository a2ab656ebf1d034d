//! Wishlist store: a set of saved products, persisted under
//! [`keys::WISHLIST`] in insertion order.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use comfycube_core::{CategoryId, Price, ProductId};

use crate::cart::SyncState;
use crate::error::Result;
use crate::models::Product;
use crate::notify::ChangeNotifier;
use crate::storage::{Storage, keys, load_record, save_record};

/// A saved product, snapshotted when it was saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub image_url: Option<String>,
    pub category_id: CategoryId,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(skip)]
    pub sync: SyncState,
}

impl From<&Product> for WishlistEntry {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image_url: product.image_url.clone(),
            category_id: product.category_id.clone(),
            category_name: product.category_name.clone(),
            sync: SyncState::Local,
        }
    }
}

/// The shopper's wishlist.
pub struct WishlistStore {
    entries: Vec<WishlistEntry>,
    storage: Arc<dyn Storage>,
    notifier: ChangeNotifier,
}

impl WishlistStore {
    /// Empty wishlist backed by `storage`; nothing is read.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            entries: Vec::new(),
            storage,
            notifier: ChangeNotifier::new(),
        }
    }

    /// Wishlist restored from `storage`. Duplicate entries keep the first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the backend itself fails.
    pub fn restore(storage: Arc<dyn Storage>) -> Result<Self> {
        let stored: Vec<WishlistEntry> =
            load_record(storage.as_ref(), keys::WISHLIST)?.unwrap_or_default();

        let mut entries: Vec<WishlistEntry> = Vec::with_capacity(stored.len());
        for entry in stored {
            if !entries.iter().any(|e| e.product_id == entry.product_id) {
                entries.push(entry);
            }
        }
        debug!(entries = entries.len(), "Restored wishlist");

        Ok(Self {
            entries,
            storage,
            notifier: ChangeNotifier::new(),
        })
    }

    /// Save `entry`. Does nothing if the product is already saved.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the wishlist cannot be persisted.
    pub fn add_item(&mut self, entry: WishlistEntry) -> Result<()> {
        if self.is_in_wishlist(&entry.product_id) {
            return Ok(());
        }
        let mut entries = self.entries.clone();
        entries.push(entry);
        self.commit(entries)
    }

    /// Unsave a product. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the wishlist cannot be persisted.
    pub fn remove_item(&mut self, product_id: &ProductId) -> Result<()> {
        if !self.is_in_wishlist(product_id) {
            return Ok(());
        }
        let entries = self
            .entries
            .iter()
            .filter(|e| &e.product_id != product_id)
            .cloned()
            .collect();
        self.commit(entries)
    }

    /// Add if absent, remove if present. Returns the resulting membership.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the wishlist cannot be persisted.
    pub fn toggle(&mut self, entry: WishlistEntry) -> Result<bool> {
        if self.is_in_wishlist(&entry.product_id) {
            self.remove_item(&entry.product_id)?;
            Ok(false)
        } else {
            self.add_item(entry)?;
            Ok(true)
        }
    }

    pub(crate) fn set_sync(&mut self, product_id: &ProductId, sync: SyncState) {
        if let Some(entry) = self.entries.iter_mut().find(|e| &e.product_id == product_id) {
            entry.sync = sync;
            self.notifier.notify();
        }
    }

    /// Drop every entry's sync marker back to `Local`. Not persisted.
    pub(crate) fn reset_sync(&mut self) {
        let mut changed = false;
        for entry in self.entries.iter_mut().filter(|e| e.sync != SyncState::Local) {
            entry.sync = SyncState::Local;
            changed = true;
        }
        if changed {
            self.notifier.notify();
        }
    }

    /// Undo a rejected toggle: `previous` is the entry as it was, `None` if
    /// the product was not saved.
    ///
    /// Memory is rolled back even when the save fails.
    pub(crate) fn restore_entry(
        &mut self,
        product_id: &ProductId,
        previous: Option<WishlistEntry>,
    ) -> Result<()> {
        let mut entries: Vec<WishlistEntry> = self
            .entries
            .iter()
            .filter(|e| &e.product_id != product_id)
            .cloned()
            .collect();
        entries.extend(previous);

        let saved = save_record(self.storage.as_ref(), keys::WISHLIST, &entries);
        self.entries = entries;
        self.notifier.notify();
        saved.map_err(Into::into)
    }

    fn commit(&mut self, entries: Vec<WishlistEntry>) -> Result<()> {
        save_record(self.storage.as_ref(), keys::WISHLIST, &entries)?;
        self.entries = entries;
        self.notifier.notify();
        Ok(())
    }

    #[must_use]
    pub fn is_in_wishlist(&self, product_id: &ProductId) -> bool {
        self.entries.iter().any(|e| &e.product_id == product_id)
    }

    #[must_use]
    pub fn get(&self, product_id: &ProductId) -> Option<&WishlistEntry> {
        self.entries.iter().find(|e| &e.product_id == product_id)
    }

    #[must_use]
    pub fn entries(&self) -> &[WishlistEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Subscribe to wishlist changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notifier.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::StorefrontError;
    use crate::storage::{MemoryStorage, ReadOnlyStorage};

    fn entry(id: &str) -> WishlistEntry {
        WishlistEntry {
            product_id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Price::from_cents(4_500),
            image_url: None,
            category_id: CategoryId::new("chairs"),
            category_name: None,
            sync: SyncState::Local,
        }
    }

    fn empty_wishlist() -> WishlistStore {
        WishlistStore::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_toggle_twice_restores_membership() {
        let mut wishlist = empty_wishlist();
        let id = ProductId::new("p2");

        assert!(wishlist.toggle(entry("p2")).unwrap());
        assert!(wishlist.is_in_wishlist(&id));

        assert!(!wishlist.toggle(entry("p2")).unwrap());
        assert!(!wishlist.is_in_wishlist(&id));
        assert!(wishlist.is_empty());
    }

    #[test]
    fn test_add_is_set_like() {
        let mut wishlist = empty_wishlist();
        wishlist.add_item(entry("p1")).unwrap();
        wishlist.add_item(entry("p1")).unwrap();
        assert_eq!(wishlist.len(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut wishlist = empty_wishlist();
        wishlist.add_item(entry("p1")).unwrap();
        wishlist.remove_item(&ProductId::new("p9")).unwrap();
        assert_eq!(wishlist.len(), 1);
    }

    #[test]
    fn test_persists_in_order() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut wishlist = WishlistStore::new(Arc::clone(&storage));
        wishlist.add_item(entry("p3")).unwrap();
        wishlist.add_item(entry("p1")).unwrap();

        let restored = WishlistStore::restore(storage).unwrap();
        let ids: Vec<&str> = restored
            .entries()
            .iter()
            .map(|e| e.product_id.as_str())
            .collect();
        assert_eq!(ids, vec!["p3", "p1"]);
    }

    #[test]
    fn test_storage_failure_leaves_wishlist_unchanged() {
        let mut wishlist = WishlistStore::new(Arc::new(ReadOnlyStorage::default()));
        let err = wishlist.toggle(entry("p1")).unwrap_err();
        assert!(matches!(err, StorefrontError::Storage(_)));
        assert!(wishlist.is_empty());
    }

    #[test]
    fn test_entry_from_product() {
        let product = Product {
            id: ProductId::new("p7"),
            name: "Loft Bed".to_string(),
            price: Price::from_cents(129_900),
            image_url: Some("https://img.comfycube.test/p7.jpg".to_string()),
            category_id: CategoryId::new("beds"),
            category_name: Some("Beds".to_string()),
            description: "Solid oak".to_string(),
            measurements: None,
            quantity_available: 2,
        };
        let entry = WishlistEntry::from(&product);
        assert_eq!(entry.product_id, product.id);
        assert_eq!(entry.price.to_string(), "$1299.00");
        assert_eq!(entry.category_name.as_deref(), Some("Beds"));
    }

    #[test]
    fn test_reset_sync_marks_entries_local() {
        let mut wishlist = empty_wishlist();
        let id = ProductId::new("p1");
        wishlist.add_item(entry("p1")).unwrap();
        wishlist.set_sync(&id, SyncState::Confirmed);

        wishlist.reset_sync();
        assert_eq!(wishlist.get(&id).unwrap().sync, SyncState::Local);
    }

    #[test]
    fn test_undo_applies_in_memory_when_save_fails() {
        let mut wishlist = WishlistStore {
            entries: vec![entry("p1")],
            storage: Arc::new(ReadOnlyStorage::default()),
            notifier: ChangeNotifier::new(),
        };

        let err = wishlist
            .restore_entry(&ProductId::new("p1"), None)
            .unwrap_err();
        assert!(matches!(err, StorefrontError::Storage(_)));
        assert!(wishlist.is_empty());

        wishlist
            .restore_entry(&ProductId::new("p2"), Some(entry("p2")))
            .unwrap_err();
        assert!(wishlist.is_in_wishlist(&ProductId::new("p2")));
    }
}
