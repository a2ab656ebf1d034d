//! Optimistic sync with the remote cart and wishlist.
//!
//! Two requests for the same key may complete out of order. Each request
//! carries a [`Ticket`]; only the ticket most recently issued for a key is
//! current, and a response holding any other ticket must be discarded.
//!
//! A local cart or wishlist change for a signed-in user produces a
//! [`CartMutation`] or [`WishlistMutation`]. [`SyncClient`] pushes it; the
//! [`Storefront`](crate::state::Storefront) reconciles the outcome.

use std::collections::HashMap;
use std::hash::Hash;

use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use comfycube_core::{ProductId, RequestId};

use crate::api::ApiClient;
use crate::api::types::{CartItemRequest, WishlistItemRequest};
use crate::cart::CartLine;
use crate::error::Result;
use crate::wishlist::WishlistEntry;

/// Identity of one in-flight request for `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket<K> {
    key: K,
    id: RequestId,
}

impl<K> Ticket<K> {
    /// The key the request was issued for.
    pub const fn key(&self) -> &K {
        &self.key
    }

    /// Request ID sent to the remote.
    pub const fn id(&self) -> &RequestId {
        &self.id
    }
}

/// Tracks the latest ticket per key.
#[derive(Debug)]
pub struct RequestGuard<K> {
    latest: HashMap<K, RequestId>,
}

impl<K> Default for RequestGuard<K> {
    fn default() -> Self {
        Self {
            latest: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> RequestGuard<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh ticket for `key`, superseding any earlier one.
    pub fn issue(&mut self, key: K) -> Ticket<K> {
        let id = RequestId::generate();
        self.latest.insert(key.clone(), id.clone());
        Ticket { key, id }
    }

    /// Whether `ticket` is still the latest for its key.
    #[must_use]
    pub fn is_current(&self, ticket: &Ticket<K>) -> bool {
        self.latest.get(&ticket.key) == Some(&ticket.id)
    }

    /// Retire `ticket` if it is current. Returns whether it was.
    pub fn settle(&mut self, ticket: &Ticket<K>) -> bool {
        if self.is_current(ticket) {
            self.latest.remove(&ticket.key);
            true
        } else {
            false
        }
    }

    /// Invalidate whatever is outstanding for `key`.
    pub fn cancel(&mut self, key: &K) {
        self.latest.remove(key);
    }

    /// Whether a request for `key` is still outstanding.
    #[must_use]
    pub fn is_pending(&self, key: &K) -> bool {
        self.latest.contains_key(key)
    }
}

// =============================================================================
// Mutations
// =============================================================================

/// How a pushed mutation was reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// The remote accepted it; the local state is confirmed.
    Confirmed,
    /// A later mutation for the same product superseded it.
    Discarded,
    /// Nothing to push (guest or demo session).
    LocalOnly,
}

/// A cart line change awaiting the remote.
pub struct CartMutation {
    pub(crate) ticket: Ticket<ProductId>,
    /// Line after the change; `None` if it was removed.
    pub(crate) line: Option<CartLine>,
    /// Line before the change; restored on failure.
    pub(crate) previous: Option<CartLine>,
    pub(crate) token: SecretString,
}

impl CartMutation {
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        self.ticket.key()
    }

    #[must_use]
    pub const fn request_id(&self) -> &RequestId {
        self.ticket.id()
    }

    /// Absolute quantity sent to the remote; 0 means removed.
    #[must_use]
    pub fn quantity(&self) -> u32 {
        self.line.as_ref().map_or(0, |line| line.quantity)
    }
}

impl std::fmt::Debug for CartMutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartMutation")
            .field("ticket", &self.ticket)
            .field("line", &self.line)
            .field("previous", &self.previous)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// A wishlist toggle awaiting the remote.
pub struct WishlistMutation {
    pub(crate) ticket: Ticket<ProductId>,
    pub(crate) entry: WishlistEntry,
    pub(crate) saved: bool,
    pub(crate) token: SecretString,
}

impl WishlistMutation {
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        self.ticket.key()
    }

    #[must_use]
    pub const fn request_id(&self) -> &RequestId {
        self.ticket.id()
    }

    /// Membership after the toggle.
    #[must_use]
    pub const fn saved(&self) -> bool {
        self.saved
    }
}

impl std::fmt::Debug for WishlistMutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WishlistMutation")
            .field("ticket", &self.ticket)
            .field("entry", &self.entry)
            .field("saved", &self.saved)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Pushes mutations to the remote.
///
/// Cheaply cloneable; holds no store state, so several pushes can be in
/// flight while the stores keep accepting local changes.
#[derive(Clone)]
pub struct SyncClient {
    api: ApiClient,
}

impl SyncClient {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// `POST /cart/items` with the line's absolute quantity.
    ///
    /// # Errors
    ///
    /// Returns `Auth` if the token is rejected, otherwise `Network` or
    /// `Server`.
    #[instrument(skip(self, mutation), fields(product_id = %mutation.product_id(), request_id = %mutation.request_id()))]
    pub async fn push_cart_line(&self, mutation: &CartMutation) -> Result<()> {
        let request = CartItemRequest {
            product_id: mutation.product_id().as_str(),
            quantity: mutation.quantity(),
            request_id: mutation.request_id().as_str(),
        };
        self.api
            .put_cart_item(&request, mutation.token.expose_secret())
            .await?;
        Ok(())
    }

    /// `POST /wishlist/items` with the resulting membership.
    ///
    /// # Errors
    ///
    /// Returns `Auth` if the token is rejected, otherwise `Network` or
    /// `Server`.
    #[instrument(skip(self, mutation), fields(product_id = %mutation.product_id(), request_id = %mutation.request_id()))]
    pub async fn push_wishlist_entry(&self, mutation: &WishlistMutation) -> Result<()> {
        let request = WishlistItemRequest {
            product_id: mutation.product_id().as_str(),
            saved: mutation.saved,
            request_id: mutation.request_id().as_str(),
        };
        self.api
            .put_wishlist_item(&request, mutation.token.expose_secret())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_ticket_supersedes_earlier() {
        let mut guard = RequestGuard::new();
        let first = guard.issue("p1");
        let second = guard.issue("p1");

        assert!(!guard.is_current(&first));
        assert!(guard.is_current(&second));

        // Out-of-order completion: second lands before first
        assert!(guard.settle(&second));
        assert!(!guard.settle(&first));
        assert!(!guard.is_pending(&"p1"));
    }

    #[test]
    fn test_keys_are_independent() {
        let mut guard = RequestGuard::new();
        let a = guard.issue("p1");
        let b = guard.issue("p2");
        assert!(guard.is_current(&a));
        assert!(guard.is_current(&b));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_cancel_makes_ticket_stale() {
        let mut guard = RequestGuard::new();
        let ticket = guard.issue("p1");
        guard.cancel(&"p1");
        assert!(!guard.is_current(&ticket));
        assert!(!guard.settle(&ticket));
    }
}
