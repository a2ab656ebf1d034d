//! The storefront context handed to the presentation layer.
//!
//! Owns the session, cart and wishlist stores together with the catalog
//! client, and coordinates optimistic cart and wishlist sync for signed-in
//! users. Guests and demo sessions keep cart and wishlist on this device.

use std::sync::Arc;

use secrecy::SecretString;
use tracing::{debug, instrument, warn};

use comfycube_core::{ProductId, Role};

use crate::api::ApiClient;
use crate::cart::{CartLine, CartStore, SyncState};
use crate::catalog::{CatalogClient, SIMILAR_PRODUCTS_LIMIT};
use crate::config::ApiConfig;
use crate::error::{Result, StorefrontError};
use crate::models::{AuthSession, Product, Review, User};
use crate::session::{AuthBackend, DemoAuth, RemoteAuth, SessionStore};
use crate::storage::Storage;
use crate::sync::{CartMutation, Reconciled, RequestGuard, SyncClient, WishlistMutation};
use crate::view::ProductView;
use crate::wishlist::{WishlistEntry, WishlistStore};

/// Stores and clients for one shopper.
pub struct Storefront<A = RemoteAuth> {
    catalog: CatalogClient,
    sync: SyncClient,
    session: SessionStore<A>,
    cart: CartStore,
    wishlist: WishlistStore,
    cart_requests: RequestGuard<ProductId>,
    wishlist_requests: RequestGuard<ProductId>,
}

impl Storefront<RemoteAuth> {
    /// Storefront that authenticates against the remote API.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the HTTP client cannot be built and `Storage`
    /// if persisted state cannot be read.
    pub fn remote(config: &ApiConfig, storage: Arc<dyn Storage>) -> Result<Self> {
        let api = build_api(config)?;
        Self::open(api.clone(), config, RemoteAuth::new(api), storage)
    }
}

impl Storefront<DemoAuth> {
    /// Storefront with local demo accounts. Catalog reads still hit the API.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the HTTP client cannot be built and `Storage`
    /// if persisted state cannot be read.
    pub fn demo(config: &ApiConfig, storage: Arc<dyn Storage>) -> Result<Self> {
        let api = build_api(config)?;
        Self::open(api, config, DemoAuth::new(), storage)
    }
}

impl<A: AuthBackend> Storefront<A> {
    /// Assemble the stores and restore persisted session, cart and wishlist.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if persisted state cannot be read.
    pub fn open(
        api: ApiClient,
        config: &ApiConfig,
        backend: A,
        storage: Arc<dyn Storage>,
    ) -> Result<Self> {
        let mut session = SessionStore::new(backend, Arc::clone(&storage));
        session.restore()?;
        let cart = CartStore::restore(Arc::clone(&storage))?;
        let wishlist = WishlistStore::restore(storage)?;

        Ok(Self {
            catalog: CatalogClient::new(api.clone(), config.cache_ttl),
            sync: SyncClient::new(api),
            session,
            cart,
            wishlist,
            cart_requests: RequestGuard::new(),
            wishlist_requests: RequestGuard::new(),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub const fn catalog(&self) -> &CatalogClient {
        &self.catalog
    }

    /// Handle for pushing mutations without borrowing the storefront.
    #[must_use]
    pub fn sync_client(&self) -> SyncClient {
        self.sync.clone()
    }

    #[must_use]
    pub const fn session(&self) -> &SessionStore<A> {
        &self.session
    }

    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    #[must_use]
    pub const fn wishlist(&self) -> &WishlistStore {
        &self.wishlist
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.session.user()
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// See [`SessionStore::sign_in`].
    ///
    /// # Errors
    ///
    /// Returns `Validation`, `Auth` or `Storage` as the session store does.
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<User> {
        self.session.sign_in(email, password).await
    }

    /// See [`SessionStore::sign_up`].
    ///
    /// # Errors
    ///
    /// Returns `Validation`, `Auth` or `Storage` as the session store does.
    pub async fn sign_up(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User> {
        self.session.sign_up(name, email, password, role).await
    }

    /// Sign out. Outstanding cart and wishlist pushes become stale and every
    /// line and entry is marked `Local` again.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the session record cannot be removed.
    pub fn sign_out(&mut self) -> Result<()> {
        self.session.sign_out()?;
        self.cart_requests = RequestGuard::new();
        self.wishlist_requests = RequestGuard::new();
        self.cart.reset_sync();
        self.wishlist.reset_sync();
        Ok(())
    }

    fn token(&self) -> Option<SecretString> {
        self.session
            .session()
            .and_then(|session| session.access_token.clone())
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Add to the cart locally and, for a signed-in user, prepare the push.
    ///
    /// Returns `None` when there is nothing to push.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the product is out of stock, `Storage` if the
    /// cart cannot be persisted.
    pub fn begin_add_to_cart(
        &mut self,
        product: &Product,
        quantity: u32,
    ) -> Result<Option<CartMutation>> {
        let previous = self.cart.get(&product.id).cloned();
        self.cart.add_item(product, quantity)?;
        Ok(self.track_cart(&product.id, previous))
    }

    /// Set a line's quantity locally and prepare the push.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the cart cannot be persisted.
    pub fn begin_update_cart_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Option<CartMutation>> {
        let previous = self.cart.get(product_id).cloned();
        self.cart.update_quantity(product_id, quantity)?;
        Ok(self.track_cart(product_id, previous))
    }

    /// Remove a line locally and prepare the push.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the cart cannot be persisted.
    pub fn begin_remove_from_cart(
        &mut self,
        product_id: &ProductId,
    ) -> Result<Option<CartMutation>> {
        let previous = self.cart.get(product_id).cloned();
        self.cart.remove_item(product_id)?;
        Ok(self.track_cart(product_id, previous))
    }

    fn track_cart(
        &mut self,
        product_id: &ProductId,
        previous: Option<CartLine>,
    ) -> Option<CartMutation> {
        let line = self.cart.get(product_id).cloned();
        if line.is_none() && previous.is_none() {
            return None;
        }
        let token = self.token()?;

        let ticket = self.cart_requests.issue(product_id.clone());
        self.cart
            .set_sync(product_id, SyncState::Pending(ticket.id().clone()));
        Some(CartMutation {
            ticket,
            line,
            previous,
            token,
        })
    }

    /// Push a prepared cart mutation.
    ///
    /// # Errors
    ///
    /// Returns the push error; pass it to
    /// [`complete_cart_mutation`](Self::complete_cart_mutation).
    pub async fn push_cart_line(&self, mutation: &CartMutation) -> Result<()> {
        self.sync.push_cart_line(mutation).await
    }

    /// Reconcile a pushed cart mutation with its outcome.
    ///
    /// A superseded mutation is ignored whatever its outcome. A failed
    /// current mutation restores the line as it was and returns the error.
    ///
    /// # Errors
    ///
    /// Returns the push error after rolling back.
    pub fn complete_cart_mutation(
        &mut self,
        mutation: CartMutation,
        outcome: Result<()>,
    ) -> Result<Reconciled> {
        let product_id = mutation.product_id().clone();
        if !self.cart_requests.settle(&mutation.ticket) {
            debug!(product_id = %product_id, "Discarding superseded cart response");
            return Ok(Reconciled::Discarded);
        }

        match outcome {
            Ok(()) => {
                self.cart.set_sync(&product_id, SyncState::Confirmed);
                Ok(Reconciled::Confirmed)
            }
            Err(err) => {
                warn!(product_id = %product_id, error = %err, "Cart sync failed; rolling back");
                if let Err(rollback) = self.cart.restore_line(&product_id, mutation.previous) {
                    warn!(error = %rollback, "Could not persist cart rollback");
                }
                Err(err)
            }
        }
    }

    async fn sync_cart(&mut self, mutation: Option<CartMutation>) -> Result<Reconciled> {
        let Some(mutation) = mutation else {
            return Ok(Reconciled::LocalOnly);
        };
        let outcome = self.sync.push_cart_line(&mutation).await;
        self.complete_cart_mutation(mutation, outcome)
    }

    /// Add to the cart and sync it.
    ///
    /// # Errors
    ///
    /// Returns `Validation`, `Storage`, or the push error after rollback.
    /// An `Auth` error means the shopper must sign in again.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_to_cart(&mut self, product: &Product, quantity: u32) -> Result<Reconciled> {
        let mutation = self.begin_add_to_cart(product, quantity)?;
        self.sync_cart(mutation).await
    }

    /// Set a line's quantity and sync it.
    ///
    /// # Errors
    ///
    /// Returns `Storage`, or the push error after rollback.
    #[instrument(skip(self))]
    pub async fn update_cart_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Reconciled> {
        let mutation = self.begin_update_cart_quantity(product_id, quantity)?;
        self.sync_cart(mutation).await
    }

    /// Remove a line and sync it.
    ///
    /// # Errors
    ///
    /// Returns `Storage`, or the push error after rollback.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&mut self, product_id: &ProductId) -> Result<Reconciled> {
        let mutation = self.begin_remove_from_cart(product_id)?;
        self.sync_cart(mutation).await
    }

    /// Remove every line, syncing each removal.
    ///
    /// Stops at the first failure; lines removed so far stay removed.
    ///
    /// # Errors
    ///
    /// Returns the first `Storage` or push error.
    pub async fn clear_cart(&mut self) -> Result<()> {
        if self.token().is_none() {
            return self.cart.clear();
        }
        let ids: Vec<ProductId> = self
            .cart
            .lines()
            .iter()
            .map(|line| line.product_id.clone())
            .collect();
        for id in ids {
            self.remove_from_cart(&id).await?;
        }
        Ok(())
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    /// Toggle locally and prepare the push.
    ///
    /// Returns the resulting membership and the mutation, if any.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the wishlist cannot be persisted.
    pub fn begin_toggle_wishlist(
        &mut self,
        entry: WishlistEntry,
    ) -> Result<(bool, Option<WishlistMutation>)> {
        let product_id = entry.product_id.clone();
        let saved = self.wishlist.toggle(entry.clone())?;

        let Some(token) = self.token() else {
            return Ok((saved, None));
        };
        let ticket = self.wishlist_requests.issue(product_id.clone());
        if saved {
            self.wishlist
                .set_sync(&product_id, SyncState::Pending(ticket.id().clone()));
        }
        Ok((
            saved,
            Some(WishlistMutation {
                ticket,
                entry,
                saved,
                token,
            }),
        ))
    }

    /// Push a prepared wishlist mutation.
    ///
    /// # Errors
    ///
    /// Returns the push error; pass it to
    /// [`complete_wishlist_mutation`](Self::complete_wishlist_mutation).
    pub async fn push_wishlist_entry(&self, mutation: &WishlistMutation) -> Result<()> {
        self.sync.push_wishlist_entry(mutation).await
    }

    /// Reconcile a pushed wishlist mutation with its outcome.
    ///
    /// # Errors
    ///
    /// Returns the push error after undoing the toggle.
    pub fn complete_wishlist_mutation(
        &mut self,
        mutation: WishlistMutation,
        outcome: Result<()>,
    ) -> Result<Reconciled> {
        let product_id = mutation.product_id().clone();
        if !self.wishlist_requests.settle(&mutation.ticket) {
            debug!(product_id = %product_id, "Discarding superseded wishlist response");
            return Ok(Reconciled::Discarded);
        }

        match outcome {
            Ok(()) => {
                self.wishlist.set_sync(&product_id, SyncState::Confirmed);
                Ok(Reconciled::Confirmed)
            }
            Err(err) => {
                warn!(product_id = %product_id, error = %err, "Wishlist sync failed; rolling back");
                let previous = (!mutation.saved).then_some(mutation.entry);
                if let Err(rollback) = self.wishlist.restore_entry(&product_id, previous) {
                    warn!(error = %rollback, "Could not persist wishlist rollback");
                }
                Err(err)
            }
        }
    }

    /// Toggle a wishlist entry and sync it. Returns the resulting membership.
    ///
    /// # Errors
    ///
    /// Returns `Storage`, or the push error after rollback.
    #[instrument(skip(self, entry), fields(product_id = %entry.product_id))]
    pub async fn toggle_wishlist(&mut self, entry: WishlistEntry) -> Result<bool> {
        let (saved, mutation) = self.begin_toggle_wishlist(entry)?;
        if let Some(mutation) = mutation {
            let outcome = self.sync.push_wishlist_entry(&mutation).await;
            self.complete_wishlist_mutation(mutation, outcome)?;
        }
        Ok(saved)
    }

    /// Remove a product from the wishlist and sync it. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `Storage`, or the push error after rollback.
    pub async fn remove_from_wishlist(&mut self, product_id: &ProductId) -> Result<()> {
        if let Some(entry) = self.wishlist.get(product_id).cloned() {
            self.toggle_wishlist(entry).await?;
        }
        Ok(())
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Submit a review as the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `Auth` without a session, `Validation` for a bad rating.
    pub async fn submit_review(
        &self,
        product_id: &ProductId,
        rating: i64,
        comment: &str,
    ) -> Result<Review> {
        self.catalog
            .submit_review(self.current_session(), product_id, rating, comment)
            .await
    }

    fn current_session(&self) -> Option<&AuthSession> {
        self.session.session()
    }

    /// Load a product page into `view`: product, similar products, reviews.
    ///
    /// Responses for a product the view has since left are dropped.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown product, or a transport error.
    #[instrument(skip(self, view))]
    pub async fn load_product_view(&self, view: &mut ProductView, id: &ProductId) -> Result<()> {
        let ticket = view.begin(id);

        let product = self.catalog.get_product(id).await?;
        let category_id = product.category_id.clone();
        if !view.apply_product(&ticket, product) {
            return Ok(());
        }

        let similar = self
            .catalog
            .list_similar(&category_id, id, Some(SIMILAR_PRODUCTS_LIMIT))
            .await?;
        view.apply_similar(&ticket, similar);

        let reviews = self.catalog.list_reviews(id).await?;
        view.apply_reviews(&ticket, reviews);
        Ok(())
    }
}

fn build_api(config: &ApiConfig) -> Result<ApiClient> {
    ApiClient::new(config).map_err(|e| StorefrontError::Validation(e.to_string()))
}
