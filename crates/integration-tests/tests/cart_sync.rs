//! Optimistic cart and wishlist sync against the fake API.

#![allow(clippy::unwrap_used)]

use comfycube_core::ProductId;
use comfycube_integration_tests::{FakeApi, SHOPPER_EMAIL, SHOPPER_PASSWORD};
use comfycube_storefront::cart::SyncState;
use comfycube_storefront::models::Product;
use comfycube_storefront::sync::Reconciled;
use comfycube_storefront::wishlist::WishlistEntry;
use comfycube_storefront::{Storefront, StorefrontError};

async fn signed_in(api: &FakeApi) -> Storefront {
    let mut storefront = api.storefront();
    storefront
        .sign_in(SHOPPER_EMAIL, SHOPPER_PASSWORD)
        .await
        .unwrap();
    storefront
}

async fn product(storefront: &Storefront, id: &str) -> Product {
    storefront
        .catalog()
        .get_product(&ProductId::new(id))
        .await
        .unwrap()
}

#[tokio::test]
async fn guest_cart_stays_local() {
    let api = FakeApi::spawn().await;
    let mut storefront = api.storefront();
    let sofa = product(&storefront, "p1").await;

    let outcome = storefront.add_to_cart(&sofa, 2).await.unwrap();
    assert_eq!(outcome, Reconciled::LocalOnly);
    assert_eq!(storefront.cart().item_count(), 2);
    assert_eq!(storefront.cart().get(&sofa.id).unwrap().sync, SyncState::Local);

    storefront.clear_cart().await.unwrap();
    assert!(storefront.cart().is_empty());
    assert!(api.state().cart_requests.is_empty());
}

#[tokio::test]
async fn signed_in_add_is_confirmed_with_absolute_quantity() {
    let api = FakeApi::spawn().await;
    let mut storefront = signed_in(&api).await;
    let sofa = product(&storefront, "p1").await;

    storefront.add_to_cart(&sofa, 2).await.unwrap();
    let outcome = storefront.add_to_cart(&sofa, 2).await.unwrap();
    assert_eq!(outcome, Reconciled::Confirmed);

    let line = storefront.cart().get(&sofa.id).unwrap();
    assert_eq!(line.quantity, 4);
    assert_eq!(line.sync, SyncState::Confirmed);

    let state = api.state();
    assert_eq!(state.cart_requests.len(), 2);
    assert_eq!(state.cart_requests[1]["product_id"], "p1");
    assert_eq!(state.cart_requests[1]["quantity"], 4);
    assert!(state.cart_requests[1]["request_id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn removal_is_pushed_as_zero_quantity() {
    let api = FakeApi::spawn().await;
    let mut storefront = signed_in(&api).await;
    let chair = product(&storefront, "p2").await;

    storefront.add_to_cart(&chair, 1).await.unwrap();
    storefront
        .update_cart_quantity(&chair.id, 0)
        .await
        .unwrap();
    assert!(storefront.cart().is_empty());

    // Removing a line that is already gone pushes nothing
    let outcome = storefront.remove_from_cart(&chair.id).await.unwrap();
    assert_eq!(outcome, Reconciled::LocalOnly);

    let state = api.state();
    assert_eq!(state.cart_requests.len(), 2);
    assert_eq!(state.cart_requests[1]["quantity"], 0);
}

#[tokio::test]
async fn rejected_token_rolls_back_and_asks_for_sign_in() {
    let api = FakeApi::spawn().await;
    let mut storefront = signed_in(&api).await;
    let sofa = product(&storefront, "p1").await;
    api.revoke_tokens();

    let err = storefront.add_to_cart(&sofa, 1).await.unwrap_err();
    assert!(err.requires_sign_in(), "{err:?}");
    assert!(storefront.cart().is_empty());
    assert!(api.state().cart_requests.is_empty());
}

#[tokio::test]
async fn server_failure_restores_the_previous_line() {
    let api = FakeApi::spawn().await;
    let mut storefront = signed_in(&api).await;
    let sofa = product(&storefront, "p1").await;

    storefront.add_to_cart(&sofa, 1).await.unwrap();
    api.fail_writes_with(Some(500));

    let err = storefront
        .update_cart_quantity(&sofa.id, 3)
        .await
        .unwrap_err();
    assert!(
        matches!(err, StorefrontError::Server { status: Some(500), .. }),
        "{err:?}"
    );
    assert_eq!(storefront.cart().get(&sofa.id).unwrap().quantity, 1);
}

#[tokio::test]
async fn superseded_response_is_discarded() {
    let api = FakeApi::spawn().await;
    let mut storefront = signed_in(&api).await;
    let sofa = product(&storefront, "p1").await;

    let first = storefront.begin_add_to_cart(&sofa, 1).unwrap().unwrap();
    let second = storefront
        .begin_update_cart_quantity(&sofa.id, 3)
        .unwrap()
        .unwrap();
    assert!(storefront.cart().get(&sofa.id).unwrap().sync.is_pending());

    // The later request lands first
    let outcome = storefront.push_cart_line(&second).await;
    assert_eq!(
        storefront.complete_cart_mutation(second, outcome).unwrap(),
        Reconciled::Confirmed
    );

    // The earlier one fails late; its rollback must not apply
    api.fail_writes_with(Some(500));
    let outcome = storefront.push_cart_line(&first).await;
    assert!(outcome.is_err());
    assert_eq!(
        storefront.complete_cart_mutation(first, outcome).unwrap(),
        Reconciled::Discarded
    );

    let line = storefront.cart().get(&sofa.id).unwrap();
    assert_eq!(line.quantity, 3);
    assert_eq!(line.sync, SyncState::Confirmed);
}

#[tokio::test]
async fn signed_in_clear_pushes_each_removal() {
    let api = FakeApi::spawn().await;
    let mut storefront = signed_in(&api).await;
    let sofa = product(&storefront, "p1").await;
    let chair = product(&storefront, "p2").await;

    storefront.add_to_cart(&sofa, 1).await.unwrap();
    storefront.add_to_cart(&chair, 2).await.unwrap();
    storefront.clear_cart().await.unwrap();

    assert!(storefront.cart().is_empty());
    let state = api.state();
    let zeroed: Vec<_> = state.cart_requests[2..]
        .iter()
        .map(|r| (r["product_id"].as_str().unwrap(), r["quantity"].as_u64().unwrap()))
        .collect();
    assert_eq!(zeroed, [("p1", 0), ("p2", 0)]);
}

#[tokio::test]
async fn wishlist_toggle_is_confirmed() {
    let api = FakeApi::spawn().await;
    let mut storefront = signed_in(&api).await;
    let bench = product(&storefront, "p5").await;

    assert!(storefront.toggle_wishlist(WishlistEntry::from(&bench)).await.unwrap());
    let entry = storefront.wishlist().get(&bench.id).unwrap();
    assert_eq!(entry.sync, SyncState::Confirmed);

    storefront.remove_from_wishlist(&bench.id).await.unwrap();
    assert!(!storefront.wishlist().is_in_wishlist(&bench.id));

    let state = api.state();
    let saved: Vec<bool> = state
        .wishlist_requests
        .iter()
        .map(|r| r["saved"].as_bool().unwrap())
        .collect();
    assert_eq!(saved, [true, false]);
}

#[tokio::test]
async fn wishlist_failure_undoes_the_toggle() {
    let api = FakeApi::spawn().await;
    let mut storefront = signed_in(&api).await;
    let bench = product(&storefront, "p5").await;
    api.fail_writes_with(Some(503));

    let err = storefront
        .toggle_wishlist(WishlistEntry::from(&bench))
        .await
        .unwrap_err();
    assert!(matches!(err, StorefrontError::Server { .. }));
    assert!(!storefront.wishlist().is_in_wishlist(&bench.id));
}

#[tokio::test]
async fn sign_out_keeps_the_local_cart() {
    let api = FakeApi::spawn().await;
    let mut storefront = signed_in(&api).await;
    let sofa = product(&storefront, "p1").await;

    storefront.add_to_cart(&sofa, 1).await.unwrap();
    storefront.sign_out().unwrap();

    let outcome = storefront.add_to_cart(&sofa, 1).await.unwrap();
    assert_eq!(outcome, Reconciled::LocalOnly);
    assert_eq!(storefront.cart().item_count(), 2);
}

#[tokio::test]
async fn sign_out_settles_in_flight_pushes() {
    let api = FakeApi::spawn().await;
    let mut storefront = signed_in(&api).await;
    let sofa = product(&storefront, "p1").await;
    let bench = product(&storefront, "p5").await;

    let cart_push = storefront.begin_add_to_cart(&sofa, 1).unwrap().unwrap();
    let (saved, wishlist_push) = storefront
        .begin_toggle_wishlist(WishlistEntry::from(&bench))
        .unwrap();
    assert!(saved);
    let wishlist_push = wishlist_push.unwrap();
    storefront.sign_out().unwrap();

    assert_eq!(storefront.cart().get(&sofa.id).unwrap().sync, SyncState::Local);
    assert_eq!(storefront.wishlist().get(&bench.id).unwrap().sync, SyncState::Local);

    let outcome = storefront.push_cart_line(&cart_push).await;
    assert_eq!(
        storefront.complete_cart_mutation(cart_push, outcome).unwrap(),
        Reconciled::Discarded
    );
    let outcome = storefront.push_wishlist_entry(&wishlist_push).await;
    assert_eq!(
        storefront
            .complete_wishlist_mutation(wishlist_push, outcome)
            .unwrap(),
        Reconciled::Discarded
    );

    // Local state survives sign-out and nothing is left syncing
    let line = storefront.cart().get(&sofa.id).unwrap();
    assert_eq!(line.quantity, 1);
    assert!(!line.sync.is_pending());
    assert!(storefront.wishlist().is_in_wishlist(&bench.id));
}
