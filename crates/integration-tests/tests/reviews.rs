//! Review listing and submission against the fake API.

#![allow(clippy::unwrap_used)]

use comfycube_core::ProductId;
use comfycube_integration_tests::{FakeApi, SHOPPER_EMAIL, SHOPPER_PASSWORD};
use comfycube_storefront::StorefrontError;

#[tokio::test]
async fn guests_cannot_review() {
    let api = FakeApi::spawn().await;
    let storefront = api.storefront();

    let err = storefront
        .submit_review(&ProductId::new("p1"), 4, "Nice")
        .await
        .unwrap_err();
    assert!(err.requires_sign_in());
    assert_eq!(api.state().reviews["p1"].len(), 1);
}

#[tokio::test]
async fn posting_a_review_refreshes_the_list() {
    let api = FakeApi::spawn().await;
    let mut storefront = api.storefront();
    storefront
        .sign_in(SHOPPER_EMAIL, SHOPPER_PASSWORD)
        .await
        .unwrap();
    let id = ProductId::new("p1");

    assert_eq!(storefront.catalog().list_reviews(&id).await.unwrap().len(), 1);
    storefront.catalog().list_reviews(&id).await.unwrap();
    assert_eq!(api.state().review_list_hits, 1);

    let review = storefront
        .submit_review(&id, 4, "Sturdy and soft")
        .await
        .unwrap();
    assert_eq!(review.rating.value(), 4);
    assert_eq!(review.user_id.as_ref().unwrap().as_str(), "u1");

    let reviews = storefront.catalog().list_reviews(&id).await.unwrap();
    assert_eq!(reviews.len(), 2);
    assert_eq!(reviews[1].comment, "Sturdy and soft");
    assert_eq!(api.state().review_list_hits, 2);
}

#[tokio::test]
async fn out_of_range_rating_is_rejected_locally() {
    let api = FakeApi::spawn().await;
    let mut storefront = api.storefront();
    storefront
        .sign_in(SHOPPER_EMAIL, SHOPPER_PASSWORD)
        .await
        .unwrap();

    let err = storefront
        .submit_review(&ProductId::new("p1"), 6, "Best ever")
        .await
        .unwrap_err();
    assert!(matches!(err, StorefrontError::Validation(_)), "{err:?}");
    assert_eq!(api.state().reviews["p1"].len(), 1);
}

#[tokio::test]
async fn reviewing_an_unknown_product_is_not_found() {
    let api = FakeApi::spawn().await;
    let mut storefront = api.storefront();
    storefront
        .sign_in(SHOPPER_EMAIL, SHOPPER_PASSWORD)
        .await
        .unwrap();

    let err = storefront
        .submit_review(&ProductId::new("missing"), 3, "Where is it?")
        .await
        .unwrap_err();
    assert!(matches!(err, StorefrontError::NotFound(_)), "{err:?}");
}
